// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::Duration;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

/// Engine tunables, persisted in the settings table. Missing keys fall
/// back to the defaults below.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub warning_threshold: Decimal,
    pub alert_threshold: Decimal,
    pub rate_cache_hours: i64,
    pub notifications_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            warning_threshold: Decimal::from(80),
            alert_threshold: Decimal::from(100),
            rate_cache_hours: 24,
            notifications_enabled: true,
        }
    }
}

impl EngineConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::hours(self.rate_cache_hours)
    }
}

fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn load(conn: &Connection) -> Result<EngineConfig> {
    let mut cfg = EngineConfig::default();
    if let Some(v) = get_setting(conn, "warning_threshold")? {
        cfg.warning_threshold = v
            .parse::<Decimal>()
            .with_context(|| format!("Invalid warning_threshold '{}'", v))?;
    }
    if let Some(v) = get_setting(conn, "alert_threshold")? {
        cfg.alert_threshold = v
            .parse::<Decimal>()
            .with_context(|| format!("Invalid alert_threshold '{}'", v))?;
    }
    if let Some(v) = get_setting(conn, "rate_cache_hours")? {
        cfg.rate_cache_hours = v
            .parse::<i64>()
            .with_context(|| format!("Invalid rate_cache_hours '{}'", v))?;
    }
    if let Some(v) = get_setting(conn, "notifications_enabled")? {
        cfg.notifications_enabled = matches!(v.as_str(), "1" | "true" | "on");
    }
    Ok(cfg)
}
