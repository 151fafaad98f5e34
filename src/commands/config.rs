// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::{load, set_setting};
use crate::utils::{parse_decimal, pretty_table};
use anyhow::{anyhow, Result};
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", _)) => show(conn)?,
        Some(("set", sub)) => set(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn show(conn: &Connection) -> Result<()> {
    let cfg = load(conn)?;
    let data = vec![
        vec!["warning_threshold".into(), format!("{}%", cfg.warning_threshold)],
        vec!["alert_threshold".into(), format!("{}%", cfg.alert_threshold)],
        vec!["rate_cache_hours".into(), cfg.rate_cache_hours.to_string()],
        vec![
            "notifications_enabled".into(),
            cfg.notifications_enabled.to_string(),
        ],
    ];
    println!("{}", pretty_table(&["Setting", "Value"], data));
    Ok(())
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    if let Some(v) = sub.get_one::<String>("warning") {
        let d = parse_decimal(v)?;
        set_setting(conn, "warning_threshold", &d.to_string())?;
        println!("warning_threshold = {}%", d);
    }
    if let Some(v) = sub.get_one::<String>("alert") {
        let d = parse_decimal(v)?;
        set_setting(conn, "alert_threshold", &d.to_string())?;
        println!("alert_threshold = {}%", d);
    }
    if let Some(v) = sub.get_one::<String>("cache-hours") {
        let h: i64 = v
            .parse()
            .map_err(|_| anyhow!("Invalid hours '{}'", v))?;
        set_setting(conn, "rate_cache_hours", &h.to_string())?;
        println!("rate_cache_hours = {}", h);
    }
    if let Some(v) = sub.get_one::<String>("notifications") {
        let on = match v.as_str() {
            "on" | "true" | "1" => true,
            "off" | "false" | "0" => false,
            _ => return Err(anyhow!("Expected on|off, got '{}'", v)),
        };
        set_setting(conn, "notifications_enabled", if on { "on" } else { "off" })?;
        println!("notifications_enabled = {}", on);
    }
    Ok(())
}
