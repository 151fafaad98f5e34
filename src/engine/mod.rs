// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod alerts;
pub mod budget;
pub mod currency;
pub mod errors;
pub mod recurring;

pub use errors::EngineError;

use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::config;
use crate::models::User;
use alerts::{DispatchResult, Notifier};
use currency::{CurrencyConverter, RateSource};
use recurring::GenerationReport;

/// Everything one engine tick did, for operational visibility.
#[derive(Debug, Serialize)]
pub struct PassReport {
    pub as_of: NaiveDate,
    pub generation: GenerationReport,
    pub dispatches: Vec<DispatchResult>,
    pub errors: Vec<String>,
}

/// One full engine pass: generate due recurring charges for all users,
/// evaluate every budget period the pass touched (plus the `as_of` month,
/// so manual spending trips alerts too), and dispatch owed notifications.
///
/// `as_of` and `now` are injected by the trigger; the engine never reads
/// the wall clock. Safe to re-run with the same `as_of`.
pub fn run_pass(
    conn: &mut Connection,
    source: &dyn RateSource,
    notifier: &dyn Notifier,
    as_of: NaiveDate,
    now: DateTime<Utc>,
) -> anyhow::Result<PassReport> {
    let cfg = config::load(conn).context("Load engine config")?;
    let converter = CurrencyConverter::new(source, cfg.freshness_window(), now);

    let generation = recurring::run(conn, &converter, as_of)?;

    let users = load_users(conn).context("Load users")?;
    let by_id: HashMap<i64, &User> = users.iter().map(|u| (u.id, u)).collect();

    let mut periods: BTreeSet<(i64, i32, u32)> = generation.touched.clone();
    for u in &users {
        periods.insert((u.id, as_of.year(), as_of.month()));
    }

    let mut dispatches = Vec::new();
    let mut errors = Vec::new();
    for (user_id, year, month) in periods {
        let Some(user) = by_id.get(&user_id) else {
            continue;
        };
        match budget::evaluate(conn, user_id, month, year, &cfg) {
            Ok(statuses) => {
                if !statuses.is_empty() {
                    dispatches.extend(alerts::dispatch(conn, notifier, user, &statuses, &cfg));
                }
            }
            Err(e) => {
                errors.push(format!(
                    "evaluate {}-{:02} for user {}: {}",
                    year, month, user_id, e
                ));
                tracing::error!(user = user_id, year, month, "budget evaluation failed: {e}");
            }
        }
    }

    Ok(PassReport {
        as_of,
        generation,
        dispatches,
        errors,
    })
}

fn load_users(conn: &Connection) -> anyhow::Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, name, email, base_currency FROM users ORDER BY id")?;
    let rows = stmt.query_map([], |r| {
        Ok(User {
            id: r.get(0)?,
            name: r.get(1)?,
            email: r.get(2)?,
            base_currency: r.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
