// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::engine;
use crate::engine::alerts::LogNotifier;
use crate::engine::currency::FrankfurterSource;
use crate::utils::{maybe_print_json, parse_date, pretty_table};
use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

pub fn handle(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    // The engine itself is clock-free; the trigger supplies the dates.
    let now = Utc::now();
    let as_of = match sub.get_one::<String>("as-of") {
        Some(s) => parse_date(s)?,
        None => now.date_naive(),
    };

    let source = FrankfurterSource::new()?;
    let notifier = LogNotifier;
    let report = engine::run_pass(conn, &source, &notifier, as_of, now)?;

    if maybe_print_json(json_flag, jsonl_flag, &report)? {
        return Ok(());
    }

    println!(
        "Pass for {}: {} created, {} skipped, {} failed",
        report.as_of, report.generation.created, report.generation.skipped, report.generation.failed
    );
    if !report.dispatches.is_empty() {
        let data = report
            .dispatches
            .iter()
            .map(|d| {
                vec![
                    d.budget_id.to_string(),
                    d.category.clone(),
                    d.tier.to_string(),
                    format!("{:?}", d.outcome),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Budget", "Category", "Tier", "Outcome"], data)
        );
    }
    for e in report.generation.errors.iter().chain(report.errors.iter()) {
        eprintln!("error: {}", e);
    }
    Ok(())
}
