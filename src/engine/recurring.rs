// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::BTreeSet;

use super::currency::CurrencyConverter;
use super::errors::EngineError;
use crate::models::{Frequency, RecurringCharge};

/// Outcome of one generation pass. `skipped` counts due cycles whose
/// expense already existed (dedup hit); `failed` counts templates whose
/// catch-up aborted and will be retried from their marker next tick.
#[derive(Debug, Default, Serialize)]
pub struct GenerationReport {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    /// (user_id, year, month) periods that received expenses this pass.
    #[serde(skip)]
    pub touched: BTreeSet<(i64, i32, u32)>,
}

struct RawTemplate {
    id: i64,
    user_id: i64,
    category_id: Option<i64>,
    amount: String,
    currency: String,
    description: Option<String>,
    frequency: String,
    start_date: String,
    last_generated_date: Option<String>,
    base_currency: String,
}

/// Materialize every due cycle of every active template, catching up on
/// backlog one cycle at a time. A template's failure is recorded and never
/// blocks the others; only a failure to read the store at all aborts.
pub fn run(
    conn: &mut Connection,
    converter: &CurrencyConverter,
    as_of: NaiveDate,
) -> anyhow::Result<GenerationReport> {
    let raws = load_active(conn).context("Load active recurring charges")?;
    let mut report = GenerationReport::default();
    for raw in raws {
        let id = raw.id;
        let user = raw.user_id;
        if let Err(e) = catch_up(conn, converter, raw, as_of, &mut report) {
            report.failed += 1;
            report.errors.push(format!("recurring charge {}: {}", id, e));
            tracing::error!(template = id, user, "generation failed: {e}");
        }
    }
    Ok(report)
}

fn load_active(conn: &Connection) -> Result<Vec<RawTemplate>, EngineError> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.user_id, r.category_id, r.amount, r.currency, r.description,
                r.frequency, r.start_date, r.last_generated_date, u.base_currency
         FROM recurring_charges r
         JOIN users u ON r.user_id = u.id
         WHERE r.is_active = 1
         ORDER BY r.id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(RawTemplate {
            id: r.get(0)?,
            user_id: r.get(1)?,
            category_id: r.get(2)?,
            amount: r.get(3)?,
            currency: r.get(4)?,
            description: r.get(5)?,
            frequency: r.get(6)?,
            start_date: r.get(7)?,
            last_generated_date: r.get(8)?,
            base_currency: r.get(9)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn parse_template(raw: RawTemplate) -> Result<(RecurringCharge, String), EngineError> {
    let amount = raw
        .amount
        .parse()
        .map_err(|_| EngineError::Precision(format!("amount '{}'", raw.amount)))?;
    let frequency = Frequency::parse(&raw.frequency)
        .ok_or_else(|| EngineError::Precision(format!("frequency '{}'", raw.frequency)))?;
    let start_date = parse_stored_date(&raw.start_date)?;
    let last_generated_date = match raw.last_generated_date {
        Some(s) => Some(parse_stored_date(&s)?),
        None => None,
    };
    let tpl = RecurringCharge {
        id: raw.id,
        user_id: raw.user_id,
        category_id: raw.category_id,
        amount,
        currency: raw.currency,
        description: raw.description,
        frequency,
        start_date,
        last_generated_date,
        is_active: true,
    };
    Ok((tpl, raw.base_currency))
}

fn parse_stored_date(s: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| EngineError::Precision(format!("date '{}'", s)))
}

/// Generate every cycle due on or before `as_of`. The expense insert and
/// the marker advance commit together; a conversion failure leaves the
/// marker where it was, so the same due date is retried next tick.
fn catch_up(
    conn: &mut Connection,
    converter: &CurrencyConverter,
    raw: RawTemplate,
    as_of: NaiveDate,
    report: &mut GenerationReport,
) -> Result<(), EngineError> {
    let (mut tpl, base) = parse_template(raw)?;
    let anchor = tpl.start_date.day();
    let mut due = tpl.next_due();
    while due <= as_of {
        let conv = converter.convert(conn, tpl.amount, &tpl.currency, &base)?;
        let desc = match &tpl.description {
            Some(d) => format!("[Recurring] {}", d),
            None => "[Recurring]".to_string(),
        };
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO expenses
                (user_id, category_id, date, description, amount, currency,
                 converted_amount, conversion_rate, recurring_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                tpl.user_id,
                tpl.category_id,
                due.to_string(),
                desc,
                tpl.amount.to_string(),
                tpl.currency,
                conv.amount.to_string(),
                conv.rate.to_string(),
                tpl.id
            ],
        )?;
        tx.execute(
            "UPDATE recurring_charges SET last_generated_date=?1 WHERE id=?2",
            params![due.to_string(), tpl.id],
        )?;
        tx.commit()?;
        if inserted == 0 {
            // A previous run wrote the expense but crashed before the
            // marker moved; the dedup index absorbs the retry.
            report.skipped += 1;
            tracing::debug!(template = tpl.id, %due, "cycle already materialized");
        } else {
            report.created += 1;
            tracing::info!(template = tpl.id, user = tpl.user_id, %due, "generated recurring expense");
        }
        report.touched.insert((tpl.user_id, due.year(), due.month()));
        tpl.last_generated_date = Some(due);
        due = tpl.frequency.advance(due, anchor);
    }
    Ok(())
}
