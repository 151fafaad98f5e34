// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Active templates in a foreign currency with no cached rate: the
    //    next pass will need a live fetch to generate them.
    let mut stmt = conn.prepare(
        "SELECT r.id, r.currency, u.base_currency
         FROM recurring_charges r JOIN users u ON r.user_id=u.id
         WHERE r.is_active=1 AND r.currency != u.base_currency
         ORDER BY r.id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let ccy: String = r.get(1)?;
        let base: String = r.get(2)?;
        let mut st = conn.prepare("SELECT 1 FROM fx_cache WHERE base=?1 AND target=?2")?;
        let ok: Option<i32> = st.query_row((&ccy, &base), |r| r.get(0)).optional()?;
        if ok.is_none() {
            rows.push(vec![
                "no_cached_rate".into(),
                format!("recurring {} {}->{}", id, ccy, base),
            ]);
        }
    }

    // 2) Amounts that no longer parse as decimals (manual edits, imports)
    for (sql, label) in [
        ("SELECT id, amount FROM recurring_charges", "recurring"),
        ("SELECT id, amount FROM budgets", "budget"),
        ("SELECT id, converted_amount FROM expenses", "expense"),
    ] {
        let mut stmt = conn.prepare(sql)?;
        let mut cur = stmt.query([])?;
        while let Some(r) = cur.next()? {
            let id: i64 = r.get(0)?;
            let amt: String = r.get(1)?;
            if amt.parse::<Decimal>().is_err() {
                rows.push(vec!["bad_amount".into(), format!("{} {} '{}'", label, id, amt)]);
            }
        }
    }

    // 3) Templates whose marker predates their start date
    let mut stmt3 = conn.prepare(
        "SELECT id FROM recurring_charges
         WHERE last_generated_date IS NOT NULL AND last_generated_date < start_date",
    )?;
    let mut cur3 = stmt3.query([])?;
    while let Some(r) = cur3.next()? {
        let id: i64 = r.get(0)?;
        rows.push(vec!["marker_before_start".into(), format!("recurring {}", id)]);
    }

    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
