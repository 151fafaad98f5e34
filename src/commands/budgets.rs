// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config;
use crate::engine::budget;
use crate::utils::{
    id_for_category, id_for_user, maybe_print_json, parse_decimal, parse_month, pretty_table,
};
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("report", sub)) => report(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = sub.get_one::<String>("user").unwrap();
    let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
    let cat = sub.get_one::<String>("category").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    if amount < Decimal::ZERO {
        return Err(anyhow!("Budget amount must be >= 0, got {}", amount));
    }
    let user_id = id_for_user(conn, user)?;
    let cat_id = id_for_category(conn, user_id, cat)?;
    conn.execute(
        "INSERT INTO budgets(user_id, category_id, month, year, amount) VALUES (?1,?2,?3,?4,?5)
         ON CONFLICT(user_id, category_id, month, year) DO UPDATE SET amount=excluded.amount",
        params![user_id, cat_id, month, year, amount.to_string()],
    )?;
    println!("Budget set for {}-{:02} / {} = {}", year, month, cat, amount);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = sub.get_one::<String>("user").unwrap();
    let user_id = id_for_user(conn, user)?;
    let mut sql = String::from(
        "SELECT b.year, b.month, c.name, b.amount, b.warning_sent, b.alert_sent
         FROM budgets b JOIN categories c ON b.category_id=c.id
         WHERE b.user_id=?1",
    );
    let month_filter = match sub.get_one::<String>("month") {
        Some(s) => {
            sql.push_str(" AND b.year=?2 AND b.month=?3");
            Some(parse_month(s)?)
        }
        None => None,
    };
    sql.push_str(" ORDER BY b.year DESC, b.month DESC, c.name");

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |r: &rusqlite::Row<'_>| {
        Ok((
            r.get::<_, i32>(0)?,
            r.get::<_, u32>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, bool>(4)?,
            r.get::<_, bool>(5)?,
        ))
    };
    let rows = if let Some((y, mth)) = month_filter {
        stmt.query_map(params![user_id, y, mth], map_row)?
    } else {
        stmt.query_map(params![user_id], map_row)?
    };
    let mut data = Vec::new();
    for row in rows {
        let (y, mth, c, a, warn, alert) = row?;
        let flags = match (warn, alert) {
            (_, true) => "alerted",
            (true, false) => "warned",
            _ => "",
        };
        data.push(vec![format!("{}-{:02}", y, mth), c, a, flags.into()]);
    }
    println!(
        "{}",
        pretty_table(&["Month", "Category", "Budget (BASE)", "Notified"], data)
    );
    Ok(())
}

fn report(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let user = sub.get_one::<String>("user").unwrap();
    let (year, month) = parse_month(sub.get_one::<String>("month").unwrap())?;
    let user_id = id_for_user(conn, user)?;

    let cfg = config::load(conn)?;
    let statuses = budget::evaluate(conn, user_id, month, year, &cfg)?;

    if !maybe_print_json(json_flag, jsonl_flag, &statuses)? {
        let data = statuses
            .iter()
            .map(|s| {
                vec![
                    s.category_name.clone(),
                    format!("{:.2}", s.budget_amount),
                    format!("{:.2}", s.actual_amount),
                    format!("{:.2}", s.remaining),
                    format!("{:.2}%", s.percentage),
                    s.tier.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Category", "Budget", "Spent", "Remaining", "Used", "Tier"],
                data
            )
        );
    }
    Ok(())
}
