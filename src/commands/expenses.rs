// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config;
use crate::engine::currency::{CurrencyConverter, FrankfurterSource};
use crate::utils::{
    base_currency_for, id_for_category, id_for_user, maybe_print_json, parse_date, parse_decimal,
    parse_month, pretty_table,
};
use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = sub.get_one::<String>("user").unwrap();
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let currency = sub.get_one::<String>("currency").unwrap().to_uppercase();
    let category = sub.get_one::<String>("category");
    let desc = sub.get_one::<String>("desc");

    let user_id = id_for_user(conn, user)?;
    let base = base_currency_for(conn, user_id)?;
    let category_id = match category {
        Some(c) => Some(id_for_category(conn, user_id, c)?),
        None => None,
    };

    // Convert at write time so month aggregation stays conversion-free.
    let cfg = config::load(conn)?;
    let source = FrankfurterSource::new()?;
    let converter = CurrencyConverter::new(&source, cfg.freshness_window(), Utc::now());
    let conv = converter.convert(conn, amount, &currency, &base)?;

    conn.execute(
        "INSERT INTO expenses(user_id, category_id, date, description, amount, currency,
                              converted_amount, conversion_rate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user_id,
            category_id,
            date.to_string(),
            desc,
            amount.to_string(),
            currency,
            conv.amount.to_string(),
            conv.rate.to_string()
        ],
    )?;
    println!(
        "Recorded {} {} on {} ({} {} in base)",
        amount, currency, date, conv.amount, base
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let user = sub.get_one::<String>("user").unwrap();
    let user_id = id_for_user(conn, user)?;

    let mut sql = String::from(
        "SELECT e.date, c.name, e.description, e.amount, e.currency, e.converted_amount,
                CASE WHEN e.recurring_id IS NULL THEN '' ELSE 'recurring' END
         FROM expenses e
         LEFT JOIN categories c ON e.category_id=c.id
         WHERE e.user_id=?1",
    );
    let mut binds: Vec<String> = Vec::new();
    if let Some(month) = sub.get_one::<String>("month") {
        let (y, mm) = parse_month(month)?;
        sql.push_str(" AND substr(e.date,1,7)=?2");
        binds.push(format!("{:04}-{:02}", y, mm));
    }
    sql.push_str(" ORDER BY e.date, e.id");

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |r: &rusqlite::Row<'_>| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, Option<String>>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
        ))
    };
    let rows = if let Some(month) = binds.first() {
        stmt.query_map(params![user_id, month], map_row)?
    } else {
        stmt.query_map(params![user_id], map_row)?
    };

    let mut data = Vec::new();
    for row in rows {
        let (d, cat, desc, amt, ccy, conv, src) = row?;
        data.push(vec![
            d,
            cat.unwrap_or_default(),
            desc.unwrap_or_default(),
            format!("{} {}", amt, ccy),
            conv,
            src,
        ]);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(
                &["Date", "Category", "Description", "Amount", "Base", "Source"],
                data
            )
        );
    }
    Ok(())
}
