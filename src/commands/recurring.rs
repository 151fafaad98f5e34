// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Frequency;
use crate::utils::{id_for_category, id_for_user, parse_date, parse_decimal, pretty_table};
use anyhow::{anyhow, Result};
use chrono::Datelike;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("deactivate", sub)) => deactivate(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = sub.get_one::<String>("user").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    if amount <= Decimal::ZERO {
        return Err(anyhow!("Amount must be positive, got {}", amount));
    }
    let currency = sub.get_one::<String>("currency").unwrap().to_uppercase();
    let freq = sub.get_one::<String>("frequency").unwrap();
    let frequency =
        Frequency::parse(freq).ok_or_else(|| anyhow!("Invalid frequency '{}', expected weekly|monthly", freq))?;
    let start = parse_date(sub.get_one::<String>("start").unwrap())?;
    let category = sub.get_one::<String>("category");
    let desc = sub.get_one::<String>("desc");

    let user_id = id_for_user(conn, user)?;
    let category_id = match category {
        Some(c) => Some(id_for_category(conn, user_id, c)?),
        None => None,
    };

    conn.execute(
        "INSERT INTO recurring_charges(user_id, category_id, amount, currency, description,
                                       frequency, start_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id,
            category_id,
            amount.to_string(),
            currency,
            desc,
            frequency.as_str(),
            start.to_string()
        ],
    )?;
    println!(
        "Added {} recurring charge of {} {} starting {}",
        frequency.as_str(),
        amount,
        currency,
        start
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = sub.get_one::<String>("user").unwrap();
    let user_id = id_for_user(conn, user)?;
    let mut stmt = conn.prepare(
        "SELECT r.id, r.amount, r.currency, c.name, r.description, r.frequency,
                r.start_date, r.last_generated_date, r.is_active
         FROM recurring_charges r
         LEFT JOIN categories c ON r.category_id=c.id
         WHERE r.user_id=?1
         ORDER BY r.is_active DESC, r.start_date",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, Option<String>>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, Option<String>>(7)?,
            r.get::<_, bool>(8)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (id, amt, ccy, cat, desc, freq, start, last, active) = row?;
        let next = next_due_label(&freq, &start, last.as_deref(), active);
        data.push(vec![
            id.to_string(),
            format!("{} {}", amt, ccy),
            cat.unwrap_or_default(),
            desc.unwrap_or_default(),
            freq,
            start,
            last.unwrap_or_default(),
            next,
            if active { "yes".into() } else { "no".into() },
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &["Id", "Amount", "Category", "Description", "Frequency", "Start", "Last", "Next due", "Active"],
            data
        )
    );
    Ok(())
}

fn next_due_label(freq: &str, start: &str, last: Option<&str>, active: bool) -> String {
    if !active {
        return "-".into();
    }
    let Some(frequency) = Frequency::parse(freq) else {
        return "-".into();
    };
    let Ok(start) = parse_date(start) else {
        return "-".into();
    };
    match last {
        None => start.to_string(),
        Some(l) => match parse_date(l) {
            Ok(last) => frequency.advance(last, start.day()).to_string(),
            Err(_) => "-".into(),
        },
    }
}

fn deactivate(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let changed = conn.execute(
        "UPDATE recurring_charges SET is_active=0 WHERE id=?1",
        params![id],
    )?;
    if changed == 0 {
        return Err(anyhow!("Recurring charge {} not found", id));
    }
    println!("Deactivated recurring charge {}", id);
    Ok(())
}
