// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config;
use crate::engine::currency::{CurrencyConverter, FrankfurterSource};
use crate::utils::{parse_decimal, pretty_table};
use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("rate", sub)) => rate(conn, sub)?,
        Some(("convert", sub)) => convert(conn, sub)?,
        Some(("list", _)) => list(conn)?,
        _ => {}
    }
    Ok(())
}

fn converter<'a>(conn: &Connection, source: &'a FrankfurterSource) -> Result<CurrencyConverter<'a>> {
    let cfg = config::load(conn)?;
    Ok(CurrencyConverter::new(
        source,
        cfg.freshness_window(),
        Utc::now(),
    ))
}

fn rate(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let base = sub.get_one::<String>("base").unwrap().to_uppercase();
    let target = sub.get_one::<String>("target").unwrap().to_uppercase();
    let source = FrankfurterSource::new()?;
    let r = converter(conn, &source)?.rate(conn, &base, &target)?;
    println!("1 {} = {} {}", base, r, target);
    Ok(())
}

fn convert(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let from = sub.get_one::<String>("from").unwrap().to_uppercase();
    let to = sub.get_one::<String>("to").unwrap().to_uppercase();
    let source = FrankfurterSource::new()?;
    let conv = converter(conn, &source)?.convert(conn, amount, &from, &to)?;
    println!("{} {} -> {} {} (rate {})", amount, from, conv.amount, to, conv.rate);
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT base, target, rate, fetched_at FROM fx_cache ORDER BY base, target",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (b, t, rt, at) = row?;
        data.push(vec![b, t, rt, at]);
    }
    println!(
        "{}",
        pretty_table(&["Base", "Target", "Rate", "Fetched at"], data)
    );
    Ok(())
}
