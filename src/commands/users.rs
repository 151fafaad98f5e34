// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{id_for_user, pretty_table};
use anyhow::Result;
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let email = sub.get_one::<String>("email");
            let base = sub.get_one::<String>("base").unwrap().to_uppercase();
            conn.execute(
                "INSERT INTO users(name, email, base_currency) VALUES (?1, ?2, ?3)",
                params![name, email, base],
            )?;
            println!("Added user '{}' (base {})", name, base);
        }
        Some(("list", _)) => {
            let mut stmt = conn
                .prepare("SELECT name, email, base_currency, created_at FROM users ORDER BY name")?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, Option<String>>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (n, e, b, cr) = row?;
                data.push(vec![n, e.unwrap_or_default(), b, cr]);
            }
            println!(
                "{}",
                pretty_table(&["Name", "Email", "Base", "Created"], data)
            );
        }
        Some(("set-base", sub)) => {
            let user = sub.get_one::<String>("user").unwrap();
            let ccy = sub.get_one::<String>("currency").unwrap().to_uppercase();
            let user_id = id_for_user(conn, user)?;
            conn.execute(
                "UPDATE users SET base_currency=?1 WHERE id=?2",
                params![ccy, user_id],
            )?;
            println!("Base currency for '{}' set to {}", user, ccy);
        }
        _ => {}
    }
    Ok(())
}
