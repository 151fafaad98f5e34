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
            let user = sub.get_one::<String>("user").unwrap();
            let name = sub.get_one::<String>("name").unwrap();
            let user_id = id_for_user(conn, user)?;
            conn.execute(
                "INSERT INTO categories(user_id, name) VALUES (?1, ?2)",
                params![user_id, name],
            )?;
            println!("Added category '{}'", name);
        }
        Some(("list", sub)) => {
            let user = sub.get_one::<String>("user").unwrap();
            let user_id = id_for_user(conn, user)?;
            let mut stmt =
                conn.prepare("SELECT name FROM categories WHERE user_id=?1 ORDER BY name")?;
            let rows = stmt.query_map(params![user_id], |r| r.get::<_, String>(0))?;
            let mut data = Vec::new();
            for row in rows {
                data.push(vec![row?]);
            }
            println!("{}", pretty_table(&["Category"], data));
        }
        Some(("rm", sub)) => {
            let user = sub.get_one::<String>("user").unwrap();
            let name = sub.get_one::<String>("name").unwrap();
            let user_id = id_for_user(conn, user)?;
            conn.execute(
                "DELETE FROM categories WHERE user_id=?1 AND name=?2",
                params![user_id, name],
            )?;
            println!("Removed category '{}'", name);
        }
        _ => {}
    }
    Ok(())
}
