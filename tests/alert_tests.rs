// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{params, Connection};
use std::cell::RefCell;

use spendwatch::config::EngineConfig;
use spendwatch::engine::alerts::{self, Notifier, Outcome};
use spendwatch::engine::budget::{self, BudgetStatus, Tier};
use spendwatch::models::User;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    spendwatch::db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO users(name, email, base_currency) VALUES('ada','ada@example.com','USD')",
        [],
    )
    .unwrap();
    conn.execute("INSERT INTO categories(user_id, name) VALUES(1, 'groceries')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO budgets(user_id, category_id, month, year, amount) VALUES(1, 1, 6, 2025, '200')",
        [],
    )
    .unwrap();
    conn
}

fn ada() -> User {
    User {
        id: 1,
        name: "ada".into(),
        email: Some("ada@example.com".into()),
        base_currency: "USD".into(),
    }
}

fn set_spend(conn: &Connection, converted: &str) {
    conn.execute("DELETE FROM expenses WHERE user_id=1", []).unwrap();
    conn.execute(
        "INSERT INTO expenses(user_id, category_id, date, amount, currency,
                              converted_amount, conversion_rate)
         VALUES (1, 1, '2025-06-10', ?1, 'USD', ?1, '1')",
        params![converted],
    )
    .unwrap();
}

fn statuses(conn: &Connection, cfg: &EngineConfig) -> Vec<BudgetStatus> {
    budget::evaluate(conn, 1, 6, 2025, cfg).unwrap()
}

fn flags(conn: &Connection) -> (bool, bool) {
    conn.query_row(
        "SELECT warning_sent, alert_sent FROM budgets WHERE id=1",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .unwrap()
}

#[derive(Default)]
struct RecordingNotifier {
    sent: RefCell<Vec<(i64, Tier)>>,
}

impl Notifier for RecordingNotifier {
    fn send(&self, _user: &User, status: &BudgetStatus) -> anyhow::Result<()> {
        self.sent.borrow_mut().push((status.budget_id, status.tier));
        Ok(())
    }
}

struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn send(&self, _user: &User, _status: &BudgetStatus) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("smtp relay refused connection"))
    }
}

#[test]
fn warning_fires_at_most_once_per_period() {
    let conn = setup();
    let cfg = EngineConfig::default();
    let notifier = RecordingNotifier::default();

    set_spend(&conn, "170");
    let results = alerts::dispatch(&conn, &notifier, &ada(), &statuses(&conn, &cfg), &cfg);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, Outcome::Sent);
    assert_eq!(results[0].tier, Tier::Warning);
    assert_eq!(flags(&conn), (true, false));

    // Higher spend, still in the warning band: nothing new fires
    set_spend(&conn, "190");
    let results = alerts::dispatch(&conn, &notifier, &ada(), &statuses(&conn, &cfg), &cfg);
    assert!(results.is_empty());
    assert_eq!(notifier.sent.borrow().len(), 1);
}

#[test]
fn alert_fires_independently_after_warning() {
    let conn = setup();
    let cfg = EngineConfig::default();
    let notifier = RecordingNotifier::default();

    set_spend(&conn, "170");
    alerts::dispatch(&conn, &notifier, &ada(), &statuses(&conn, &cfg), &cfg);
    set_spend(&conn, "210");
    let results = alerts::dispatch(&conn, &notifier, &ada(), &statuses(&conn, &cfg), &cfg);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].tier, Tier::Alert);
    assert_eq!(flags(&conn), (true, true));

    // Both tiers exhausted for the period
    set_spend(&conn, "300");
    let results = alerts::dispatch(&conn, &notifier, &ada(), &statuses(&conn, &cfg), &cfg);
    assert!(results.is_empty());
    assert_eq!(notifier.sent.borrow().len(), 2);
}

#[test]
fn straight_to_alert_leaves_warning_armed() {
    let conn = setup();
    let cfg = EngineConfig::default();
    let notifier = RecordingNotifier::default();

    set_spend(&conn, "210");
    let results = alerts::dispatch(&conn, &notifier, &ada(), &statuses(&conn, &cfg), &cfg);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].tier, Tier::Alert);
    assert_eq!(flags(&conn), (false, true));
}

#[test]
fn send_failure_keeps_the_flag_for_retry() {
    let conn = setup();
    let cfg = EngineConfig::default();

    set_spend(&conn, "170");
    let results = alerts::dispatch(&conn, &FailingNotifier, &ada(), &statuses(&conn, &cfg), &cfg);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, Outcome::Failed);
    assert_eq!(flags(&conn), (false, false));

    // Next tick with a healthy transport delivers and latches
    let notifier = RecordingNotifier::default();
    let results = alerts::dispatch(&conn, &notifier, &ada(), &statuses(&conn, &cfg), &cfg);
    assert_eq!(results[0].outcome, Outcome::Sent);
    assert_eq!(flags(&conn), (true, false));
}

#[test]
fn disabled_notifications_do_not_consume_flags() {
    let conn = setup();
    let cfg = EngineConfig {
        notifications_enabled: false,
        ..EngineConfig::default()
    };
    let notifier = RecordingNotifier::default();

    set_spend(&conn, "210");
    let results = alerts::dispatch(&conn, &notifier, &ada(), &statuses(&conn, &cfg), &cfg);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, Outcome::Skipped);
    assert!(notifier.sent.borrow().is_empty());
    assert_eq!(flags(&conn), (false, false));
}

#[test]
fn new_month_row_rearms_both_tiers() {
    let conn = setup();
    let cfg = EngineConfig::default();
    let notifier = RecordingNotifier::default();

    set_spend(&conn, "210");
    alerts::dispatch(&conn, &notifier, &ada(), &statuses(&conn, &cfg), &cfg);
    assert_eq!(flags(&conn), (false, true));

    // July gets a fresh row; June's latched flags do not carry over
    conn.execute(
        "INSERT INTO budgets(user_id, category_id, month, year, amount) VALUES(1, 1, 7, 2025, '200')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO expenses(user_id, category_id, date, amount, currency,
                              converted_amount, conversion_rate)
         VALUES (1, 1, '2025-07-05', '210', 'USD', '210', '1')",
        [],
    )
    .unwrap();
    let july = budget::evaluate(&conn, 1, 7, 2025, &cfg).unwrap();
    assert!(!july[0].warning_sent);
    assert!(!july[0].alert_sent);
    let results = alerts::dispatch(&conn, &notifier, &ada(), &july, &cfg);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, Outcome::Sent);
    assert_eq!(notifier.sent.borrow().len(), 2);
}
