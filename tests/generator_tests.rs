// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, NaiveDate, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::cell::Cell;

use spendwatch::engine::currency::{CurrencyConverter, RateSource};
use spendwatch::engine::recurring;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    spendwatch::db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO users(name, email, base_currency) VALUES('ada','ada@example.com','USD')",
        [],
    )
    .unwrap();
    conn
}

fn add_template(
    conn: &Connection,
    amount: &str,
    currency: &str,
    frequency: &str,
    start: &str,
    last: Option<&str>,
) -> i64 {
    conn.execute(
        "INSERT INTO recurring_charges(user_id, category_id, amount, currency, description,
                                       frequency, start_date, last_generated_date)
         VALUES (1, NULL, ?1, ?2, 'Gym', ?3, ?4, ?5)",
        params![amount, currency, frequency, start, last],
    )
    .unwrap();
    conn.last_insert_rowid()
}

struct FixedSource {
    rate: Decimal,
    calls: Cell<usize>,
}

impl FixedSource {
    fn new(rate: &str) -> Self {
        FixedSource {
            rate: rate.parse().unwrap(),
            calls: Cell::new(0),
        }
    }
}

impl RateSource for FixedSource {
    fn fetch(&self, _base: &str, _target: &str) -> anyhow::Result<Decimal> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.rate)
    }
}

struct DownSource;

impl RateSource for DownSource {
    fn fetch(&self, _base: &str, _target: &str) -> anyhow::Result<Decimal> {
        Err(anyhow::anyhow!("rate source unreachable"))
    }
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn expense_dates(conn: &Connection, template_id: i64) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT date FROM expenses WHERE recurring_id=?1 ORDER BY date")
        .unwrap();
    let rows = stmt
        .query_map(params![template_id], |r| r.get::<_, String>(0))
        .unwrap();
    rows.map(|r| r.unwrap()).collect()
}

fn marker(conn: &Connection, template_id: i64) -> Option<String> {
    conn.query_row(
        "SELECT last_generated_date FROM recurring_charges WHERE id=?1",
        params![template_id],
        |r| r.get(0),
    )
    .unwrap()
}

#[test]
fn weekly_backlog_catches_up_one_expense_per_cycle() {
    let mut conn = setup();
    let id = add_template(&conn, "25.00", "USD", "weekly", "2025-01-06", None);
    let source = FixedSource::new("1");
    let converter = CurrencyConverter::new(&source, Duration::hours(24), Utc::now());

    // Ten weeks after the start date
    let report = recurring::run(&mut conn, &converter, d("2025-03-10")).unwrap();
    assert_eq!(report.created, 10);
    assert_eq!(report.failed, 0);

    let dates = expense_dates(&conn, id);
    assert_eq!(dates.len(), 10);
    assert_eq!(dates.first().unwrap(), "2025-01-06");
    assert_eq!(dates.last().unwrap(), "2025-03-10");
    for pair in dates.windows(2) {
        assert_eq!(d(&pair[1]) - d(&pair[0]), Duration::days(7));
    }
    assert_eq!(marker(&conn, id).as_deref(), Some("2025-03-10"));
    // Same-currency conversion never hits the source
    assert_eq!(source.calls.get(), 0);
}

#[test]
fn monthly_backlog_honors_clamping() {
    let mut conn = setup();
    let id = add_template(&conn, "100", "USD", "monthly", "2024-01-31", None);
    let source = FixedSource::new("1");
    let converter = CurrencyConverter::new(&source, Duration::hours(24), Utc::now());

    let report = recurring::run(&mut conn, &converter, d("2024-04-30")).unwrap();
    assert_eq!(report.created, 4);
    assert_eq!(
        expense_dates(&conn, id),
        vec!["2024-01-31", "2024-02-29", "2024-03-31", "2024-04-30"]
    );
}

#[test]
fn second_run_with_same_as_of_creates_nothing() {
    let mut conn = setup();
    let id = add_template(&conn, "25.00", "USD", "weekly", "2025-01-06", None);
    let source = FixedSource::new("1");
    let converter = CurrencyConverter::new(&source, Duration::hours(24), Utc::now());

    recurring::run(&mut conn, &converter, d("2025-01-20")).unwrap();
    assert_eq!(expense_dates(&conn, id).len(), 3);

    let again = recurring::run(&mut conn, &converter, d("2025-01-20")).unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(again.skipped, 0);
    assert_eq!(again.failed, 0);
    assert_eq!(expense_dates(&conn, id).len(), 3);
}

#[test]
fn conversion_failure_leaves_marker_for_retry() {
    let mut conn = setup();
    let id = add_template(&conn, "9.99", "EUR", "monthly", "2025-05-01", None);
    let converter = CurrencyConverter::new(&DownSource, Duration::hours(24), Utc::now());

    let report = recurring::run(&mut conn, &converter, d("2025-05-02")).unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(expense_dates(&conn, id).is_empty());
    assert_eq!(marker(&conn, id), None);

    // Next tick, the source is back: the same due date materializes.
    let source = FixedSource::new("1.10");
    let converter = CurrencyConverter::new(&source, Duration::hours(24), Utc::now());
    let retry = recurring::run(&mut conn, &converter, d("2025-05-02")).unwrap();
    assert_eq!(retry.created, 1);
    assert_eq!(marker(&conn, id).as_deref(), Some("2025-05-01"));
    let converted: String = conn
        .query_row(
            "SELECT converted_amount FROM expenses WHERE recurring_id=?1",
            params![id],
            |r| r.get(0),
        )
        .unwrap();
    // 9.99 * 1.10 = 10.989 -> 10.99 half up
    assert_eq!(converted, "10.99");
}

#[test]
fn one_failing_template_does_not_block_the_rest() {
    let mut conn = setup();
    let bad = add_template(&conn, "9.99", "EUR", "monthly", "2025-05-01", None);
    let good = add_template(&conn, "25.00", "USD", "weekly", "2025-04-28", None);
    let converter = CurrencyConverter::new(&DownSource, Duration::hours(24), Utc::now());

    let report = recurring::run(&mut conn, &converter, d("2025-05-05")).unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.created, 2); // Apr 28 + May 5 for the USD template
    assert!(expense_dates(&conn, bad).is_empty());
    assert_eq!(expense_dates(&conn, good).len(), 2);
}

#[test]
fn existing_cycle_expense_is_skipped_not_duplicated() {
    let mut conn = setup();
    let id = add_template(&conn, "50", "USD", "monthly", "2025-05-10", None);
    // A previous run wrote the expense but crashed before moving the marker
    conn.execute(
        "INSERT INTO expenses(user_id, category_id, date, description, amount, currency,
                              converted_amount, conversion_rate, recurring_id)
         VALUES (1, NULL, '2025-05-10', '[Recurring] Gym', '50', 'USD', '50.00', '1', ?1)",
        params![id],
    )
    .unwrap();

    let source = FixedSource::new("1");
    let converter = CurrencyConverter::new(&source, Duration::hours(24), Utc::now());
    let report = recurring::run(&mut conn, &converter, d("2025-06-10")).unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.created, 1);
    assert_eq!(
        expense_dates(&conn, id),
        vec!["2025-05-10", "2025-06-10"]
    );
    assert_eq!(marker(&conn, id).as_deref(), Some("2025-06-10"));
}

#[test]
fn inactive_templates_are_ignored() {
    let mut conn = setup();
    let id = add_template(&conn, "25.00", "USD", "weekly", "2025-01-06", None);
    conn.execute("UPDATE recurring_charges SET is_active=0 WHERE id=?1", params![id])
        .unwrap();
    let source = FixedSource::new("1");
    let converter = CurrencyConverter::new(&source, Duration::hours(24), Utc::now());
    let report = recurring::run(&mut conn, &converter, d("2025-03-10")).unwrap();
    assert_eq!(report.created, 0);
    assert!(expense_dates(&conn, id).is_empty());
}
