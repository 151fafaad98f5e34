// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

use super::currency::round_money;
use super::errors::EngineError;
use crate::config::EngineConfig;
use crate::utils::month_bounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    Normal,
    Warning,
    Alert,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Normal => write!(f, "normal"),
            Tier::Warning => write!(f, "warning"),
            Tier::Alert => write!(f, "alert"),
        }
    }
}

/// One budget row compared against actual base-currency spend.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub budget_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub budget_amount: Decimal,
    pub actual_amount: Decimal,
    pub remaining: Decimal,
    pub percentage: Decimal,
    pub tier: Tier,
    pub warning_sent: bool,
    pub alert_sent: bool,
}

/// Spend percentage against the ceiling. A zero ceiling yields 0 rather
/// than dividing; `classify` still flags spend against it.
pub fn spend_percentage(budget: Decimal, actual: Decimal) -> Decimal {
    if budget.is_zero() {
        Decimal::ZERO
    } else {
        round_money(actual / budget * Decimal::from(100))
    }
}

pub fn classify(budget: Decimal, actual: Decimal, percentage: Decimal, cfg: &EngineConfig) -> Tier {
    if budget.is_zero() {
        return if actual > Decimal::ZERO {
            Tier::Alert
        } else {
            Tier::Normal
        };
    }
    if percentage >= cfg.alert_threshold {
        Tier::Alert
    } else if percentage >= cfg.warning_threshold {
        Tier::Warning
    } else {
        Tier::Normal
    }
}

/// Compare each of the user's budgets for the month against actual spend.
/// Expenses are aggregated on their stored base-currency amounts, so no
/// conversion happens here. Read-only: flag mutation belongs to the
/// dispatcher, which keeps evaluation idempotent.
pub fn evaluate(
    conn: &Connection,
    user_id: i64,
    month: u32,
    year: i32,
    cfg: &EngineConfig,
) -> Result<Vec<BudgetStatus>, EngineError> {
    let (first, last) = month_bounds(year, month)
        .map_err(|e| EngineError::Precision(e.to_string()))?;

    let mut stmt = conn.prepare(
        "SELECT b.id, b.category_id, c.name, b.amount, b.warning_sent, b.alert_sent
         FROM budgets b
         JOIN categories c ON b.category_id = c.id
         WHERE b.user_id=?1 AND b.month=?2 AND b.year=?3
         ORDER BY c.name",
    )?;
    let rows = stmt.query_map(params![user_id, month, year], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, bool>(4)?,
            r.get::<_, bool>(5)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (budget_id, category_id, category_name, amount_s, warning_sent, alert_sent) = row?;
        let budget_amount = amount_s
            .parse::<Decimal>()
            .map_err(|_| EngineError::Precision(format!("budget {} amount '{}'", budget_id, amount_s)))?;
        let actual_amount = spent_in_month(conn, user_id, category_id, first, last)?;
        let percentage = spend_percentage(budget_amount, actual_amount);
        let tier = classify(budget_amount, actual_amount, percentage, cfg);
        out.push(BudgetStatus {
            budget_id,
            category_id,
            category_name,
            budget_amount,
            actual_amount,
            remaining: budget_amount - actual_amount,
            percentage,
            tier,
            warning_sent,
            alert_sent,
        });
    }
    Ok(out)
}

fn spent_in_month(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
    first: chrono::NaiveDate,
    last: chrono::NaiveDate,
) -> Result<Decimal, EngineError> {
    let mut stmt = conn.prepare(
        "SELECT converted_amount FROM expenses
         WHERE user_id=?1 AND category_id=?2 AND date>=?3 AND date<=?4",
    )?;
    let rows = stmt.query_map(
        params![user_id, category_id, first.to_string(), last.to_string()],
        |r| r.get::<_, String>(0),
    )?;
    let mut total = Decimal::ZERO;
    for row in rows {
        let s = row?;
        let amt = s
            .parse::<Decimal>()
            .map_err(|_| EngineError::Precision(format!("converted amount '{}'", s)))?;
        total += amt;
    }
    Ok(total)
}
