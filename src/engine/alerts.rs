// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{params, Connection};
use serde::Serialize;

use super::budget::{BudgetStatus, Tier};
use super::errors::EngineError;
use crate::config::EngineConfig;
use crate::models::User;

/// Delivery seam for budget notifications. The bundled implementation
/// logs; a mail transport slots in behind the same trait.
pub trait Notifier {
    fn send(&self, user: &User, status: &BudgetStatus) -> anyhow::Result<()>;
}

/// Writes each notification to the log stream.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, user: &User, status: &BudgetStatus) -> anyhow::Result<()> {
        tracing::info!(
            user = %user.name,
            category = %status.category_name,
            tier = %status.tier,
            percentage = %status.percentage,
            "budget notification"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Sent,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub budget_id: i64,
    pub category: String,
    pub tier: Tier,
    pub outcome: Outcome,
}

/// Decide, per budget row, whether a notification is owed and fire it at
/// most once per tier per period. Exactly one rule applies per tick, keyed
/// on the current tier; the one-shot flags re-arm naturally when a new
/// month creates a fresh budget row.
pub fn dispatch(
    conn: &Connection,
    notifier: &dyn Notifier,
    user: &User,
    statuses: &[BudgetStatus],
    cfg: &EngineConfig,
) -> Vec<DispatchResult> {
    let mut results = Vec::new();
    for status in statuses {
        let owed = match status.tier {
            Tier::Alert if !status.alert_sent => true,
            Tier::Warning if !status.warning_sent => true,
            _ => false,
        };
        if !owed {
            continue;
        }
        if !cfg.notifications_enabled {
            // Leave the flags armed so enabling later still fires.
            results.push(DispatchResult {
                budget_id: status.budget_id,
                category: status.category_name.clone(),
                tier: status.tier,
                outcome: Outcome::Skipped,
            });
            continue;
        }
        let outcome = match notifier.send(user, status) {
            Ok(()) => {
                if let Err(e) = mark_sent(conn, status.budget_id, status.tier) {
                    // The send went out but the flag did not stick; the next
                    // tick may send a duplicate. Surface it and move on.
                    tracing::warn!(
                        budget = status.budget_id,
                        tier = %status.tier,
                        "reconciliation hazard: notification sent but flag update failed: {e}"
                    );
                }
                Outcome::Sent
            }
            Err(e) => {
                let err = EngineError::NotificationSend(format!("{e:#}"));
                tracing::error!(budget = status.budget_id, tier = %status.tier, "{err}");
                Outcome::Failed
            }
        };
        results.push(DispatchResult {
            budget_id: status.budget_id,
            category: status.category_name.clone(),
            tier: status.tier,
            outcome,
        });
    }
    results
}

fn mark_sent(conn: &Connection, budget_id: i64, tier: Tier) -> Result<(), EngineError> {
    let sql = match tier {
        Tier::Alert => "UPDATE budgets SET alert_sent=1 WHERE id=?1",
        Tier::Warning => "UPDATE budgets SET warning_sent=1 WHERE id=?1",
        Tier::Normal => return Ok(()),
    };
    conn.execute(sql, params![budget_id])?;
    Ok(())
}
