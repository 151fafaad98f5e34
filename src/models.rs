// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::days_in_month;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub base_currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Frequency> {
        match s.to_lowercase().as_str() {
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            _ => None,
        }
    }

    /// Next cycle boundary after `from`. Monthly cadences target the
    /// template's start day-of-month (`anchor_day`), clamped to the length
    /// of the target month, so a Jan 31 series lands on Feb 29/28 and is
    /// back on the 31st in March.
    pub fn advance(&self, from: NaiveDate, anchor_day: u32) -> NaiveDate {
        match self {
            Frequency::Weekly => from + Duration::days(7),
            Frequency::Monthly => {
                let (mut y, mut m) = (from.year(), from.month() + 1);
                if m > 12 {
                    m = 1;
                    y += 1;
                }
                let day = anchor_day.min(days_in_month(y, m));
                NaiveDate::from_ymd_opt(y, m, day).expect("clamped day fits target month")
            }
        }
    }
}

/// A user's standing instruction to produce one expense per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringCharge {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub last_generated_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl RecurringCharge {
    /// The next date this template owes an expense. Derived solely from the
    /// last generated cycle (or the start date for a fresh template), never
    /// from today, so missed runs catch up deterministically.
    pub fn next_due(&self) -> NaiveDate {
        match self.last_generated_date {
            Some(last) => self.frequency.advance(last, self.start_date.day()),
            None => self.start_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub converted_amount: Decimal, // base currency
    pub conversion_rate: Decimal,
    pub recurring_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub month: u32,
    pub year: i32,
    pub amount: Decimal, // base currency ceiling
    pub warning_sent: bool,
    pub alert_sent: bool,
}
