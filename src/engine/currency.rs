// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::collections::HashMap;

use super::errors::EngineError;
use crate::utils::http_client;

/// Live rate lookup for an ordered currency pair. Implementations may hit
/// the network; the converter treats any error as "try the cache instead".
pub trait RateSource {
    fn fetch(&self, base: &str, target: &str) -> anyhow::Result<Decimal>;
}

/// Frankfurter (ECB) latest-rate endpoint.
pub struct FrankfurterSource {
    client: reqwest::blocking::Client,
}

impl FrankfurterSource {
    pub fn new() -> anyhow::Result<Self> {
        Ok(FrankfurterSource {
            client: http_client()?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Latest {
    rates: HashMap<String, f64>,
}

impl RateSource for FrankfurterSource {
    fn fetch(&self, base: &str, target: &str) -> anyhow::Result<Decimal> {
        let url = format!("https://api.frankfurter.dev/latest?from={base}&to={target}");
        let resp = self.client.get(url).send()?.error_for_status()?;
        let body: Latest = resp.json()?;
        let raw = body
            .rates
            .get(target)
            .ok_or_else(|| anyhow::anyhow!("No rate for {} in response", target))?;
        let rate = Decimal::try_from(*raw)?;
        if rate <= Decimal::ZERO {
            return Err(anyhow::anyhow!("Non-positive rate {} for {}->{}", rate, base, target));
        }
        Ok(rate)
    }
}

/// Result of a single conversion: the rounded base-currency amount and the
/// rate that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub amount: Decimal,
    pub rate: Decimal,
}

/// Round to the minor unit, half away from zero.
pub fn round_money(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Resolves exchange rates through the fx_cache table, falling back to the
/// live source on miss/expiry and to a stale entry when the source is down.
/// Deliberately clock-free: the caller injects `now`.
pub struct CurrencyConverter<'a> {
    source: &'a dyn RateSource,
    freshness: Duration,
    now: DateTime<Utc>,
}

impl<'a> CurrencyConverter<'a> {
    pub fn new(source: &'a dyn RateSource, freshness: Duration, now: DateTime<Utc>) -> Self {
        CurrencyConverter {
            source,
            freshness,
            now,
        }
    }

    pub fn rate(&self, conn: &Connection, base: &str, target: &str) -> Result<Decimal, EngineError> {
        validate_code(base)?;
        validate_code(target)?;
        if base == target {
            return Ok(Decimal::ONE);
        }

        let cached = self.cached(conn, base, target)?;
        if let Some((rate, fetched_at)) = &cached {
            if self.now - *fetched_at < self.freshness {
                return Ok(*rate);
            }
        }

        match self.source.fetch(base, target) {
            Ok(rate) => {
                self.store(conn, base, target, rate)?;
                Ok(rate)
            }
            Err(e) => {
                // Degrade to the stale entry rather than stall generation.
                if let Some((rate, fetched_at)) = cached {
                    tracing::warn!(
                        base,
                        target,
                        %fetched_at,
                        "rate fetch failed ({e:#}); using stale cached rate"
                    );
                    Ok(rate)
                } else {
                    tracing::error!(base, target, "rate fetch failed ({e:#}); no cached rate");
                    Err(EngineError::RateUnavailable {
                        base: base.to_string(),
                        target: target.to_string(),
                    })
                }
            }
        }
    }

    pub fn convert(
        &self,
        conn: &Connection,
        amount: Decimal,
        base: &str,
        target: &str,
    ) -> Result<Conversion, EngineError> {
        let rate = self.rate(conn, base, target)?;
        Ok(Conversion {
            amount: round_money(amount * rate),
            rate,
        })
    }

    fn cached(
        &self,
        conn: &Connection,
        base: &str,
        target: &str,
    ) -> Result<Option<(Decimal, DateTime<Utc>)>, EngineError> {
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT rate, fetched_at FROM fx_cache WHERE base=?1 AND target=?2",
                params![base, target],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((rate_s, fetched_s)) = row else {
            return Ok(None);
        };
        let rate = rate_s
            .parse::<Decimal>()
            .map_err(|_| EngineError::Precision(format!("cached rate '{}' for {}->{}", rate_s, base, target)))?;
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_s)
            .map_err(|_| {
                EngineError::Precision(format!("cached timestamp '{}' for {}->{}", fetched_s, base, target))
            })?
            .with_timezone(&Utc);
        Ok(Some((rate, fetched_at)))
    }

    fn store(
        &self,
        conn: &Connection,
        base: &str,
        target: &str,
        rate: Decimal,
    ) -> Result<(), EngineError> {
        conn.execute(
            "INSERT INTO fx_cache(base, target, rate, fetched_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(base, target) DO UPDATE SET rate=excluded.rate, fetched_at=excluded.fetched_at",
            params![base, target, rate.to_string(), self.now.to_rfc3339()],
        )?;
        Ok(())
    }
}

fn validate_code(code: &str) -> Result<(), EngineError> {
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(EngineError::Precision(format!(
            "currency code '{}' is not a 3-letter code",
            code
        )))
    }
}
