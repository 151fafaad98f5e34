// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Per-item failures inside an engine pass. Each variant carries its own
/// retry semantics: `RateUnavailable`, `Store` and `NotificationSend` are
/// retried on the next tick, `Precision` is a data problem that needs a
/// manual fix and is only reported.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no exchange rate available for {base}->{target}")]
    RateUnavailable { base: String, target: String },
    #[error("bad amount or currency: {0}")]
    Precision(String),
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("notification send failed: {0}")]
    NotificationSend(String),
}
