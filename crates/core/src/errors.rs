use chrono::NaiveDate;
use thiserror::Error;

/// Unified error type for the entire metals-simulator-core library.
/// Every public fallible function returns `Result<T, CoreError>`.
///
/// Data gaps (a schedule date with no price row, a metal with no usable price
/// on a given row) are NOT errors: the builder skips that unit of work and
/// counts it in its diagnostics. Only precondition violations surface here.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Validation ──────────────────────────────────────────────────
    #[error("Invalid allocation: weights sum to {sum}%, expected 100%")]
    InvalidAllocation { sum: f64 },

    #[error("Invalid allocation: weight {weight}% for {metal} must be a non-negative number")]
    InvalidWeight { metal: String, weight: f64 },

    #[error("Unknown metal: {0}")]
    UnknownMetal(String),

    #[error("Insufficient holdings of {metal}: requested {requested}, held {held}")]
    InsufficientHoldings {
        metal: String,
        requested: f64,
        held: f64,
    },

    // ── Price data ──────────────────────────────────────────────────
    #[error("No price data for {metal} on or around {date}")]
    MissingPriceData { metal: String, date: NaiveDate },

    // ── Settings / export ───────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            CoreError::Deserialization(e.to_string())
        } else {
            CoreError::Serialization(e.to_string())
        }
    }
}
