use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ledger::to_rows;
use super::metal::Metal;
use crate::errors::CoreError;

/// Aggregated position in one metal, derived from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalSummary {
    pub metal: Metal,

    /// Net quantity held (purchases minus sales and cost liquidations)
    pub total_quantity: f64,

    /// Cash put into purchases of this metal (rebalance purchases included)
    pub total_invested: f64,

    /// Unit price of the chronologically last ledger row for this metal
    pub last_unit_price: f64,

    /// total_quantity × last_unit_price
    pub current_value: f64,

    /// current_value − total_invested
    pub profit_loss: f64,

    /// profit_loss / total_invested × 100, or 0 when nothing was invested
    pub roi_percent: f64,
}

/// Per-metal summary of a ledger, one row per metal present.
///
/// Always recomputed from the ledger; never updated incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub rows: Vec<MetalSummary>,
}

impl Summary {
    pub fn get(&self, metal: Metal) -> Option<&MetalSummary> {
        self.rows.iter().find(|r| r.metal == metal)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_invested(&self) -> f64 {
        self.rows.iter().map(|r| r.total_invested).sum()
    }

    pub fn total_value(&self) -> f64 {
        self.rows.iter().map(|r| r.current_value).sum()
    }

    pub fn total_profit_loss(&self) -> f64 {
        self.rows.iter().map(|r| r.profit_loss).sum()
    }

    /// Flat `column → value` table for export collaborators.
    pub fn to_rows(&self) -> Result<Vec<serde_json::Map<String, serde_json::Value>>, CoreError> {
        to_rows(&self.rows)
    }
}

/// Share of one metal in the portfolio's current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalWeight {
    pub metal: Metal,
    pub quantity: f64,
    pub price: f64,
    pub value: f64,
    pub weight_percent: f64,
}

/// Portfolio state at one valuation date (for time-series charts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    pub invested_amount: f64,
    pub profit_loss: f64,
    pub roi_percent: f64,
}

/// Outcome of one named allocation in a strategy comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub name: String,
    pub invested: f64,
    pub final_value: f64,
    pub profit_loss: f64,
    pub roi_percent: f64,
    pub annualized_return_percent: f64,
    pub years: f64,
}
