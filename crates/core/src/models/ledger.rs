use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::metal::Metal;
use crate::errors::CoreError;

/// Kind of ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationType {
    /// Scheduled purchase of metal
    Purchase,
    /// Explicit sale of metal
    Sale,
    /// Purchase emitted by a rebalance
    RebalancePurchase,
    /// Sale emitted by a rebalance
    RebalanceSale,
}

impl OperationType {
    /// Purchases of either kind count towards invested capital.
    pub fn is_acquisition(&self) -> bool {
        matches!(self, OperationType::Purchase | OperationType::RebalancePurchase)
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Purchase => write!(f, "Purchase"),
            OperationType::Sale => write!(f, "Sale"),
            OperationType::RebalancePurchase => write!(f, "Rebalance purchase"),
            OperationType::RebalanceSale => write!(f, "Rebalance sale"),
        }
    }
}

/// A single row of the ledger.
///
/// Sign convention: `quantity` is positive when metal is accumulated and
/// negative when it is reduced. `operation_amount` follows the same
/// direction: cash spent on a purchase is positive, cash returned by a
/// sale is negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier
    pub id: Uuid,

    pub date: NaiveDate,

    pub operation_type: OperationType,

    pub metal: Metal,

    /// Signed metal quantity
    pub quantity: f64,

    /// Effective unit price of the operation (margin already applied)
    pub unit_price: f64,

    /// Signed cash amount of the operation
    pub operation_amount: f64,

    /// Storage cost charged against this row (written by the storage engine)
    #[serde(default)]
    pub storage_cost: f64,

    /// Row value once storage cost has been covered
    #[serde(default)]
    pub amount_after_cost: f64,
}

impl LedgerEntry {
    pub fn new(
        date: NaiveDate,
        operation_type: OperationType,
        metal: Metal,
        quantity: f64,
        unit_price: f64,
        operation_amount: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            operation_type,
            metal,
            quantity,
            unit_price,
            operation_amount,
            storage_cost: 0.0,
            amount_after_cost: operation_amount,
        }
    }
}

/// Append-only transaction history of the simulated portfolio.
///
/// Operations never edit an existing ledger in place; they return a new
/// `Ledger` built from this one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<LedgerEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A new ledger with `new_entries` appended after the existing rows.
    pub fn appended(&self, new_entries: impl IntoIterator<Item = LedgerEntry>) -> Self {
        let mut entries = self.entries.clone();
        entries.extend(new_entries);
        Self { entries }
    }

    /// Net quantity held per metal across the whole ledger. Metals whose
    /// net quantity is zero are still listed if they ever appeared.
    pub fn holdings(&self) -> BTreeMap<Metal, f64> {
        let mut holdings = BTreeMap::new();
        for entry in &self.entries {
            *holdings.entry(entry.metal).or_insert(0.0) += entry.quantity;
        }
        holdings
    }

    /// Net quantity held of one metal (0 if never traded).
    pub fn held_quantity(&self, metal: Metal) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.metal == metal)
            .map(|e| e.quantity)
            .sum()
    }

    /// Rows dated on or before `date`.
    pub fn until(&self, date: NaiveDate) -> Ledger {
        Ledger {
            entries: self
                .entries
                .iter()
                .filter(|e| e.date <= date)
                .cloned()
                .collect(),
        }
    }

    /// Flat `column → value` table for export collaborators (CSV/Excel/PDF).
    pub fn to_rows(&self) -> Result<Vec<serde_json::Map<String, serde_json::Value>>, CoreError> {
        to_rows(&self.entries)
    }
}

/// Serialize any list of records into flat `column → value` maps.
pub(crate) fn to_rows<T: Serialize>(
    records: &[T],
) -> Result<Vec<serde_json::Map<String, serde_json::Value>>, CoreError> {
    records
        .iter()
        .map(|record| match serde_json::to_value(record)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(CoreError::Serialization(format!(
                "expected a record, got {other}"
            ))),
        })
        .collect()
}
