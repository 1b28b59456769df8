use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::BTreeMap;

use crate::models::ledger::{Ledger, LedgerEntry};
use crate::models::metal::Metal;
use crate::models::settings::{CoverageMethod, StorageFrequency, StorageSettings};

/// Accrues periodic storage (custody) fees against the ledger.
///
/// Rows are grouped by date. Each date is charged
/// `Σ operation_amount × period_rate × (1 + VAT)`, and the coverage method
/// decides who pays:
/// - `Cash`: split evenly over the date's rows; quantities untouched.
/// - `Metal(m)`: the date's `m` purchases are liquidated to fund the whole cost.
/// - `AllMetals`: every purchase funds its share of the date's purchased
///   amount by selling its own metal.
///
/// Liquidation never takes a row below zero quantity; whatever the metal
/// on hand cannot fund is dropped with a warning.
///
/// Only `storage_cost`, `amount_after_cost` and (for metal coverage)
/// `quantity` are written. `operation_amount` is never touched.
pub struct StorageCostService;

impl StorageCostService {
    pub fn new() -> Self {
        Self
    }

    /// Accrue using a settings block.
    pub fn accrue(&self, ledger: &Ledger, settings: &StorageSettings) -> Ledger {
        self.accrue_storage_costs(
            ledger,
            settings.fee_rate_percent,
            settings.frequency,
            settings.vat_rate_percent,
            settings.coverage,
        )
    }

    /// Return a new ledger with storage costs applied.
    ///
    /// Output rows are grouped by ascending date; rows sharing a date keep
    /// their ledger order. The cost columns are reset before accruing; under
    /// metal coverage the quantities sold by an earlier accrual stay sold.
    pub fn accrue_storage_costs(
        &self,
        ledger: &Ledger,
        fee_rate_percent: f64,
        frequency: StorageFrequency,
        vat_rate_percent: f64,
        coverage: CoverageMethod,
    ) -> Ledger {
        let period_rate = frequency.period_rate(fee_rate_percent);
        let vat_multiplier = 1.0 + vat_rate_percent / 100.0;

        let mut by_date: BTreeMap<NaiveDate, Vec<LedgerEntry>> = BTreeMap::new();
        for entry in ledger.entries() {
            by_date.entry(entry.date).or_default().push(entry.clone());
        }

        let mut out = Vec::with_capacity(ledger.len());
        for (date, mut group) in by_date {
            for row in &mut group {
                row.storage_cost = 0.0;
                row.amount_after_cost = row.operation_amount;
            }

            let base: f64 = group.iter().map(|r| r.operation_amount).sum();
            // A date whose net amount is not positive accrues nothing
            let gross_cost = (base * period_rate * vat_multiplier).max(0.0);

            if gross_cost > 0.0 {
                match coverage {
                    CoverageMethod::Cash => cover_with_cash(&mut group, gross_cost),
                    CoverageMethod::Metal(metal) => {
                        cover_with_metal(&mut group, metal, gross_cost, date)
                    }
                    CoverageMethod::AllMetals => cover_with_all_metals(&mut group, gross_cost),
                }
            }

            out.extend(group);
        }

        debug!(
            "Accrued storage costs on {} rows ({} coverage, {:?} at {}%)",
            out.len(),
            coverage,
            frequency,
            fee_rate_percent
        );

        Ledger::from_entries(out)
    }

    /// Total storage cost recorded in the ledger.
    pub fn total_storage_cost(&self, ledger: &Ledger) -> f64 {
        ledger.entries().iter().map(|e| e.storage_cost).sum()
    }
}

impl Default for StorageCostService {
    fn default() -> Self {
        Self::new()
    }
}

fn cover_with_cash(group: &mut [LedgerEntry], gross_cost: f64) {
    let per_row = gross_cost / group.len() as f64;
    for row in group.iter_mut() {
        row.storage_cost = per_row;
        row.amount_after_cost = row.operation_amount - per_row;
    }
}

/// Rows that hold metal and can give some of it up.
fn can_fund(row: &LedgerEntry) -> bool {
    row.quantity > 0.0 && row.operation_amount > 0.0
}

fn cover_with_metal(group: &mut [LedgerEntry], metal: Metal, gross_cost: f64, date: NaiveDate) {
    let Some(price) = group
        .iter()
        .find(|r| r.metal == metal && can_fund(r))
        .map(|r| r.unit_price)
    else {
        // No rollover and no cash fallback: the period's cost is dropped.
        warn!(
            "No {} bought on {}, storage cost of {:.2} not covered",
            metal, date, gross_cost
        );
        return;
    };
    if !(price.is_finite() && price > 0.0) {
        warn!("Unusable {} price on {}, storage cost not covered", metal, date);
        return;
    }

    let units_to_sell = gross_cost / price;

    // Split the liquidation over this metal's rows by their share of the
    // metal's amount, so several same-day purchases fund the cost once.
    let metal_amount: f64 = group
        .iter()
        .filter(|r| r.metal == metal && can_fund(r))
        .map(|r| r.operation_amount)
        .sum();
    let mut units_sold = 0.0;
    let mut exhausted = false;
    for row in group.iter_mut().filter(|r| r.metal == metal && can_fund(r)) {
        let wanted = units_to_sell * row.operation_amount / metal_amount;
        // A row never gives up more than it holds
        let units = if wanted >= row.quantity {
            exhausted |= wanted > row.quantity;
            row.quantity
        } else {
            wanted
        };
        row.quantity -= units;
        units_sold += units;
    }

    let covered_cost = if exhausted {
        let covered = units_sold * price;
        warn!(
            "{} bought on {} covers only {:.2} of {:.2} storage cost, remainder not covered",
            metal, date, covered, gross_cost
        );
        covered
    } else {
        gross_cost
    };

    let per_row = covered_cost / group.len() as f64;
    for row in group.iter_mut() {
        row.storage_cost = per_row;
        row.amount_after_cost = row.quantity * row.unit_price;
    }
}

fn cover_with_all_metals(group: &mut [LedgerEntry], gross_cost: f64) {
    let funding_amount: f64 = group
        .iter()
        .filter(|r| can_fund(r))
        .map(|r| r.operation_amount)
        .sum();
    if funding_amount <= 0.0 {
        return;
    }

    for row in group.iter_mut().filter(|r| can_fund(r)) {
        let row_cost = gross_cost * row.operation_amount / funding_amount;
        let price = row.unit_price;
        if !(price.is_finite() && price > 0.0) {
            warn!(
                "Unusable {} price on {}, storage share of {:.2} not covered",
                row.metal, row.date, row_cost
            );
            continue;
        }

        let available = row.quantity * price;
        if row_cost >= available {
            if row_cost > available {
                warn!(
                    "{} row on {} covers only {:.2} of its {:.2} storage share",
                    row.metal, row.date, available, row_cost
                );
            }
            row.quantity = 0.0;
            row.storage_cost = available;
        } else {
            row.quantity -= row_cost / price;
            row.storage_cost = row_cost;
        }
        row.amount_after_cost = row.quantity * price;
    }
}
