use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::allocation::Allocation;
use crate::models::ledger::{Ledger, LedgerEntry, OperationType};
use crate::models::price::{FallbackOrder, PriceSeries};
use crate::models::schedule::ScheduleEntry;
use crate::services::price_service::PriceService;

/// Result of building a ledger from a schedule, with data-gap diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub ledger: Ledger,

    /// Schedule entries dropped because no price row resolved for their date
    pub skipped_entries: usize,

    /// Single-metal purchases dropped because that metal had no usable
    /// price on the resolved row
    pub skipped_allocations: usize,
}

/// Turns a purchase schedule into a ledger of weighted purchases.
///
/// Pure business logic: no I/O, inputs are never mutated.
pub struct PortfolioService {
    price_service: PriceService,
}

impl PortfolioService {
    pub fn new() -> Self {
        Self {
            price_service: PriceService::new(),
        }
    }

    /// Build the purchase ledger.
    ///
    /// For every schedule entry the price row is resolved with the canonical
    /// fallback order (exact → next → previous). Each metal with a positive
    /// weight then receives `amount × weight / 100`, bought at the row price
    /// marked up by `purchase_margin_percent`. The margin reduces the quantity
    /// received; the cash spent stays the allocated amount.
    ///
    /// Empty schedule or empty price series → empty ledger (not an error).
    /// Allocation not summing to exactly 100 → `InvalidAllocation`.
    pub fn build_portfolio(
        &self,
        schedule: &[ScheduleEntry],
        prices: &PriceSeries,
        allocation: &Allocation,
        purchase_margin_percent: f64,
    ) -> Result<BuildOutcome, CoreError> {
        allocation.validate_exact()?;

        if schedule.is_empty() || prices.is_empty() {
            return Ok(BuildOutcome::default());
        }

        let margin_factor = 1.0 + purchase_margin_percent / 100.0;
        let mut entries = Vec::new();
        let mut skipped_entries = 0;
        let mut skipped_allocations = 0;

        for item in schedule {
            let Some(row) =
                self.price_service
                    .resolve_row(prices, item.date, FallbackOrder::NextThenPrevious)
            else {
                warn!("No price data around {}, skipping contribution of {}", item.date, item.amount);
                skipped_entries += 1;
                continue;
            };

            for (metal, weight) in allocation.active() {
                let allocated_amount = item.amount * weight / 100.0;

                let Some(unit_price) = row.usable_price(metal) else {
                    warn!(
                        "No usable {} price on {} (scheduled {}), skipping {:.2}",
                        metal, row.date, item.date, allocated_amount
                    );
                    skipped_allocations += 1;
                    continue;
                };

                let price_with_margin = unit_price * margin_factor;
                let quantity = allocated_amount / price_with_margin;

                entries.push(LedgerEntry::new(
                    item.date,
                    OperationType::Purchase,
                    metal,
                    quantity,
                    price_with_margin,
                    allocated_amount,
                ));
            }
        }

        debug!(
            "Built ledger: {} purchases from {} schedule entries ({} entries skipped, {} allocations skipped)",
            entries.len(),
            schedule.len(),
            skipped_entries,
            skipped_allocations
        );

        Ok(BuildOutcome {
            ledger: Ledger::from_entries(entries),
            skipped_entries,
            skipped_allocations,
        })
    }
}

impl Default for PortfolioService {
    fn default() -> Self {
        Self::new()
    }
}
