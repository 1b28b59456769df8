use chrono::NaiveDate;
use log::{debug, warn};

use crate::errors::CoreError;
use crate::models::allocation::{Allocation, REBALANCE_SUM_TOLERANCE};
use crate::models::ledger::{Ledger, LedgerEntry, OperationType};
use crate::models::metal::Metal;
use crate::models::price::{PriceRow, PriceSeries};
use crate::services::price_service::PriceService;

/// Differences smaller than this share of total value are not traded.
const REBALANCE_THRESHOLD: f64 = 0.01;

/// Slack allowed when comparing a sell request with the held quantity.
const HOLDING_TOLERANCE: f64 = 1e-9;

/// Appends sell and rebalance operations to a ledger.
///
/// Both operations price at the first row on or after the trade date (the
/// last row when the date is past the series end). They are strict: a metal
/// that must trade but has no price fails the whole call, and a failed call
/// never yields a partial ledger.
pub struct RebalanceService {
    price_service: PriceService,
}

impl RebalanceService {
    pub fn new() -> Self {
        Self {
            price_service: PriceService::new(),
        }
    }

    /// Trade the ledger back towards `target` on `rebalance_date`.
    ///
    /// All holdings are valued at market price; a metal absent from `target`
    /// has a 0% target and is sold off. A metal whose value is off its target by more than 1% of the total
    /// gets a RebalancePurchase (priced with the margin added) or a
    /// RebalanceSale (priced with the margin removed). Smaller drifts are left
    /// alone. An empty ledger, an empty series or a worthless portfolio comes
    /// back unchanged.
    pub fn rebalance(
        &self,
        ledger: &Ledger,
        prices: &PriceSeries,
        target: &Allocation,
        rebalance_date: NaiveDate,
        margin_percent: f64,
    ) -> Result<Ledger, CoreError> {
        target.validate_within(REBALANCE_SUM_TOLERANCE)?;

        if ledger.is_empty() || prices.is_empty() {
            return Ok(ledger.clone());
        }
        let Some(row) = self.price_service.trading_row(prices, rebalance_date) else {
            return Ok(ledger.clone());
        };

        let holdings = ledger.holdings();
        let mut positions: Vec<(Metal, f64, f64, Option<f64>)> = Vec::new();
        let mut total_value = 0.0;

        // Metals missing from the target count as 0%, so holdings of them are sold down
        for metal in Metal::ALL {
            let weight = target.weight(metal);
            let quantity = holdings.get(&metal).copied().unwrap_or(0.0);
            if weight <= 0.0 && quantity <= HOLDING_TOLERANCE {
                continue;
            }
            let price = row.usable_price(metal);
            if price.is_none() && quantity > HOLDING_TOLERANCE {
                warn!(
                    "No usable {} price on {}, holding of {} left out of the rebalance",
                    metal, row.date, quantity
                );
            }
            let value = price.map(|p| quantity * p).unwrap_or(0.0);
            total_value += value;
            positions.push((metal, weight, value, price));
        }

        if total_value <= 0.0 {
            return Ok(ledger.clone());
        }

        let mut trades = Vec::new();
        for (metal, weight, current_value, price) in positions {
            let difference = total_value * weight / 100.0 - current_value;
            if difference.abs() <= total_value * REBALANCE_THRESHOLD {
                continue;
            }
            let price = match price {
                Some(p) => p,
                None => return Err(missing_price(prices, row, metal)),
            };

            if difference > 0.0 {
                let unit_price = price * (1.0 + margin_percent / 100.0);
                trades.push(LedgerEntry::new(
                    rebalance_date,
                    OperationType::RebalancePurchase,
                    metal,
                    difference / unit_price,
                    unit_price,
                    difference,
                ));
            } else {
                let quantity = difference.abs() / price;
                let unit_price = price * (1.0 - margin_percent / 100.0);
                trades.push(LedgerEntry::new(
                    rebalance_date,
                    OperationType::RebalanceSale,
                    metal,
                    -quantity,
                    unit_price,
                    -(quantity * unit_price),
                ));
            }
        }

        debug!(
            "Rebalance on {}: {} trades against total value {:.2}",
            rebalance_date,
            trades.len(),
            total_value
        );

        Ok(ledger.appended(trades))
    }

    /// Sell `quantity` of `metal` on `date`.
    ///
    /// Returns the new ledger and the cash proceeds
    /// (`quantity × price × (1 − margin)`).
    ///
    /// Errors:
    /// - `InsufficientHoldings` if `quantity` is not positive or exceeds
    ///   the ledger's net holding of the metal.
    /// - `UnknownMetal` / `MissingPriceData` if the metal cannot be priced.
    pub fn sell(
        &self,
        ledger: &Ledger,
        metal: Metal,
        quantity: f64,
        date: NaiveDate,
        prices: &PriceSeries,
        margin_percent: f64,
    ) -> Result<(Ledger, f64), CoreError> {
        let held = ledger.held_quantity(metal);
        if quantity.is_nan() || quantity <= 0.0 || quantity > held + HOLDING_TOLERANCE {
            return Err(CoreError::InsufficientHoldings {
                metal: metal.to_string(),
                requested: quantity,
                held,
            });
        }

        if !prices.has_metal(metal) {
            return Err(CoreError::UnknownMetal(metal.to_string()));
        }
        let row = self
            .price_service
            .trading_row(prices, date)
            .ok_or(CoreError::MissingPriceData {
                metal: metal.to_string(),
                date,
            })?;
        let price = row
            .usable_price(metal)
            .ok_or_else(|| missing_price(prices, row, metal))?;

        let unit_price = price * (1.0 - margin_percent / 100.0);
        let proceeds = quantity * unit_price;

        let sale = LedgerEntry::new(
            date,
            OperationType::Sale,
            metal,
            -quantity,
            unit_price,
            -proceeds,
        );

        debug!("Sold {} {} on {} for {:.2}", quantity, metal, date, proceeds);

        Ok((ledger.appended([sale]), proceeds))
    }
}

impl Default for RebalanceService {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_price(prices: &PriceSeries, row: &PriceRow, metal: Metal) -> CoreError {
    if prices.has_metal(metal) {
        CoreError::MissingPriceData {
            metal: metal.to_string(),
            date: row.date,
        }
    } else {
        CoreError::UnknownMetal(metal.to_string())
    }
}
