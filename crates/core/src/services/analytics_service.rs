use chrono::NaiveDate;
use log::debug;
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::models::allocation::Allocation;
use crate::models::analytics::{
    MetalSummary, MetalWeight, PerformancePoint, StrategyComparison, Summary,
};
use crate::models::ledger::{Ledger, OperationType};
use crate::models::metal::Metal;
use crate::models::price::PriceSeries;
use crate::models::schedule::{first_contribution_date, ScheduleEntry};
use crate::services::portfolio_service::PortfolioService;
use crate::services::price_service::PriceService;

const DAYS_PER_YEAR: f64 = 365.25;

/// Computes portfolio analytics from a ledger: per-metal summary, valuation,
/// weights, performance over time and strategy comparisons.
///
/// Nothing here mutates the ledger.
pub struct AnalyticsService {
    portfolio_service: PortfolioService,
    price_service: PriceService,
}

impl AnalyticsService {
    pub fn new() -> Self {
        Self {
            portfolio_service: PortfolioService::new(),
            price_service: PriceService::new(),
        }
    }

    /// Aggregate the ledger into one summary row per metal.
    ///
    /// - `total_invested` counts purchase rows only (sales are not netted in).
    /// - `last_unit_price` comes from the chronologically last row of the
    ///   metal; among rows sharing that date the later ledger position wins.
    /// - `roi_percent` is 0 whenever nothing was invested or the ratio is not
    ///   finite.
    pub fn aggregate(&self, ledger: &Ledger) -> Summary {
        struct Acc {
            quantity: f64,
            invested: f64,
            last: Option<(NaiveDate, f64)>,
        }

        let mut by_metal: BTreeMap<Metal, Acc> = BTreeMap::new();

        for entry in ledger.entries() {
            let acc = by_metal.entry(entry.metal).or_insert(Acc {
                quantity: 0.0,
                invested: 0.0,
                last: None,
            });
            acc.quantity += entry.quantity;
            if entry.operation_type.is_acquisition() {
                acc.invested += entry.operation_amount;
            }
            // `>=` so that ties on date go to the later row
            if acc.last.map_or(true, |(date, _)| entry.date >= date) {
                acc.last = Some((entry.date, entry.unit_price));
            }
        }

        let rows = by_metal
            .into_iter()
            .map(|(metal, acc)| {
                let last_unit_price = acc.last.map(|(_, p)| p).unwrap_or(0.0);
                let current_value = acc.quantity * last_unit_price;
                let profit_loss = current_value - acc.invested;
                MetalSummary {
                    metal,
                    total_quantity: acc.quantity,
                    total_invested: acc.invested,
                    last_unit_price,
                    current_value,
                    profit_loss,
                    roi_percent: roi_percent(profit_loss, acc.invested),
                }
            })
            .collect();

        Summary { rows }
    }

    /// Market value of the ledger's holdings.
    ///
    /// Prices come from the last row on or before `date` (the first row if
    /// `date` precedes all data), or from the latest row when `date` is None.
    /// Metals without a usable price on that row contribute nothing.
    pub fn portfolio_value(
        &self,
        ledger: &Ledger,
        prices: &PriceSeries,
        date: Option<NaiveDate>,
    ) -> f64 {
        if ledger.is_empty() {
            return 0.0;
        }
        let Some(row) = self.price_service.valuation_row(prices, date) else {
            return 0.0;
        };

        ledger
            .holdings()
            .into_iter()
            .filter_map(|(metal, quantity)| row.usable_price(metal).map(|p| quantity * p))
            .sum()
    }

    /// Each metal's share of the portfolio's value at the latest prices.
    pub fn metal_weights(&self, ledger: &Ledger, prices: &PriceSeries) -> Vec<MetalWeight> {
        let Some(row) = prices.last() else {
            return Vec::new();
        };

        let mut weights: Vec<MetalWeight> = ledger
            .holdings()
            .into_iter()
            .filter_map(|(metal, quantity)| {
                row.usable_price(metal).map(|price| MetalWeight {
                    metal,
                    quantity,
                    price,
                    value: quantity * price,
                    weight_percent: 0.0,
                })
            })
            .collect();

        let total_value: f64 = weights.iter().map(|w| w.value).sum();
        if total_value > 0.0 {
            for w in &mut weights {
                w.weight_percent = w.value / total_value * 100.0;
            }
        }
        weights
    }

    /// Quantity-weighted average unit price paid for `metal` across
    /// scheduled purchases. 0 when there are none.
    pub fn average_purchase_price(&self, ledger: &Ledger, metal: Metal) -> f64 {
        let (quantity, cost) = ledger
            .entries()
            .iter()
            .filter(|e| e.metal == metal && e.operation_type == OperationType::Purchase)
            .fold((0.0, 0.0), |(q, c), e| (q + e.quantity, c + e.quantity * e.unit_price));

        if quantity > 0.0 {
            cost / quantity
        } else {
            0.0
        }
    }

    /// Portfolio value, invested amount and ROI at each valuation date.
    ///
    /// Each point only considers ledger rows dated on or before it. Dates
    /// before the first operation produce no point. The invested amount
    /// counts scheduled purchases only.
    pub fn performance(
        &self,
        ledger: &Ledger,
        prices: &PriceSeries,
        valuation_dates: &[NaiveDate],
    ) -> Vec<PerformancePoint> {
        if ledger.is_empty() || prices.is_empty() {
            return Vec::new();
        }

        valuation_dates
            .iter()
            .filter_map(|&date| {
                let so_far = ledger.until(date);
                if so_far.is_empty() {
                    return None;
                }
                let portfolio_value = self.portfolio_value(&so_far, prices, Some(date));
                let invested_amount: f64 = so_far
                    .entries()
                    .iter()
                    .filter(|e| e.operation_type == OperationType::Purchase)
                    .map(|e| e.operation_amount)
                    .sum();
                let profit_loss = portfolio_value - invested_amount;
                Some(PerformancePoint {
                    date,
                    portfolio_value,
                    invested_amount,
                    profit_loss,
                    roi_percent: roi_percent(profit_loss, invested_amount),
                })
            })
            .collect()
    }

    /// Build and value several named allocations over the same schedule.
    ///
    /// Strategies are independent, so they run in parallel. Output order
    /// matches input order. Any invalid allocation fails the whole call.
    pub fn compare_strategies(
        &self,
        schedule: &[ScheduleEntry],
        prices: &PriceSeries,
        strategies: &[(String, Allocation)],
        purchase_margin_percent: f64,
        end_date: NaiveDate,
    ) -> Result<Vec<StrategyComparison>, CoreError> {
        let start_date = first_contribution_date(schedule).unwrap_or(end_date);

        let results = strategies
            .par_iter()
            .map(|(name, allocation)| {
                let outcome = self.portfolio_service.build_portfolio(
                    schedule,
                    prices,
                    allocation,
                    purchase_margin_percent,
                )?;
                let invested = self.aggregate(&outcome.ledger).total_invested();
                let final_value = self.portfolio_value(&outcome.ledger, prices, Some(end_date));
                let profit_loss = final_value - invested;
                Ok(StrategyComparison {
                    name: name.clone(),
                    invested,
                    final_value,
                    profit_loss,
                    roi_percent: roi_percent(profit_loss, invested),
                    annualized_return_percent: annualized_return(
                        final_value,
                        invested,
                        start_date,
                        end_date,
                    ),
                    years: years_between(start_date, end_date),
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        debug!("Compared {} strategies up to {}", results.len(), end_date);
        Ok(results)
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

/// `profit_loss / invested × 100`, defined as 0 when `invested <= 0` or the
/// result is not finite.
pub fn roi_percent(profit_loss: f64, invested: f64) -> f64 {
    if invested <= 0.0 {
        return 0.0;
    }
    let roi = profit_loss / invested * 100.0;
    if roi.is_finite() {
        roi
    } else {
        0.0
    }
}

fn years_between(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64 / DAYS_PER_YEAR
}

/// Compound annual growth rate in percent.
///
/// 0 when the period is not positive or nothing was invested.
pub fn annualized_return(
    final_value: f64,
    invested: f64,
    start: NaiveDate,
    end: NaiveDate,
) -> f64 {
    let years = years_between(start, end);
    if years <= 0.0 || invested <= 0.0 {
        return 0.0;
    }
    let cagr = ((final_value / invested).powf(1.0 / years) - 1.0) * 100.0;
    if cagr.is_finite() {
        cagr
    } else {
        0.0
    }
}
