pub mod errors;
pub mod models;
pub mod services;

use chrono::NaiveDate;
use log::info;
use models::{
    allocation::Allocation,
    analytics::{MetalWeight, PerformancePoint, StrategyComparison, Summary},
    ledger::Ledger,
    metal::Metal,
    presets,
    price::PriceSeries,
    schedule::ScheduleEntry,
    settings::SimulationSettings,
};
use serde::{Deserialize, Serialize};
use services::{
    analytics_service::AnalyticsService, portfolio_service::PortfolioService,
    rebalance_service::RebalanceService, storage_cost_service::StorageCostService,
};

use errors::CoreError;

/// Everything one simulation run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Ledger with storage costs applied
    pub ledger: Ledger,

    /// Per-metal summary of `ledger`
    pub summary: Summary,

    /// Schedule entries skipped for lack of any price row
    pub skipped_entries: usize,

    /// Single-metal purchases skipped for lack of a usable price
    pub skipped_allocations: usize,

    /// Sum of storage costs charged across the ledger
    pub total_storage_cost: f64,
}

/// Main entry point for the metals simulator core library.
///
/// Holds the run configuration and the (already currency-converted) price
/// series. Every method is a pure computation over its arguments: the
/// simulator keeps no mutable state between calls, so one instance can
/// serve many scenarios, including from several threads.
#[must_use]
pub struct MetalsSimulator {
    settings: SimulationSettings,
    prices: PriceSeries,
    portfolio_service: PortfolioService,
    storage_cost_service: StorageCostService,
    analytics_service: AnalyticsService,
    rebalance_service: RebalanceService,
}

impl std::fmt::Debug for MetalsSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetalsSimulator")
            .field("settings", &self.settings)
            .field("price_rows", &self.prices.len())
            .finish()
    }
}

impl MetalsSimulator {
    pub fn new(settings: SimulationSettings, prices: PriceSeries) -> Self {
        Self {
            settings,
            prices,
            portfolio_service: PortfolioService::new(),
            storage_cost_service: StorageCostService::new(),
            analytics_service: AnalyticsService::new(),
            rebalance_service: RebalanceService::new(),
        }
    }

    /// Simulator with default settings (EUR, 2% / 1.5% margins, 0.5% storage).
    pub fn with_defaults(prices: PriceSeries) -> Self {
        Self::new(SimulationSettings::default(), prices)
    }

    #[must_use]
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    #[must_use]
    pub fn prices(&self) -> &PriceSeries {
        &self.prices
    }

    // ── Simulation ──────────────────────────────────────────────────

    /// Run the full pipeline: build → accrue storage costs → aggregate.
    pub fn run(
        &self,
        schedule: &[ScheduleEntry],
        allocation: &Allocation,
    ) -> Result<SimulationReport, CoreError> {
        let outcome = self.portfolio_service.build_portfolio(
            schedule,
            &self.prices,
            allocation,
            self.settings.purchase_margin_percent,
        )?;

        let ledger = self
            .storage_cost_service
            .accrue(&outcome.ledger, &self.settings.storage);

        let report = SimulationReport {
            summary: self.analytics_service.aggregate(&ledger),
            total_storage_cost: self.storage_cost_service.total_storage_cost(&ledger),
            ledger,
            skipped_entries: outcome.skipped_entries,
            skipped_allocations: outcome.skipped_allocations,
        };

        info!(
            "Simulation run: {} ledger rows, invested {:.2} {}, value {:.2}, storage {:.2}",
            report.ledger.len(),
            report.summary.total_invested(),
            self.settings.currency,
            report.summary.total_value(),
            report.total_storage_cost
        );

        Ok(report)
    }

    /// Sell part of a holding at the configured sale margin.
    /// Returns the updated report and the sale proceeds.
    pub fn sell(
        &self,
        report: &SimulationReport,
        metal: Metal,
        quantity: f64,
        date: NaiveDate,
    ) -> Result<(SimulationReport, f64), CoreError> {
        let (ledger, proceeds) = self.rebalance_service.sell(
            &report.ledger,
            metal,
            quantity,
            date,
            &self.prices,
            self.settings.sale_margin_percent,
        )?;
        Ok((self.with_ledger(report, ledger), proceeds))
    }

    /// Rebalance towards `target` at the configured sale margin.
    pub fn rebalance(
        &self,
        report: &SimulationReport,
        target: &Allocation,
        date: NaiveDate,
    ) -> Result<SimulationReport, CoreError> {
        let ledger = self.rebalance_service.rebalance(
            &report.ledger,
            &self.prices,
            target,
            date,
            self.settings.sale_margin_percent,
        )?;
        Ok(self.with_ledger(report, ledger))
    }

    /// Same diagnostics, new ledger, summary recomputed.
    fn with_ledger(&self, report: &SimulationReport, ledger: Ledger) -> SimulationReport {
        SimulationReport {
            summary: self.analytics_service.aggregate(&ledger),
            total_storage_cost: self.storage_cost_service.total_storage_cost(&ledger),
            ledger,
            skipped_entries: report.skipped_entries,
            skipped_allocations: report.skipped_allocations,
        }
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Market value of the ledger as of `date` (latest prices when None).
    #[must_use]
    pub fn portfolio_value(&self, ledger: &Ledger, date: Option<NaiveDate>) -> f64 {
        self.analytics_service
            .portfolio_value(ledger, &self.prices, date)
    }

    #[must_use]
    pub fn metal_weights(&self, ledger: &Ledger) -> Vec<MetalWeight> {
        self.analytics_service.metal_weights(ledger, &self.prices)
    }

    #[must_use]
    pub fn average_purchase_price(&self, ledger: &Ledger, metal: Metal) -> f64 {
        self.analytics_service.average_purchase_price(ledger, metal)
    }

    #[must_use]
    pub fn performance(&self, ledger: &Ledger, valuation_dates: &[NaiveDate]) -> Vec<PerformancePoint> {
        self.analytics_service
            .performance(ledger, &self.prices, valuation_dates)
    }

    /// Compare named allocations over the same schedule, valued at `end_date`.
    pub fn compare_strategies(
        &self,
        schedule: &[ScheduleEntry],
        strategies: &[(String, Allocation)],
        end_date: NaiveDate,
    ) -> Result<Vec<StrategyComparison>, CoreError> {
        self.analytics_service.compare_strategies(
            schedule,
            &self.prices,
            strategies,
            self.settings.purchase_margin_percent,
            end_date,
        )
    }

    /// Compare all built-in strategy presets.
    pub fn compare_presets(
        &self,
        schedule: &[ScheduleEntry],
        end_date: NaiveDate,
    ) -> Result<Vec<StrategyComparison>, CoreError> {
        let strategies: Vec<(String, Allocation)> = presets::strategies()
            .into_iter()
            .map(|(name, allocation)| (name.to_string(), allocation))
            .collect();
        self.compare_strategies(schedule, &strategies, end_date)
    }
}
