use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use metals_simulator_core::errors::CoreError;
use metals_simulator_core::models::allocation::Allocation;
use metals_simulator_core::models::analytics::{MetalSummary, Summary};
use metals_simulator_core::models::ledger::{Ledger, LedgerEntry, OperationType};
use metals_simulator_core::models::metal::{Metal, WeightUnit, GRAMS_PER_TROY_OUNCE};
use metals_simulator_core::models::presets;
use metals_simulator_core::models::price::{PriceRow, PriceSeries};
use metals_simulator_core::models::schedule::{
    first_contribution_date, total_contributions, ScheduleEntry,
};
use metals_simulator_core::models::settings::{
    CoverageMethod, SimulationSettings, StorageFrequency, StorageSettings,
};
use std::collections::HashMap;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
//  Metal
// ═══════════════════════════════════════════════════════════════════

mod metal {
    use super::*;

    #[test]
    fn display_is_capitalized() {
        assert_eq!(Metal::Gold.to_string(), "Gold");
        assert_eq!(Metal::Palladium.to_string(), "Palladium");
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Metal::parse("gold").unwrap(), Metal::Gold);
        assert_eq!(Metal::parse("Silver").unwrap(), Metal::Silver);
        assert_eq!(Metal::parse(" PLATINUM ").unwrap(), Metal::Platinum);
        assert_eq!("palladium".parse::<Metal>().unwrap(), Metal::Palladium);
    }

    #[test]
    fn parse_unknown_metal_fails() {
        let err = Metal::parse("copper").unwrap_err();
        assert!(matches!(err, CoreError::UnknownMetal(ref m) if m == "copper"));
    }

    #[test]
    fn all_is_in_display_order() {
        assert_eq!(
            Metal::ALL,
            [Metal::Gold, Metal::Silver, Metal::Platinum, Metal::Palladium]
        );
        let mut sorted = Metal::ALL;
        sorted.sort();
        assert_eq!(sorted, Metal::ALL);
    }

    #[test]
    fn serde_uses_lowercase_keys() {
        assert_eq!(serde_json::to_string(&Metal::Gold).unwrap(), "\"gold\"");
        let back: Metal = serde_json::from_str("\"silver\"").unwrap();
        assert_eq!(back, Metal::Silver);
    }

    #[test]
    fn key_matches_serde_name() {
        for metal in Metal::ALL {
            let json = serde_json::to_string(&metal).unwrap();
            assert_eq!(json, format!("\"{}\"", metal.key()));
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
//  WeightUnit
// ═══════════════════════════════════════════════════════════════════

mod weight_unit {
    use super::*;

    #[test]
    fn one_ounce_in_grams() {
        assert_abs_diff_eq!(
            WeightUnit::convert(1.0, WeightUnit::TroyOunce, WeightUnit::Gram),
            GRAMS_PER_TROY_OUNCE
        );
    }

    #[test]
    fn grams_to_ounces() {
        assert_abs_diff_eq!(
            WeightUnit::convert(311.035, WeightUnit::Gram, WeightUnit::TroyOunce),
            10.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn same_unit_is_identity() {
        assert_eq!(WeightUnit::convert(7.5, WeightUnit::Gram, WeightUnit::Gram), 7.5);
    }

    #[test]
    fn display() {
        assert_eq!(WeightUnit::Gram.to_string(), "g");
        assert_eq!(WeightUnit::TroyOunce.to_string(), "oz");
    }
}

// ═══════════════════════════════════════════════════════════════════
//  PriceSeries
// ═══════════════════════════════════════════════════════════════════

mod price_series {
    use super::*;

    fn row(date: NaiveDate, gold: f64) -> PriceRow {
        PriceRow::new(date).with(Metal::Gold, gold)
    }

    #[test]
    fn new_sorts_rows_by_date() {
        let series = PriceSeries::new(vec![
            row(d(2020, 1, 3), 3.0),
            row(d(2020, 1, 1), 1.0),
            row(d(2020, 1, 2), 2.0),
        ]);
        let dates: Vec<_> = series.rows().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(2020, 1, 1), d(2020, 1, 2), d(2020, 1, 3)]);
    }

    #[test]
    fn duplicate_dates_keep_last_supplied_row() {
        let series = PriceSeries::new(vec![
            row(d(2020, 1, 1), 1.0),
            row(d(2020, 1, 2), 2.0),
            row(d(2020, 1, 1), 9.0),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.row_on(d(2020, 1, 1)).unwrap().prices[&Metal::Gold], 9.0);
    }

    #[test]
    fn empty_series() {
        let series = PriceSeries::default();
        assert!(series.is_empty());
        assert!(series.first().is_none());
        assert!(series.row_on(d(2020, 1, 1)).is_none());
        assert!(series.first_on_or_after(d(2020, 1, 1)).is_none());
        assert!(series.last_on_or_before(d(2020, 1, 1)).is_none());
    }

    #[test]
    fn neighbours_around_a_gap() {
        let series = PriceSeries::new(vec![
            row(d(2020, 1, 1), 1.0),
            row(d(2020, 1, 5), 5.0),
            row(d(2020, 1, 9), 9.0),
        ]);
        assert!(series.row_on(d(2020, 1, 3)).is_none());
        assert_eq!(series.rows_after(d(2020, 1, 3))[0].date, d(2020, 1, 5));
        assert_eq!(series.rows_before(d(2020, 1, 3)).last().unwrap().date, d(2020, 1, 1));
        assert_eq!(series.first_on_or_after(d(2020, 1, 5)).unwrap().date, d(2020, 1, 5));
        assert_eq!(series.last_on_or_before(d(2020, 1, 8)).unwrap().date, d(2020, 1, 5));
        assert!(series.rows_after(d(2020, 1, 9)).is_empty());
        assert!(series.rows_before(d(2020, 1, 1)).is_empty());
    }

    #[test]
    fn range_is_inclusive() {
        let series = PriceSeries::new((1..=10).map(|day| row(d(2020, 1, day), day as f64)).collect());
        let range = series.range(d(2020, 1, 3), d(2020, 1, 6));
        assert_eq!(range.len(), 4);
        assert_eq!(range[0].date, d(2020, 1, 3));
        assert_eq!(range[3].date, d(2020, 1, 6));
        assert!(series.range(d(2020, 1, 6), d(2020, 1, 3)).is_empty());
    }

    #[test]
    fn has_metal_checks_every_row() {
        let series = PriceSeries::new(vec![
            row(d(2020, 1, 1), 1.0),
            PriceRow::new(d(2020, 1, 2)).with(Metal::Silver, 0.5),
        ]);
        assert!(series.has_metal(Metal::Gold));
        assert!(series.has_metal(Metal::Silver));
        assert!(!series.has_metal(Metal::Palladium));
    }

    #[test]
    fn usable_price_rejects_zero_negative_and_nan() {
        let r = PriceRow::new(d(2020, 1, 1))
            .with(Metal::Gold, 0.0)
            .with(Metal::Silver, -1.0)
            .with(Metal::Platinum, f64::NAN)
            .with(Metal::Palladium, 12.0);
        assert_eq!(r.usable_price(Metal::Gold), None);
        assert_eq!(r.usable_price(Metal::Silver), None);
        assert_eq!(r.usable_price(Metal::Platinum), None);
        assert_eq!(r.usable_price(Metal::Palladium), Some(12.0));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Schedule
// ═══════════════════════════════════════════════════════════════════

mod schedule {
    use super::*;

    #[test]
    fn totals_and_first_date() {
        let schedule = vec![
            ScheduleEntry::new(d(2020, 3, 1), 100.0),
            ScheduleEntry::new(d(2020, 1, 1), 1000.0),
            ScheduleEntry::new(d(2020, 2, 1), 100.0),
        ];
        assert_eq!(total_contributions(&schedule), 1200.0);
        assert_eq!(first_contribution_date(&schedule), Some(d(2020, 1, 1)));
    }

    #[test]
    fn empty_schedule() {
        assert_eq!(total_contributions(&[]), 0.0);
        assert_eq!(first_contribution_date(&[]), None);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Allocation
// ═══════════════════════════════════════════════════════════════════

mod allocation {
    use super::*;

    #[test]
    fn exact_hundred_is_valid() {
        assert!(presets::default_allocation().validate_exact().is_ok());
    }

    #[test]
    fn ninety_nine_and_hundred_one_are_rejected() {
        for gold in [59.0, 61.0] {
            let a = Allocation::new().with(Metal::Gold, gold).with(Metal::Silver, 40.0);
            let err = a.validate_exact().unwrap_err();
            assert!(matches!(err, CoreError::InvalidAllocation { .. }));
        }
    }

    #[test]
    fn rebalance_tolerance() {
        let a = Allocation::new()
            .with(Metal::Gold, 50.005)
            .with(Metal::Silver, 50.0);
        assert!(a.validate_within(0.01).is_ok());
        assert!(a.validate_exact().is_err());

        let b = Allocation::new().with(Metal::Gold, 50.02).with(Metal::Silver, 50.0);
        assert!(b.validate_within(0.01).is_err());
    }

    #[test]
    fn thirds_sum_to_exactly_hundred() {
        // a naive left-to-right sum of these is 99.99999999999999
        let a = Allocation::new()
            .with(Metal::Gold, 33.4)
            .with(Metal::Silver, 33.3)
            .with(Metal::Platinum, 33.3);
        assert_eq!(a.sum(), 100.0);
        assert!(a.validate_exact().is_ok());

        let b = Allocation::new()
            .with(Metal::Gold, 33.3)
            .with(Metal::Silver, 33.3)
            .with(Metal::Platinum, 33.4);
        assert_eq!(b.sum(), 100.0);
    }

    #[test]
    fn near_miss_is_still_rejected() {
        let a = Allocation::new()
            .with(Metal::Gold, 33.3)
            .with(Metal::Silver, 33.3)
            .with(Metal::Platinum, 33.3);
        assert!(matches!(
            a.validate_exact().unwrap_err(),
            CoreError::InvalidAllocation { .. }
        ));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let a = Allocation::new()
            .with(Metal::Gold, 110.0)
            .with(Metal::Silver, -10.0);
        let err = a.validate_exact().unwrap_err();
        assert!(matches!(err, CoreError::InvalidWeight { ref metal, .. } if metal == "Silver"));
    }

    #[test]
    fn from_named_accepts_ui_keys() {
        let named: HashMap<String, f64> = [
            ("gold".to_string(), 40.0),
            ("Silver".to_string(), 60.0),
        ]
        .into_iter()
        .collect();
        let a = Allocation::from_named(&named).unwrap();
        assert_eq!(a.weight(Metal::Gold), 40.0);
        assert_eq!(a.weight(Metal::Silver), 60.0);
        assert_eq!(a.weight(Metal::Platinum), 0.0);
    }

    #[test]
    fn from_named_rejects_unknown_keys() {
        let named: HashMap<String, f64> = [("rhodium".to_string(), 100.0)].into_iter().collect();
        let err = Allocation::from_named(&named).unwrap_err();
        assert!(matches!(err, CoreError::UnknownMetal(_)));
    }

    #[test]
    fn active_skips_zero_weights() {
        let a = presets::strategy("gold only").unwrap();
        let active: Vec<_> = a.active().collect();
        assert_eq!(active, vec![(Metal::Gold, 100.0)]);
        assert_eq!(a.iter().count(), 4);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Presets
// ═══════════════════════════════════════════════════════════════════

mod preset_tables {
    use super::*;

    #[test]
    fn every_strategy_sums_to_hundred() {
        for (name, allocation) in presets::strategies() {
            assert!(allocation.validate_exact().is_ok(), "{name} does not sum to 100");
        }
    }

    #[test]
    fn strategy_lookup_is_case_insensitive() {
        let a = presets::strategy("CONSERVATIVE").unwrap();
        assert_eq!(a.weight(Metal::Gold), 70.0);
        assert!(presets::strategy("yolo").is_none());
    }

    #[test]
    fn default_margins_table() {
        let gold = presets::default_margins(Metal::Gold);
        assert_eq!((gold.buy, gold.sell), (2.0, 1.5));
        let palladium = presets::default_margins(Metal::Palladium);
        assert_eq!((palladium.buy, palladium.sell), (5.0, 4.0));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Ledger
// ═══════════════════════════════════════════════════════════════════

mod ledger {
    use super::*;

    fn purchase(date: NaiveDate, metal: Metal, quantity: f64, price: f64) -> LedgerEntry {
        LedgerEntry::new(date, OperationType::Purchase, metal, quantity, price, quantity * price)
    }

    #[test]
    fn new_entry_has_no_storage_cost() {
        let e = purchase(d(2020, 1, 1), Metal::Gold, 2.0, 50.0);
        assert_eq!(e.storage_cost, 0.0);
        assert_eq!(e.amount_after_cost, 100.0);
    }

    #[test]
    fn entries_get_unique_ids() {
        let a = purchase(d(2020, 1, 1), Metal::Gold, 1.0, 1.0);
        let b = purchase(d(2020, 1, 1), Metal::Gold, 1.0, 1.0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn holdings_net_sales() {
        let ledger = Ledger::from_entries(vec![
            purchase(d(2020, 1, 1), Metal::Gold, 3.0, 10.0),
            purchase(d(2020, 1, 1), Metal::Silver, 5.0, 1.0),
            LedgerEntry::new(d(2020, 2, 1), OperationType::Sale, Metal::Gold, -1.0, 12.0, -12.0),
        ]);
        assert_eq!(ledger.held_quantity(Metal::Gold), 2.0);
        assert_eq!(ledger.held_quantity(Metal::Platinum), 0.0);
        let holdings = ledger.holdings();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[&Metal::Silver], 5.0);
    }

    #[test]
    fn appended_leaves_original_untouched() {
        let original = Ledger::from_entries(vec![purchase(d(2020, 1, 1), Metal::Gold, 1.0, 1.0)]);
        let extended = original.appended([purchase(d(2020, 2, 1), Metal::Gold, 1.0, 1.0)]);
        assert_eq!(original.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.entries()[0], original.entries()[0]);
    }

    #[test]
    fn until_filters_by_date() {
        let ledger = Ledger::from_entries(vec![
            purchase(d(2020, 1, 1), Metal::Gold, 1.0, 1.0),
            purchase(d(2020, 3, 1), Metal::Gold, 1.0, 1.0),
        ]);
        assert_eq!(ledger.until(d(2020, 2, 1)).len(), 1);
        assert_eq!(ledger.until(d(2020, 3, 1)).len(), 2);
        assert!(ledger.until(d(2019, 12, 31)).is_empty());
    }

    #[test]
    fn to_rows_exposes_flat_columns() {
        let ledger = Ledger::from_entries(vec![purchase(d(2020, 1, 1), Metal::Gold, 2.0, 50.0)]);
        let rows = ledger.to_rows().unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["date"], "2020-01-01");
        assert_eq!(row["operation_type"], "Purchase");
        assert_eq!(row["metal"], "gold");
        assert_eq!(row["quantity"], 2.0);
        assert_eq!(row["operation_amount"], 100.0);
        assert_eq!(row["amount_after_cost"], 100.0);
    }

    #[test]
    fn acquisition_kinds() {
        assert!(OperationType::Purchase.is_acquisition());
        assert!(OperationType::RebalancePurchase.is_acquisition());
        assert!(!OperationType::Sale.is_acquisition());
        assert!(!OperationType::RebalanceSale.is_acquisition());
    }

    #[test]
    fn serde_roundtrip_json() {
        let ledger = Ledger::from_entries(vec![purchase(d(2020, 1, 1), Metal::Gold, 2.0, 50.0)]);
        let json = serde_json::to_string(&ledger).unwrap();
        let back: Ledger = serde_json::from_str(&json).unwrap();
        assert_eq!(ledger, back);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Summary
// ═══════════════════════════════════════════════════════════════════

mod summary {
    use super::*;

    fn row(metal: Metal, invested: f64, value: f64) -> MetalSummary {
        MetalSummary {
            metal,
            total_quantity: 1.0,
            total_invested: invested,
            last_unit_price: value,
            current_value: value,
            profit_loss: value - invested,
            roi_percent: 0.0,
        }
    }

    #[test]
    fn totals() {
        let summary = Summary {
            rows: vec![row(Metal::Gold, 100.0, 120.0), row(Metal::Silver, 50.0, 40.0)],
        };
        assert_eq!(summary.total_invested(), 150.0);
        assert_eq!(summary.total_value(), 160.0);
        assert_eq!(summary.total_profit_loss(), 10.0);
        assert!(summary.get(Metal::Silver).is_some());
        assert!(summary.get(Metal::Platinum).is_none());
    }

    #[test]
    fn to_rows_has_one_map_per_metal() {
        let summary = Summary {
            rows: vec![row(Metal::Gold, 100.0, 120.0)],
        };
        let rows = summary.to_rows().unwrap();
        assert_eq!(rows[0]["metal"], "gold");
        assert_eq!(rows[0]["profit_loss"], 20.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Settings
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;

    #[test]
    fn defaults() {
        let s = SimulationSettings::default();
        assert_eq!(s.currency, "EUR");
        assert_eq!(s.purchase_margin_percent, 2.0);
        assert_eq!(s.sale_margin_percent, 1.5);
        assert_eq!(s.storage.fee_rate_percent, 0.5);
        assert_eq!(s.storage.frequency, StorageFrequency::Monthly);
        assert_eq!(s.storage.vat_rate_percent, 19.0);
        assert_eq!(s.storage.coverage, CoverageMethod::Cash);
    }

    #[test]
    fn period_rates() {
        assert_abs_diff_eq!(StorageFrequency::Monthly.period_rate(6.0), 0.005);
        assert_abs_diff_eq!(StorageFrequency::Yearly.period_rate(6.0), 0.06);
    }

    #[test]
    fn coverage_parse_and_display() {
        for name in ["cash", "gold", "silver", "platinum", "palladium", "all_metals"] {
            let method = CoverageMethod::parse(name).unwrap();
            assert_eq!(method.to_string(), name);
        }
        assert_eq!(
            CoverageMethod::parse("Gold").unwrap(),
            CoverageMethod::Metal(Metal::Gold)
        );
        assert!(CoverageMethod::parse("bitcoin").is_err());
    }

    #[test]
    fn coverage_serializes_as_flat_name() {
        let json = serde_json::to_string(&CoverageMethod::Metal(Metal::Silver)).unwrap();
        assert_eq!(json, "\"silver\"");
        let back: CoverageMethod = serde_json::from_str("\"all_metals\"").unwrap();
        assert_eq!(back, CoverageMethod::AllMetals);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s = SimulationSettings::from_json(
            r#"{"currency": "PLN", "storage": {"frequency": "yearly", "coverage": "gold"}}"#,
        )
        .unwrap();
        assert_eq!(s.currency, "PLN");
        assert_eq!(s.purchase_margin_percent, 2.0);
        assert_eq!(
            s.storage,
            StorageSettings {
                frequency: StorageFrequency::Yearly,
                coverage: CoverageMethod::Metal(Metal::Gold),
                ..StorageSettings::default()
            }
        );
    }

    #[test]
    fn json_roundtrip() {
        let mut s = SimulationSettings::default();
        s.storage.coverage = CoverageMethod::AllMetals;
        let json = s.to_json().unwrap();
        assert_eq!(SimulationSettings::from_json(&json).unwrap(), s);
    }
}
