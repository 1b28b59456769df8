use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metal::Metal;

/// A single resolved price (date → unit price) for one metal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// One row of the price table: the unit price of each metal on a date.
///
/// A metal missing from `prices` simply has no quote that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub prices: BTreeMap<Metal, f64>,
}

impl PriceRow {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            prices: BTreeMap::new(),
        }
    }

    /// Builder-style setter, handy for assembling rows by hand.
    pub fn with(mut self, metal: Metal, price: f64) -> Self {
        self.prices.insert(metal, price);
        self
    }

    /// The metal's price on this row, if it is usable (finite and > 0).
    pub fn usable_price(&self, metal: Metal) -> Option<f64> {
        self.prices
            .get(&metal)
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
    }
}

/// Order in which `resolve_price` tries candidate dates when there is no
/// exact match. Every variant tries the exact date first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackOrder {
    /// exact → earliest date after → latest date before
    #[default]
    NextThenPrevious,
    /// exact → earliest date after
    NextOnly,
    /// exact → latest date before
    PreviousOnly,
    /// exact date only
    ExactOnly,
}

/// Historical price table, sorted ascending by date with unique dates.
///
/// Built once per simulation run and only read afterwards. All lookups are
/// binary searches over the sorted rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    rows: Vec<PriceRow>,
}

impl PriceSeries {
    /// Build a series from rows in any order. Rows are sorted by date; when a
    /// date appears more than once the last supplied row wins.
    pub fn new(rows: Vec<PriceRow>) -> Self {
        let mut rows = rows;
        // Stable sort keeps input order among equal dates, so the last one is
        // the one to keep.
        rows.sort_by_key(|r| r.date);
        let mut deduped: Vec<PriceRow> = Vec::with_capacity(rows.len());
        for row in rows {
            match deduped.last_mut() {
                Some(last) if last.date == row.date => *last = row,
                _ => deduped.push(row),
            }
        }
        Self { rows: deduped }
    }

    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&PriceRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&PriceRow> {
        self.rows.last()
    }

    /// Whether the metal appears as a column anywhere in the series.
    pub fn has_metal(&self, metal: Metal) -> bool {
        self.rows.iter().any(|r| r.prices.contains_key(&metal))
    }

    /// Row for exactly `date`.
    pub fn row_on(&self, date: NaiveDate) -> Option<&PriceRow> {
        self.rows
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|idx| &self.rows[idx])
    }

    /// Index of the first row with a date strictly after `date`.
    fn after_index(&self, date: NaiveDate) -> usize {
        self.rows.partition_point(|r| r.date <= date)
    }

    /// Index one past the last row with a date strictly before `date`.
    fn before_end(&self, date: NaiveDate) -> usize {
        self.rows.partition_point(|r| r.date < date)
    }

    /// Rows strictly after `date`, earliest first.
    pub fn rows_after(&self, date: NaiveDate) -> &[PriceRow] {
        &self.rows[self.after_index(date)..]
    }

    /// Rows strictly before `date`, earliest first.
    pub fn rows_before(&self, date: NaiveDate) -> &[PriceRow] {
        &self.rows[..self.before_end(date)]
    }

    /// First row dated on or after `date`.
    pub fn first_on_or_after(&self, date: NaiveDate) -> Option<&PriceRow> {
        self.rows.get(self.before_end(date))
    }

    /// Last row dated on or before `date`.
    pub fn last_on_or_before(&self, date: NaiveDate) -> Option<&PriceRow> {
        self.after_index(date)
            .checked_sub(1)
            .map(|idx| &self.rows[idx])
    }

    /// All rows in the inclusive range `[from, to]`.
    pub fn range(&self, from: NaiveDate, to: NaiveDate) -> &[PriceRow] {
        if from > to {
            return &[];
        }
        &self.rows[self.before_end(from)..self.after_index(to)]
    }
}
