use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::metal::Metal;
use crate::models::price::{FallbackOrder, PricePoint, PriceRow, PriceSeries};

/// Resolves usable prices from a `PriceSeries` under an explicit fallback policy.
///
/// Lookup policy (canonical, `FallbackOrder::NextThenPrevious`):
/// 1. A row on exactly the requested date.
/// 2. The earliest row strictly after it.
/// 3. The latest row strictly before it.
/// 4. Otherwise the price is missing.
///
/// A quote that is zero, negative or non-finite is treated as absent, so no
/// caller ever divides by an unusable price.
pub struct PriceService;

impl PriceService {
    pub fn new() -> Self {
        Self
    }

    /// Resolve one metal's price using the canonical fallback order.
    pub fn resolve_price(
        &self,
        series: &PriceSeries,
        metal: Metal,
        date: NaiveDate,
    ) -> Result<PricePoint, CoreError> {
        self.resolve_price_with(series, metal, date, FallbackOrder::default())
    }

    /// Resolve one metal's price with an explicitly chosen fallback order.
    ///
    /// Errors:
    /// - `UnknownMetal` if the metal is not a column anywhere in the series.
    /// - `MissingPriceData` if no candidate row carries a usable quote.
    pub fn resolve_price_with(
        &self,
        series: &PriceSeries,
        metal: Metal,
        date: NaiveDate,
        order: FallbackOrder,
    ) -> Result<PricePoint, CoreError> {
        if !series.has_metal(metal) {
            return Err(CoreError::UnknownMetal(metal.to_string()));
        }

        let quote = |row: &PriceRow| {
            row.usable_price(metal).map(|price| PricePoint {
                date: row.date,
                price,
            })
        };

        let exact = || series.row_on(date).and_then(&quote);
        let next = || series.rows_after(date).iter().find_map(&quote);
        let previous = || series.rows_before(date).iter().rev().find_map(&quote);

        let found = match order {
            FallbackOrder::NextThenPrevious => exact().or_else(next).or_else(previous),
            FallbackOrder::NextOnly => exact().or_else(next),
            FallbackOrder::PreviousOnly => exact().or_else(previous),
            FallbackOrder::ExactOnly => exact(),
        };

        found.ok_or(CoreError::MissingPriceData {
            metal: metal.to_string(),
            date,
        })
    }

    /// Resolve a whole price row (all metals at once) for `date`.
    ///
    /// Used by the builder, which buys every metal of an entry at the same
    /// row. Individual metals may still lack a usable quote on that row.
    pub fn resolve_row<'a>(
        &self,
        series: &'a PriceSeries,
        date: NaiveDate,
        order: FallbackOrder,
    ) -> Option<&'a PriceRow> {
        let exact = || series.row_on(date);
        let next = || series.rows_after(date).first();
        let previous = || series.rows_before(date).last();

        match order {
            FallbackOrder::NextThenPrevious => exact().or_else(next).or_else(previous),
            FallbackOrder::NextOnly => exact().or_else(next),
            FallbackOrder::PreviousOnly => exact().or_else(previous),
            FallbackOrder::ExactOnly => exact(),
        }
    }

    /// Row used to value or trade holdings on `date`: the first row on or
    /// after it, or the last row in the series when `date` is past the end.
    pub fn trading_row<'a>(&self, series: &'a PriceSeries, date: NaiveDate) -> Option<&'a PriceRow> {
        series.first_on_or_after(date).or_else(|| series.last())
    }

    /// Row used to value holdings as of `date`: the last row on or before it,
    /// or the first row in the series when `date` precedes all data.
    pub fn valuation_row<'a>(
        &self,
        series: &'a PriceSeries,
        date: Option<NaiveDate>,
    ) -> Option<&'a PriceRow> {
        match date {
            Some(date) => series.last_on_or_before(date).or_else(|| series.first()),
            None => series.last(),
        }
    }
}

impl Default for PriceService {
    fn default() -> Self {
        Self::new()
    }
}
