use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A planned contribution: spend `amount` (in the simulation currency) on `date`.
///
/// Schedules are produced by an external generator (lump sum plus a
/// weekly/monthly/quarterly cadence). They are expected in chronological
/// order, but the builder resolves each entry's price independently, so
/// out-of-order entries are still priced correctly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    pub amount: f64,
}

impl ScheduleEntry {
    pub fn new(date: NaiveDate, amount: f64) -> Self {
        Self { date, amount }
    }
}

/// Sum of all planned contributions.
pub fn total_contributions(schedule: &[ScheduleEntry]) -> f64 {
    schedule.iter().map(|e| e.amount).sum()
}

/// Earliest contribution date, if any.
pub fn first_contribution_date(schedule: &[ScheduleEntry]) -> Option<NaiveDate> {
    schedule.iter().map(|e| e.date).min()
}
