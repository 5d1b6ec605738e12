//! spendboard-core: transaction model, date ranges and client-side aggregation
//! for the spending dashboard. No I/O.

pub mod aggregate;
pub mod chart;
pub mod date_range;
pub mod error;
pub mod feedback;
pub mod format;
pub mod kpi;
pub mod transaction;

pub use aggregate::{
    aggregate_by_category, aggregate_by_period, CategoryShare, CategorySummary, CategoryTotals,
    Granularity, PeriodBucket, PeriodSummary,
};
pub use chart::{SeriesPoint, SpendingSeries};
pub use date_range::{today_in, DateRange, DateRangeSelector, RangePreset};
pub use error::{Error, Result};
pub use feedback::{classify_upload_error, Feedback, Severity};
pub use kpi::{Balance, Kpis};
pub use transaction::{Category, ExtractedWith, Transaction, TransactionSource};

/// Everything the dashboard derives from one loaded transaction list
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub kpis: Kpis,
    pub periods: PeriodSummary,
    pub categories: CategorySummary,
}

impl Snapshot {
    pub fn compute(txns: &[Transaction], granularity: Granularity) -> Self {
        Self {
            kpis: Kpis::from_transactions(txns),
            periods: aggregate_by_period(txns, granularity),
            categories: aggregate_by_category(txns),
        }
    }

    pub fn series(&self) -> SpendingSeries {
        SpendingSeries::from_summary(&self.periods)
    }
}
