//! Shapes a [`PeriodSummary`] into a stacked bar-chart series.

use std::cmp::Ordering;

use crate::aggregate::{Granularity, PeriodSummary};
use crate::transaction::Category;

/// One bar: a period and its per-category values, aligned with
/// [`SpendingSeries::categories`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub period: String,
    pub values: Vec<f64>,
}

impl SeriesPoint {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpendingSeries {
    pub granularity: Granularity,
    /// Stack order, Income excluded
    pub categories: Vec<Category>,
    /// Oldest first
    pub points: Vec<SeriesPoint>,
}

impl SpendingSeries {
    /// Sorted, zero-filled and cut to the granularity's period limit.
    pub fn from_summary(summary: &PeriodSummary) -> Self {
        Self::with_limit(summary, summary.granularity.max_periods())
    }

    pub fn with_limit(summary: &PeriodSummary, limit: usize) -> Self {
        let granularity = summary.granularity;

        let categories: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| !c.is_income())
            .filter(|c| summary.buckets().iter().any(|b| b.spend.contains_key(c)))
            .collect();

        let mut points: Vec<SeriesPoint> = summary
            .buckets()
            .iter()
            .map(|b| SeriesPoint {
                period: b.key.clone(),
                values: categories
                    .iter()
                    .map(|c| b.spend.get(c).copied().unwrap_or(0.0))
                    .collect(),
            })
            .collect();

        points.sort_by(|a, b| compare_periods(granularity, &a.period, &b.period));
        let skip = points.len().saturating_sub(limit);
        points.drain(..skip);

        Self {
            granularity,
            categories,
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Tallest stacked bar
    pub fn max_total(&self) -> f64 {
        self.points.iter().map(SeriesPoint::total).fold(0.0, f64::max)
    }

    /// Values of one category across all points
    pub fn column(&self, category: Category) -> Option<Vec<f64>> {
        let idx = self.categories.iter().position(|c| *c == category)?;
        Some(self.points.iter().map(|p| p.values[idx]).collect())
    }
}

/// Chronological order of two period keys.
///
/// Daily and monthly keys are zero-padded, so string order is enough. Weekly
/// keys are not (`2024-9-W5` vs `2024-10-W1`) and are compared by their parsed
/// components; unparseable keys fall back to string order.
pub fn compare_periods(granularity: Granularity, a: &str, b: &str) -> Ordering {
    match granularity {
        Granularity::Weekly => match (parse_week_key(a), parse_week_key(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.cmp(b),
        },
        Granularity::Daily | Granularity::Monthly => a.cmp(b),
    }
}

/// `{year}-{month}-W{n}` -> (year, month, n)
pub fn parse_week_key(key: &str) -> Option<(i32, u32, u32)> {
    let mut parts = key.splitn(3, '-');
    let year = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let week = parts.next()?.strip_prefix('W')?.parse().ok()?;
    Some((year, month, week))
}
