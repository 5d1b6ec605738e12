//! Client-side aggregation of the loaded transaction list.
//!
//! Both aggregators are pure: same input, same output, no shared state.
//! Buckets keep the order in which their key was first seen.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::transaction::{Category, Transaction};

/// Bucket size for the spending time series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Daily, Granularity::Weekly, Granularity::Monthly];

    pub fn name(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }

    /// How many of the most recent periods a chart shows
    pub fn max_periods(&self) -> usize {
        match self {
            Granularity::Daily => 90,
            Granularity::Weekly => 20,
            Granularity::Monthly => 12,
        }
    }

    /// Period key for a date.
    ///
    /// Weekly keys are month-relative (`{year}-{month}-W{n}`, month not
    /// zero-padded), not ISO weeks.
    pub fn period_key(&self, date: NaiveDate) -> String {
        match self {
            Granularity::Daily => date.format("%Y-%m-%d").to_string(),
            Granularity::Weekly => format!(
                "{}-{}-W{}",
                date.year(),
                date.month(),
                week_of_month(date)
            ),
            Granularity::Monthly => date.format("%Y-%m").to_string(),
        }
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" | "d" => Ok(Granularity::Daily),
            "weekly" | "week" | "w" => Ok(Granularity::Weekly),
            "monthly" | "month" | "m" => Ok(Granularity::Monthly),
            _ => Err(Error::UnknownGranularity(s.to_string())),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ceil((day + weekday of the 1st, Sunday = 0) / 7)
pub fn week_of_month(date: NaiveDate) -> u32 {
    let offset = date
        .with_day(1)
        .map(|first| first.weekday().num_days_from_sunday())
        .unwrap_or(Weekday::Sun.num_days_from_sunday());
    (date.day() + offset).div_ceil(7)
}

/// Spend per category inside one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBucket {
    pub key: String,
    pub spend: BTreeMap<Category, f64>,
}

impl PeriodBucket {
    pub fn total(&self) -> f64 {
        self.spend.values().sum()
    }
}

/// Period key -> category -> summed absolute spend. Income never appears.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub granularity: Granularity,
    buckets: Vec<PeriodBucket>,
}

impl PeriodSummary {
    pub fn buckets(&self) -> &[PeriodBucket] {
        &self.buckets
    }

    pub fn get(&self, key: &str) -> Option<&PeriodBucket> {
        self.buckets.iter().find(|b| b.key == key)
    }

    /// Spend for a period and category, 0.0 when absent
    pub fn spend(&self, key: &str, category: Category) -> f64 {
        self.get(key)
            .and_then(|b| b.spend.get(&category).copied())
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Group spend transactions by period and category.
///
/// Only `amount < 0` contributes; income and zero amounts create no bucket.
pub fn aggregate_by_period(txns: &[Transaction], granularity: Granularity) -> PeriodSummary {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<PeriodBucket> = Vec::new();

    for t in txns.iter().filter(|t| t.is_spend()) {
        let key = granularity.period_key(t.date);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            buckets.push(PeriodBucket {
                key,
                spend: BTreeMap::new(),
            });
            buckets.len() - 1
        });
        *buckets[slot].spend.entry(t.category).or_insert(0.0) += t.abs_amount();
    }

    PeriodSummary {
        granularity,
        buckets,
    }
}

/// Income, spend and count for one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub income: f64,
    pub spend: f64,
    pub count: usize,
}

/// Category -> totals, covering every transaction regardless of sign
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorySummary {
    entries: Vec<(Category, CategoryTotals)>,
}

/// One row of the "where your money goes" breakdown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryShare {
    pub category: Category,
    pub spend: f64,
    /// Fraction of total spend, 0.0..=1.0
    pub share: f64,
    pub count: usize,
}

impl CategorySummary {
    pub fn entries(&self) -> &[(Category, CategoryTotals)] {
        &self.entries
    }

    pub fn get(&self, category: Category) -> Option<&CategoryTotals> {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, t)| t)
    }

    pub fn total_count(&self) -> usize {
        self.entries.iter().map(|(_, t)| t.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Categories with spend, largest first
    pub fn ranked_by_spend(&self) -> Vec<CategoryShare> {
        let total: f64 = self.entries.iter().map(|(_, t)| t.spend).sum();
        let mut rows: Vec<CategoryShare> = self
            .entries
            .iter()
            .filter(|(_, t)| t.spend > 0.0)
            .map(|(c, t)| CategoryShare {
                category: *c,
                spend: t.spend,
                share: if total > 0.0 { t.spend / total } else { 0.0 },
                count: t.count,
            })
            .collect();
        rows.sort_by(|a, b| b.spend.total_cmp(&a.spend));
        rows
    }

    fn entry(&mut self, category: Category) -> &mut CategoryTotals {
        let pos = match self.entries.iter().position(|(c, _)| *c == category) {
            Some(p) => p,
            None => {
                self.entries.push((category, CategoryTotals::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[pos].1
    }
}

/// Sum income, spend and count per category
pub fn aggregate_by_category(txns: &[Transaction]) -> CategorySummary {
    let mut summary = CategorySummary::default();
    for t in txns {
        let totals = summary.entry(t.category);
        if t.is_income() {
            totals.income += t.amount;
        } else {
            totals.spend += t.abs_amount();
        }
        totals.count += 1;
    }
    summary
}
