//! Date-range presets for the transaction fetch.
//!
//! Dates are day-granular and both bounds are inclusive.

use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Named range offered by the range picker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum RangePreset {
    #[default]
    ThisMonth,
    LastMonth,
    Last3Months,
}

impl RangePreset {
    pub const ALL: [RangePreset; 3] = [
        RangePreset::ThisMonth,
        RangePreset::LastMonth,
        RangePreset::Last3Months,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RangePreset::ThisMonth => "thisMonth",
            RangePreset::LastMonth => "lastMonth",
            RangePreset::Last3Months => "last3Months",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RangePreset::ThisMonth => "This Month",
            RangePreset::LastMonth => "Last Month",
            RangePreset::Last3Months => "Last 3 Months",
        }
    }

    /// Resolve the preset against a reference date
    pub fn resolve(&self, today: NaiveDate) -> DateRange {
        let (start, end) = match self {
            RangePreset::ThisMonth => (first_of_month(today), last_of_month(today)),
            RangePreset::LastMonth => {
                let prev = months_back(today, 1);
                (prev, last_of_month(prev))
            }
            RangePreset::Last3Months => (months_back(today, 2), last_of_month(today)),
        };
        DateRange {
            start,
            end,
            label: self.label().to_string(),
        }
    }
}

impl FromStr for RangePreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "thisMonth" | "this-month" => Ok(RangePreset::ThisMonth),
            "lastMonth" | "last-month" => Ok(RangePreset::LastMonth),
            "last3Months" | "last-3-months" => Ok(RangePreset::Last3Months),
            other => Err(Error::UnknownPreset(other.to_string())),
        }
    }
}

impl fmt::Display for RangePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Concrete inclusive date window used to parameterize the fetch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
}

impl DateRange {
    /// Custom range; bounds are passed through unvalidated
    pub fn custom(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            label: format!("{} – {}", start.format("%d/%m/%Y"), end.format("%d/%m/%Y")),
        }
    }

    /// Query-string form of the start bound
    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Holds the active selection; unknown preset names leave it untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRangeSelector {
    preset: Option<RangePreset>,
    current: DateRange,
}

impl DateRangeSelector {
    pub fn new(preset: RangePreset, today: NaiveDate) -> Self {
        Self {
            preset: Some(preset),
            current: preset.resolve(today),
        }
    }

    pub fn current(&self) -> &DateRange {
        &self.current
    }

    /// Preset behind the current selection, `None` for custom ranges
    pub fn preset(&self) -> Option<RangePreset> {
        self.preset
    }

    /// Apply a preset by name. Returns false (and keeps the previous range)
    /// when the name is not a known preset.
    pub fn select(&mut self, name: &str, today: NaiveDate) -> bool {
        match name.parse::<RangePreset>() {
            Ok(p) => {
                self.apply(p, today);
                true
            }
            Err(_) => false,
        }
    }

    pub fn apply(&mut self, preset: RangePreset, today: NaiveDate) {
        self.preset = Some(preset);
        self.current = preset.resolve(today);
    }

    pub fn set_custom(&mut self, range: DateRange) {
        self.preset = None;
        self.current = range;
    }
}

/// Today's calendar date in the given IANA timezone
pub fn today_in(tz: &str) -> Result<NaiveDate> {
    let tz: Tz = tz
        .parse()
        .map_err(|_| Error::InvalidTimezone(tz.to_string()))?;
    Ok(Utc::now().with_timezone(&tz).date_naive())
}

/// Parse a YYYY-MM-DD date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap_or(d)
}

fn last_of_month(d: NaiveDate) -> NaiveDate {
    let first = first_of_month(d);
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    next.and_then(|n| n.pred_opt()).unwrap_or(d)
}

/// First day of the month `n` months before `d`'s month
fn months_back(d: NaiveDate, n: i32) -> NaiveDate {
    let idx = d.year() * 12 + d.month0() as i32 - n;
    let (year, month0) = (idx.div_euclid(12), idx.rem_euclid(12));
    NaiveDate::from_ymd_opt(year, month0 as u32 + 1, 1).unwrap_or(d)
}
