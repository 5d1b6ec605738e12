//! Error types for spendboard-core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown date range preset: {0} (expected thisMonth, lastMonth or last3Months)")]
    UnknownPreset(String),

    #[error("unknown view: {0} (expected daily, weekly or monthly)")]
    UnknownGranularity(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, Error>;
