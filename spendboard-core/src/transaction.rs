//! Transaction records as served by the statement backend

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single bank-statement transaction, read-only from the dashboard's side
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Unique identifier assigned by the backend
    pub id: String,
    /// Booking date (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Positive = income, negative = spend
    pub amount: f64,
    /// Normalized counterparty name
    pub merchant_canonical: String,
    /// Statement line exactly as extracted
    pub description_raw: String,
    pub category: Category,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TransactionSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_with: Option<ExtractedWith>,
}

fn default_currency() -> String {
    "IDR".to_string()
}

/// Statement file a transaction was extracted from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionSource {
    pub file: String,
}

/// Extraction provenance reported by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedWith {
    pub model: String,
    pub schema_version: String,
}

/// Fixed category labels assigned by the backend.
///
/// Labels outside this set deserialize to [`Category::Other`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "String")]
pub enum Category {
    #[serde(rename = "Income")]
    Income,
    #[serde(rename = "Food & Dining")]
    FoodDining,
    #[serde(rename = "Transport & Mobility")]
    TransportMobility,
    #[serde(rename = "Bills & Utilities")]
    BillsUtilities,
    #[serde(rename = "Shopping & Entertainment")]
    ShoppingEntertainment,
    #[serde(rename = "Other")]
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Income,
        Category::FoodDining,
        Category::TransportMobility,
        Category::BillsUtilities,
        Category::ShoppingEntertainment,
        Category::Other,
    ];

    /// Display label, identical to the wire value
    pub fn label(&self) -> &'static str {
        match self {
            Category::Income => "Income",
            Category::FoodDining => "Food & Dining",
            Category::TransportMobility => "Transport & Mobility",
            Category::BillsUtilities => "Bills & Utilities",
            Category::ShoppingEntertainment => "Shopping & Entertainment",
            Category::Other => "Other",
        }
    }

    pub fn is_income(&self) -> bool {
        matches!(self, Category::Income)
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::ALL
            .into_iter()
            .find(|c| c.label() == label.trim())
            .unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Transaction {
    /// Create a transaction with only the fields the dashboard computes on
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        amount: f64,
        merchant_canonical: impl Into<String>,
        description_raw: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            amount,
            merchant_canonical: merchant_canonical.into(),
            description_raw: description_raw.into(),
            category,
            is_recurring: false,
            currency: default_currency(),
            category_confidence: None,
            recurring_frequency: None,
            source: None,
            extracted_with: None,
        }
    }

    /// Returns true for money coming in (positive amount)
    pub fn is_income(&self) -> bool {
        self.amount > 0.0
    }

    /// Returns true for money going out (negative amount)
    pub fn is_spend(&self) -> bool {
        self.amount < 0.0
    }

    pub fn abs_amount(&self) -> f64 {
        self.amount.abs()
    }
}
