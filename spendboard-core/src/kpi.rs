//! Headline numbers for the active date range

use serde::Serialize;

use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    /// Sum of positive amounts
    pub total_income: f64,
    /// Sum of |amount| over negative amounts
    pub total_spend: f64,
    /// total_income - total_spend
    pub net: f64,
    pub income_count: usize,
    pub spend_count: usize,
    pub total_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Balance {
    Surplus,
    Deficit,
}

impl Balance {
    pub fn label(&self) -> &'static str {
        match self {
            Balance::Surplus => "Surplus",
            Balance::Deficit => "Deficit",
        }
    }
}

impl Kpis {
    /// Zero amounts count toward neither sum.
    pub fn from_transactions(txns: &[Transaction]) -> Self {
        let mut k = Kpis {
            total_count: txns.len(),
            ..Kpis::default()
        };
        for t in txns {
            if t.is_income() {
                k.total_income += t.amount;
                k.income_count += 1;
            } else if t.is_spend() {
                k.total_spend += t.abs_amount();
                k.spend_count += 1;
            }
        }
        k.net = k.total_income - k.total_spend;
        k
    }

    pub fn balance(&self) -> Balance {
        if self.net >= 0.0 {
            Balance::Surplus
        } else {
            Balance::Deficit
        }
    }
}
