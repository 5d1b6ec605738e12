//! Property-based tests for the dashboard aggregations.
//!
//! Run with: cargo test -p spendboard-core --test aggregation_properties

use chrono::NaiveDate;
use proptest::prelude::*;
use spendboard_core::{
    aggregate_by_category, aggregate_by_period, Category, Granularity, Kpis, Snapshot, Transaction,
};

// ============================================================================
// Arbitrary generators
// ============================================================================

fn arb_category() -> impl Strategy<Value = Category> {
    prop::sample::select(Category::ALL.to_vec())
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2023i32..2026i32, 1u32..13u32, 1u32..29u32)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn arb_amount() -> impl Strategy<Value = f64> {
    // whole rupiah, including the occasional zero
    (-5_000_000i64..5_000_000i64).prop_map(|n| n as f64)
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (0u32..100_000, arb_date(), arb_amount(), arb_category()).prop_map(|(id, date, amount, cat)| {
        Transaction::new(format!("txn_{id}"), date, amount, "Merchant", "RAW LINE", cat)
    })
}

fn arb_transactions() -> impl Strategy<Value = Vec<Transaction>> {
    prop::collection::vec(arb_transaction(), 0..60)
}

fn arb_granularity() -> impl Strategy<Value = Granularity> {
    prop::sample::select(Granularity::ALL.to_vec())
}

// ============================================================================
// KPI properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_kpi_net_is_income_minus_spend(txns in arb_transactions()) {
        let k = Kpis::from_transactions(&txns);
        prop_assert!(k.total_income >= 0.0);
        prop_assert!(k.total_spend >= 0.0);
        prop_assert_eq!(k.total_income - k.total_spend, k.net);
        prop_assert!(k.income_count + k.spend_count <= k.total_count);
    }

    #[test]
    fn prop_category_counts_cover_every_transaction(txns in arb_transactions()) {
        let s = aggregate_by_category(&txns);
        prop_assert_eq!(s.total_count(), txns.len());

        let income: f64 = s.entries().iter().map(|(_, t)| t.income).sum();
        let spend: f64 = s.entries().iter().map(|(_, t)| t.spend).sum();
        let k = Kpis::from_transactions(&txns);
        // whole-number amounts keep float sums exact
        prop_assert_eq!(income, k.total_income);
        prop_assert_eq!(spend, k.total_spend);
    }

    #[test]
    fn prop_period_summary_only_counts_spend(txns in arb_transactions(), g in arb_granularity()) {
        let summary = aggregate_by_period(&txns, g);

        for bucket in summary.buckets() {
            for (category, value) in &bucket.spend {
                let expected: f64 = txns
                    .iter()
                    .filter(|t| t.amount < 0.0)
                    .filter(|t| t.category == *category)
                    .filter(|t| g.period_key(t.date) == bucket.key)
                    .map(|t| t.amount.abs())
                    .sum();
                prop_assert_eq!(*value, expected);
            }
        }

        // every spend transaction is represented
        for t in txns.iter().filter(|t| t.is_spend()) {
            let key = g.period_key(t.date);
            prop_assert!(summary.spend(&key, t.category) >= t.abs_amount());
        }
    }

    #[test]
    fn prop_aggregation_is_idempotent(txns in arb_transactions(), g in arb_granularity()) {
        prop_assert_eq!(Snapshot::compute(&txns, g), Snapshot::compute(&txns, g));
    }

    #[test]
    fn prop_income_only_lists_have_no_periods(
        amounts in prop::collection::vec(0i64..1_000_000, 0..20),
        date in arb_date(),
    ) {
        let txns: Vec<_> = amounts
            .iter()
            .map(|a| Transaction::new("i", date, *a as f64, "Employer", "SALARY", Category::Income))
            .collect();
        prop_assert!(aggregate_by_period(&txns, Granularity::Daily).is_empty());
    }
}

// ============================================================================
// Fixed examples
// ============================================================================

#[test]
fn test_salary_and_rent_kpis() {
    let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let txns = vec![
        Transaction::new("1", d, 1_000_000.0, "Employer", "SALARY MAR", Category::Income),
        Transaction::new("2", d, -300_000.0, "Landlord", "RENT MAR", Category::BillsUtilities),
    ];
    let snap = Snapshot::compute(&txns, Granularity::Monthly);
    assert_eq!(snap.kpis.total_income, 1_000_000.0);
    assert_eq!(snap.kpis.total_spend, 300_000.0);
    assert_eq!(snap.kpis.net, 700_000.0);
    assert_eq!(snap.periods.spend("2024-03", Category::BillsUtilities), 300_000.0);
    assert_eq!(snap.series().points.len(), 1);
}
