//! Plain-text, CSV and JSON output for the one-shot commands.

use anyhow::Result;
use serde::Serialize;
use spendboard_api::{ApiError, HealthStatus, TransactionList};
use spendboard_core::format::{format_currency, format_date, format_signed, period_title};
use spendboard_core::{DateRange, Feedback, Kpis, Severity, Snapshot, SpendingSeries, Transaction};
use std::io::Write;

pub const EMPTY_MESSAGE: &str = "No transactions found for the selected period.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn write_range_header(out: &mut impl Write, range: &DateRange) -> Result<()> {
    writeln!(
        out,
        "{} ({} – {})",
        range.label,
        format_date(range.start),
        format_date(range.end)
    )?;
    Ok(())
}

pub fn write_transactions_table(
    out: &mut impl Write,
    txns: &[Transaction],
    symbol: &str,
) -> Result<()> {
    if txns.is_empty() {
        writeln!(out, "{EMPTY_MESSAGE}")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<10}  {:<24}  {:<32}  {:>18}  {:<24}  {}",
        "Date", "Merchant", "Description", "Amount", "Category", "Recurring"
    )?;
    for t in txns {
        writeln!(
            out,
            "{:<10}  {:<24}  {:<32}  {:>18}  {:<24}  {}",
            format_date(t.date),
            truncate(&t.merchant_canonical, 24),
            truncate(&t.description_raw, 32),
            format_signed(t.amount, symbol),
            t.category.label(),
            if t.is_recurring { "yes" } else { "" }
        )?;
    }
    writeln!(out, "\n{} transaction(s)", txns.len())?;
    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    date: String,
    merchant: &'a str,
    description: &'a str,
    amount: f64,
    currency: &'a str,
    category: &'a str,
    recurring: bool,
}

pub fn write_transactions_csv(out: &mut impl Write, txns: &[Transaction]) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    for t in txns {
        w.serialize(CsvRow {
            id: &t.id,
            date: t.date.format("%Y-%m-%d").to_string(),
            merchant: &t.merchant_canonical,
            description: &t.description_raw,
            amount: t.amount,
            currency: &t.currency,
            category: t.category.label(),
            recurring: t.is_recurring,
        })?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_transactions_json(out: &mut impl Write, list: &TransactionList) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, list)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_kpis(out: &mut impl Write, kpis: &Kpis, symbol: &str) -> Result<()> {
    writeln!(
        out,
        "Total Income   {:>20}   ({} transactions)",
        format_currency(kpis.total_income, symbol),
        kpis.income_count
    )?;
    writeln!(
        out,
        "Total Spend    {:>20}   ({} transactions)",
        format_currency(kpis.total_spend, symbol),
        kpis.spend_count
    )?;
    writeln!(
        out,
        "Net            {:>20}   {}",
        format_currency(kpis.net.abs(), symbol),
        kpis.balance().label()
    )?;
    Ok(())
}

/// KPI block, category breakdown and the spending trend
pub fn write_summary(out: &mut impl Write, snap: &Snapshot, symbol: &str) -> Result<()> {
    if snap.categories.is_empty() {
        writeln!(out, "{EMPTY_MESSAGE}")?;
        return Ok(());
    }

    write_kpis(out, &snap.kpis, symbol)?;

    writeln!(out, "\nSpending by category")?;
    let ranked = snap.categories.ranked_by_spend();
    if ranked.is_empty() {
        writeln!(out, "  (no spending)")?;
    }
    for share in &ranked {
        writeln!(
            out,
            "  {:<26} {:>18}  {:>5.1}%  {:>4} txn",
            share.category.label(),
            format_currency(share.spend, symbol),
            share.share * 100.0,
            share.count
        )?;
    }

    let series =
        SpendingSeries::with_limit(&snap.periods, snap.periods.granularity.max_periods());
    writeln!(out, "\nSpending trend ({})", series.granularity)?;
    write_trend(out, &series, symbol)?;
    Ok(())
}

fn write_trend(out: &mut impl Write, series: &SpendingSeries, symbol: &str) -> Result<()> {
    if series.is_empty() {
        writeln!(out, "  (no spending)")?;
        return Ok(());
    }
    let max = series.max_total();
    for p in &series.points {
        let total = p.total();
        let width = if max > 0.0 {
            ((total / max) * 30.0).round() as usize
        } else {
            0
        };
        writeln!(
            out,
            "  {:<16} {:>18}  {}",
            period_title(series.granularity, &p.period),
            format_currency(total, symbol),
            "█".repeat(width)
        )?;
    }
    Ok(())
}

pub fn write_feedback(out: &mut impl Write, fb: &Feedback) -> Result<()> {
    let tag = match fb.severity {
        Severity::Success => "ok",
        Severity::Warning => "warning",
        Severity::Error => "error",
    };
    writeln!(out, "[{tag}] {}: {}", fb.title, fb.message)?;
    if let Some(d) = &fb.details {
        writeln!(out, "        {d}")?;
    }
    Ok(())
}

/// Badge shown by `health`
pub fn health_badge(result: &Result<HealthStatus, ApiError>) -> &'static str {
    match result {
        Ok(h) if h.is_healthy() => "Healthy",
        Ok(_) => "Unknown",
        Err(_) => "Error",
    }
}

pub fn write_health(
    out: &mut impl Write,
    base_url: &str,
    result: &Result<HealthStatus, ApiError>,
) -> Result<()> {
    writeln!(out, "Backend API status ({base_url}/health)")?;
    writeln!(out, "Status: {}", health_badge(result))?;
    match result {
        Ok(h) => {
            writeln!(out, "Response:")?;
            writeln!(out, "{}", serde_json::to_string_pretty(h)?)?;
        }
        Err(e) => {
            writeln!(out, "Error details: {e}")?;
            writeln!(out, "Troubleshooting:")?;
            writeln!(out, "  - make sure the backend server is running at {base_url}")?;
            writeln!(out, "  - start it with: uvicorn main:app --reload --port 8000")?;
            writeln!(out, "  - or point the client elsewhere with --api-url / SPENDBOARD_API_URL")?;
        }
    }
    let ok = matches!(result, Ok(h) if h.is_healthy());
    writeln!(out, "Integration: {}", if ok { "working" } else { "failed" })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use spendboard_core::{Category, Granularity};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn sample() -> Vec<Transaction> {
        let mut salary = Transaction::new("1", d(1), 1_000_000.0, "PT Maju", "GAJI", Category::Income);
        salary.is_recurring = true;
        vec![
            salary,
            Transaction::new("2", d(2), -300_000.0, "Kost Melati", "SEWA KOST", Category::BillsUtilities),
            Transaction::new("3", d(2), -25_000.0, "Gojek", "GOJEK RIDE", Category::TransportMobility),
        ]
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_empty_table() {
        let s = render(|o| write_transactions_table(o, &[], "Rp"));
        assert_eq!(s.trim(), EMPTY_MESSAGE);
    }

    #[test]
    fn test_table_rows() {
        let s = render(|o| write_transactions_table(o, &sample(), "Rp"));
        assert!(s.contains("01/03/2024"));
        assert!(s.contains("+Rp 1.000.000"));
        assert!(s.contains("-Rp 300.000"));
        assert!(s.contains("Bills & Utilities"));
        assert!(s.contains("3 transaction(s)"));
    }

    #[test]
    fn test_csv_output() {
        let s = render(|o| write_transactions_csv(o, &sample()));
        let mut lines = s.lines();
        assert_eq!(
            lines.next(),
            Some("id,date,merchant,description,amount,currency,category,recurring")
        );
        assert_eq!(
            lines.next(),
            Some("1,2024-03-01,PT Maju,GAJI,1000000.0,IDR,Income,true")
        );
        assert_eq!(s.lines().count(), 4);
    }

    #[test]
    fn test_summary_sections() {
        let snap = Snapshot::compute(&sample(), Granularity::Daily);
        let s = render(|o| write_summary(o, &snap, "Rp"));
        assert!(s.contains("Rp 675.000"));
        assert!(s.contains("Surplus"));
        assert!(s.contains("Bills & Utilities"));
        assert!(s.contains("Spending trend (daily)"));
        // income never shows up in the trend
        assert_eq!(s.matches("Rp 325.000").count(), 2);
    }

    #[test]
    fn test_summary_of_nothing() {
        let snap = Snapshot::compute(&[], Granularity::Monthly);
        let s = render(|o| write_summary(o, &snap, "Rp"));
        assert_eq!(s.trim(), EMPTY_MESSAGE);
    }

    #[test]
    fn test_deficit_net_is_unsigned() {
        let snap = Snapshot::compute(&sample()[1..], Granularity::Daily);
        let s = render(|o| write_kpis(o, &snap.kpis, "Rp"));
        let net = s.lines().find(|l| l.starts_with("Net")).unwrap();
        assert!(net.contains("Rp 325.000"), "{net}");
        assert!(!net.contains("-Rp"));
        assert!(net.ends_with("Deficit"));
    }

    #[test]
    fn test_health_badges() {
        let ok: Result<HealthStatus, ApiError> = Ok(HealthStatus { status: "ok".into() });
        let odd: Result<HealthStatus, ApiError> = Ok(HealthStatus { status: "starting".into() });
        let err: Result<HealthStatus, ApiError> = Err(ApiError::Status {
            status: 500,
            message: "Health check failed: 500".into(),
        });
        assert_eq!(health_badge(&ok), "Healthy");
        assert_eq!(health_badge(&odd), "Unknown");
        assert_eq!(health_badge(&err), "Error");

        let s = render(|o| write_health(o, "http://localhost:8000", &err));
        assert!(s.contains("Troubleshooting"));
        assert!(s.contains("Health check failed: 500"));
        assert!(s.contains("Integration: failed"));
    }

    #[test]
    fn test_feedback_details_line() {
        let s = render(|o| write_feedback(o, &Feedback::files_skipped(3, 2)));
        assert!(s.starts_with("[warning] Some Files Skipped: 1 non-PDF files were skipped."));
        assert!(s.contains("Selected: 3 files, Processing: 2 PDF files"));
    }
}
