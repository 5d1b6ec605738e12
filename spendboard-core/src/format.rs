//! Display formatting (id-ID conventions: `.` groups thousands, `,` decimals)

use chrono::NaiveDate;

use crate::aggregate::Granularity;
use crate::chart::parse_week_key;

fn group_thousands(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut groups = Vec::new();
    while value > 0 {
        groups.push(value % 1000);
        value /= 1000;
    }
    let mut out = groups.pop().map(|g| g.to_string()).unwrap_or_default();
    for g in groups.iter().rev() {
        out.push_str(&format!(".{g:03}"));
    }
    out
}

/// `Rp 1.250.000`, `-Rp 15.000`, `Rp 9.999,50`
pub fn format_currency(amount: f64, symbol: &str) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let (whole, frac) = (cents / 100, cents % 100);
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    let mut s = format!("{sign}{symbol} {}", group_thousands(whole));
    if frac != 0 {
        s.push_str(&format!(",{frac:02}"));
    }
    s
}

/// Transaction-table amount: `+` for income, `-` for spend
pub fn format_signed(amount: f64, symbol: &str) -> String {
    if amount > 0.0 {
        format!("+{}", format_currency(amount, symbol))
    } else {
        format_currency(amount, symbol)
    }
}

/// `dd/MM/yyyy`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Short axis label for a period key
pub fn period_label(granularity: Granularity, key: &str) -> String {
    match granularity {
        Granularity::Daily => NaiveDate::parse_from_str(key, "%Y-%m-%d")
            .map(|d| d.format("%d %b").to_string())
            .unwrap_or_else(|_| key.to_string()),
        Granularity::Weekly => match parse_week_key(key) {
            Some((_, month, week)) => format!("{month}/W{week}"),
            None => key.to_string(),
        },
        Granularity::Monthly => NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d")
            .map(|d| d.format("%b %y").to_string())
            .unwrap_or_else(|_| key.to_string()),
    }
}

/// Long label for tooltips and tables: weekly keys read `2024-3-Week 2`
pub fn period_title(granularity: Granularity, key: &str) -> String {
    match granularity {
        Granularity::Weekly => key.replace('W', "Week "),
        _ => period_label(granularity, key),
    }
}
