// Utility helpers for parsing and number formatting.
//
// This module centralizes the forgiving field handling so the rest of the
// code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    // The ETL step writes dates as `YYYY-MM-DD`. Some exports append a time
    // component, so only the first ten characters are considered.
    let s = s?.trim();
    if s.len() < 10 {
        return None;
    }
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}

/// Ratio expressed as a percentage, `0` when the denominator is zero.
/// Never returns `-0.0`.
pub fn safe_percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let v = numerator / denominator * 100.0;
    if v.is_finite() && v != 0.0 {
        v
    } else {
        0.0
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Compact rendering for KPI cards: `1.2M`, `456.8K`, `12.34`.
pub fn abbreviate_number(n: f64) -> String {
    let abs = n.abs();
    let sign = if n < 0.0 { "-" } else { "" };
    if abs >= 1_000_000_000.0 {
        format!("{}{:.1}B", sign, abs / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("{}{:.1}M", sign, abs / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{}{:.1}K", sign, abs / 1_000.0)
    } else {
        format!("{}{}", sign, format_number(abs, 2))
    }
}

/// Signed percentage with one decimal, e.g. `+12.5%` or `-3.0%`.
pub fn format_percent(p: f64) -> String {
    // `-0.0` would otherwise print as `+-0.0%`
    let p = if p == 0.0 { 0.0 } else { p };
    if p >= 0.0 {
        format!("+{:.1}%", p)
    } else {
        format!("{:.1}%", p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_f64_safe() {
        assert_eq!(parse_f64_safe(Some(" 1,234.50 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("-7")), Some(-7.0));
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn test_parse_date_safe() {
        assert_eq!(
            parse_date_safe(Some("2022-03-15")),
            NaiveDate::from_ymd_opt(2022, 3, 15)
        );
        assert_eq!(
            parse_date_safe(Some("2022-03-15T00:00:00Z")),
            NaiveDate::from_ymd_opt(2022, 3, 15)
        );
        assert_eq!(parse_date_safe(Some("15/03/2022")), None);
        assert_eq!(parse_date_safe(Some("2022-13-01")), None);
        assert_eq!(parse_date_safe(None), None);
    }

    #[test]
    fn test_safe_percent_zero_denominator() {
        assert_eq!(safe_percent(5.0, 0.0), 0.0);
        assert_eq!(safe_percent(5.0, 50.0), 10.0);
    }

    #[test]
    fn test_negative_zero_is_unsigned() {
        let v = safe_percent(0.0, -40.0);
        assert_eq!(v, 0.0);
        assert!(v.is_sign_positive());
        assert_eq!(format_percent(-0.0), "+0.0%");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 1), "-42.0");
        assert_eq!(format_number(0.0, 0), "0");
    }

    #[test]
    fn test_abbreviate_and_percent() {
        assert_eq!(abbreviate_number(2_297_200.86), "2.3M");
        assert_eq!(abbreviate_number(45_300.0), "45.3K");
        assert_eq!(abbreviate_number(-12.5), "-12.50");
        assert_eq!(format_percent(12.5), "+12.5%");
        assert_eq!(format_percent(-6.0), "-6.0%");
        assert_eq!(format_percent(0.0), "+0.0%");
    }
}
