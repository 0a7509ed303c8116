use chrono::{Duration, NaiveDate};

use crate::error::NormalizeError;

const FORMATS: &[&str] = &[
    "%Y-%m-%d",   // ISO
    "%m/%d/%Y",   // US: 01/15/2024
    "%d/%m/%Y",   // EU: 15/01/2024
    "%m-%d-%Y",   // US: 01-15-2024
    "%d-%m-%Y",   // EU: 15-01-2024
    "%Y/%m/%d",   // 2024/01/15
    "%b %d, %Y",  // Jan 15, 2024
    "%B %d, %Y",  // January 15, 2024
    "%d %b %Y",   // 15 Jan 2024
    "%d %B %Y",   // 15 January 2024
    "%Y%m%d",     // 20240115
];

/// Normalize a date string to `YYYY-MM-DD`.
///
/// Tries, in order: an idempotent ISO passthrough, the fixed format list
/// above (US-before-EU for ambiguous `mm/dd` vs `dd/mm` strings, by design —
/// see `DESIGN.md`), and finally an Excel/Sheets serial day count in the
/// range `(1, 100000)`, counted from `1899-12-30`.
pub fn normalize_date_any(value: &str) -> Result<String, NormalizeError> {
    let value_str = value.trim();
    if value_str.is_empty() {
        return Err(NormalizeError::new("Date is empty"));
    }

    if is_iso_shape(value_str) {
        if let Ok(date) = NaiveDate::parse_from_str(value_str, "%Y-%m-%d") {
            return Ok(date.format("%Y-%m-%d").to_string());
        }
    }

    for fmt in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value_str, fmt) {
            return Ok(date.format("%Y-%m-%d").to_string());
        }
    }

    if let Ok(serial) = value_str.parse::<f64>() {
        if serial > 1.0 && serial < 100_000.0 {
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch date");
            if let Some(date) = epoch.checked_add_signed(Duration::days(serial.trunc() as i64)) {
                return Ok(date.format("%Y-%m-%d").to_string());
            }
        }
    }

    Err(NormalizeError::new(format!("Cannot parse date: {value}")))
}

fn is_iso_shape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[0..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_passes_through() {
        assert_eq!(normalize_date_any("2024-01-15").unwrap(), "2024-01-15");
    }

    #[test]
    fn us_slash_format() {
        assert_eq!(normalize_date_any("01/15/2024").unwrap(), "2024-01-15");
    }

    #[test]
    fn eu_dash_format() {
        assert_eq!(normalize_date_any("15-01-2024").unwrap(), "2024-01-15");
    }

    #[test]
    fn named_month() {
        assert_eq!(normalize_date_any("Jan 15, 2024").unwrap(), "2024-01-15");
        assert_eq!(normalize_date_any("15 January 2024").unwrap(), "2024-01-15");
    }

    #[test]
    fn compact_format() {
        assert_eq!(normalize_date_any("20240115").unwrap(), "2024-01-15");
    }

    #[test]
    fn excel_serial() {
        // 45306 -> 2024-01-15
        assert_eq!(normalize_date_any("45306").unwrap(), "2024-01-15");
    }

    #[test]
    fn garbage_fails() {
        assert!(normalize_date_any("not-a-date").is_err());
    }

    #[test]
    fn idempotent() {
        let once = normalize_date_any("01/15/2024").unwrap();
        let twice = normalize_date_any(&once).unwrap();
        assert_eq!(once, twice);
    }
}
