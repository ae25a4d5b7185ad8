use chrono::DateTime;

use crate::models::Timestamp;

/// Format a float with thousands separators and two decimals: 1,234.56
pub fn amount(val: f64) -> String {
    let negative = val < 0.0;
    let fixed = format!("{:.2}", val.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative && fixed != "0.00" {
        format!("-{with_commas}.{dec_part}")
    } else {
        format!("{with_commas}.{dec_part}")
    }
}

/// Nanosecond timestamp as a UTC calendar date.
pub fn date(ts: Timestamp) -> String {
    DateTime::from_timestamp_nanos(ts).format("%Y-%m-%d").to_string()
}

pub fn datetime(ts: Timestamp) -> String {
    DateTime::from_timestamp_nanos(ts)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

pub fn opt_date(ts: Option<Timestamp>) -> String {
    ts.map(date).unwrap_or_else(|| "-".to_string())
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_formatting() {
        assert_eq!(amount(1234.56), "1,234.56");
        assert_eq!(amount(-500.00), "-500.00");
        assert_eq!(amount(0.0), "0.00");
        assert_eq!(amount(-0.001), "0.00");
        assert_eq!(amount(2500000.5), "2,500,000.50");
    }

    #[test]
    fn test_dates_are_utc() {
        assert_eq!(date(1_736_899_200_000_000_000), "2025-01-15");
        assert_eq!(datetime(1_736_899_200_000_000_000 + 3_600_000_000_000), "2025-01-15 01:00");
        assert_eq!(opt_date(None), "-");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
    }
}
