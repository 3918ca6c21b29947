//! Human-readable number and duration formatting

use std::time::Duration;

/// Format large numbers with thousands separators
/// Examples: 1,234,567 or 987,654
pub fn format_count(value: u64) -> String {
    let s = value.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

/// Format throughput without meaningless decimals
pub fn format_throughput(throughput: f64) -> String {
    format_count(throughput as u64)
}

/// Format a duration as milliseconds with two decimals, or microseconds
/// below one millisecond
pub fn format_duration(duration: Duration) -> String {
    let micros = duration.as_nanos() as f64 / 1000.0;
    if micros < 1000.0 {
        format!("{:.2}us", micros)
    } else {
        format!("{:.2}ms", micros / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(123), "123");
        assert_eq!(format_count(1234), "1,234");
        assert_eq!(format_count(50000), "50,000");
        assert_eq!(format_count(1000000), "1,000,000");
    }

    #[test]
    fn test_format_throughput() {
        assert_eq!(format_throughput(937821.7051), "937,821");
        assert_eq!(format_throughput(123.456), "123");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_micros(250)), "250.00us");
        assert_eq!(format_duration(Duration::from_micros(12_340)), "12.34ms");
        assert_eq!(format_duration(Duration::from_secs(1)), "1000.00ms");
    }
}
