//! Price and quantity parsing shared by every collector.

use crate::error::{CollectError, CollectResult};

/// Formats a price with six decimals, then drops trailing zeros and a
/// dangling decimal point (`0.100000` -> `0.1`, `2.000000` -> `2`).
pub fn format_price(price: f64) -> String {
    let formatted = format!("{price:.6}");
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

/// Parses a vendor price string such as `"0.0960000000"` or `"1,234.5"`.
pub fn parse_price(raw: &str) -> CollectResult<f64> {
    let cleaned = raw.trim().replace(',', "");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CollectError::MalformedPrice {
            raw: raw.to_string(),
        })
}

/// Reads the leading number of a quantity such as `"1,952 GiB"` or `"4"`.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let first = raw.split_whitespace().next()?;
    first.replace(',', "").parse::<f64>().ok()
}

/// Leading integer of a quantity, e.g. vCPU or GPU counts.
pub fn parse_count(raw: &str) -> Option<u32> {
    let value = parse_quantity(raw)?;
    if value >= 0.0 && value.fract() == 0.0 {
        Some(value as u32)
    } else {
        None
    }
}

/// Leading run of ASCII digits, e.g. the lease years in `"3 yr"`.
pub fn leading_digits(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
