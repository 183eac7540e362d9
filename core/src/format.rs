//! French-locale display helpers for amounts and counts.
//!
//! Output matches the browser's `fr-FR` number formatting: narrow no-break
//! space (U+202F) between digit groups, comma as decimal separator, and a
//! no-break space (U+00A0) before the euro sign.
//!
//! The product list shows `—` for a missing amount (`eur`, `number`) while the
//! dashboard counts a missing value as zero (`eur_or_zero`, `number_or_zero`).

use serde_json::Value;

use crate::types::number_from_value;

const GROUP_SEPARATOR: char = '\u{202F}';
const CURRENCY_SPACE: char = '\u{00A0}';

/// Placeholder for a missing or unreadable value.
pub const MISSING: &str = "—";

/// `1 234,56 €`, or `—` when there is no value.
pub fn eur(value: Option<f64>) -> String {
    match value.filter(|n| n.is_finite()) {
        Some(n) => format!("{}{CURRENCY_SPACE}€", localize(&format!("{n:.2}"))),
        None => MISSING.to_string(),
    }
}

/// `eur` for a raw JSON value; numeric strings are accepted.
pub fn eur_json(value: &Value) -> String {
    eur(number_from_value(value))
}

/// Grouped number with up to three decimals, or `—`.
pub fn number(value: Option<f64>) -> String {
    match value.filter(|n| n.is_finite()) {
        Some(n) => {
            let fixed = format!("{n:.3}");
            let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
            localize(trimmed)
        }
        None => MISSING.to_string(),
    }
}

/// Dashboard flavour of `eur`: a missing total reads as `0,00 €`, only a
/// non-finite value renders `—`.
pub fn eur_or_zero(value: Option<f64>) -> String {
    eur(Some(value.unwrap_or(0.0)))
}

/// Dashboard flavour of `number`: a missing count reads as `0`.
pub fn number_or_zero(value: Option<f64>) -> String {
    number(Some(value.unwrap_or(0.0)))
}

/// Resale multiple as shown on the dashboard, e.g. `x2.50`.
pub fn multiple(value: f64) -> String {
    format!("x{value:.2}")
}

/// Turn `-1234.5` style text into `-1 234,5`.
fn localize(plain: &str) -> String {
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(digit);
    }

    // "-0" and "-0,00" read as zero.
    let is_zero = unsigned.chars().all(|c| c == '0' || c == '.');
    let sign = if is_zero { "" } else { sign };

    match frac_part {
        Some(frac) => format!("{sign}{grouped},{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
