//! FILENAME: crosstab-engine/src/format.rs
//! Display text for numeric cells.

use crate::definition::DigitGroupSeparator;

/// Parses a result value as a number. Surrounding whitespace is ignored;
/// anything else that is not a plain float (dates, ids, "12abc") is not
/// a number.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Canonical text of a number: no trailing zeros, no exponent.
pub fn number_text(value: f64) -> String {
    if value == 0.0 {
        // Avoid "-0"
        return "0".to_string();
    }
    value.to_string()
}

fn decimal_places(text: &str) -> usize {
    text.find('.').map(|dot| text.len() - dot - 1).unwrap_or(0)
}

/// Text of an aggregate: rounded to two decimals when it has more.
pub fn round_display(value: f64) -> String {
    let text = number_text(value);
    if decimal_places(&text) > 2 {
        number_text((value * 100.0).round() / 100.0)
    } else {
        text
    }
}

/// Inserts the group separator every three digits of the integer part.
/// Text that is not a number is returned unchanged.
pub fn group_digits(text: &str, separator: DigitGroupSeparator) -> String {
    if separator == DigitGroupSeparator::None || parse_number(text).is_none() {
        return text.to_string();
    }

    let text = text.trim();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (integer, fraction) = match unsigned.find('.') {
        Some(dot) => unsigned.split_at(dot),
        None => (unsigned, ""),
    };

    if !integer.bytes().all(|b| b.is_ascii_digit()) {
        return text.to_string();
    }

    let sep = separator.as_str();
    let mut grouped = String::with_capacity(text.len() + integer.len() / 3 * sep.len());
    grouped.push_str(sign);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push_str(sep);
        }
        grouped.push(ch);
    }
    grouped.push_str(fraction);
    grouped
}
