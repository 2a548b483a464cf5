//! Free-text currency amounts as typed into the calculator, and the CHF
//! rendering they are shown back with.
//!
//! Input follows Swiss and generic European habits: `1'000.50`, `1’000,50`,
//! `1 000`, `1.000,50`. Anything that cannot be read as a non-negative amount
//! becomes `0.0`; parsing never fails.

const GROUPING_SEPARATOR: char = '\'';

pub fn parse_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    // Grouping apostrophes (straight or curly) and whitespace fall out here too.
    let normalized: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let number = match (normalized.rfind('.'), normalized.rfind(',')) {
        // Both present: whichever separator comes last is the decimal point.
        (Some(dot), Some(comma)) if comma > dot => {
            normalized.replace('.', "").replace(',', ".")
        }
        (Some(_), Some(_)) => normalized.replace(',', ""),
        (None, Some(_)) => normalized.replace(',', "."),
        _ => normalized,
    };

    match leading_float(&number) {
        Some(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

/// Reads the longest numeric prefix (`-`? digits (`.` digits)?), ignoring any
/// trailing garbage such as a second decimal point.
fn leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = usize::from(bytes.first() == Some(&b'-'));

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }
    s[..end].parse::<f64>().ok()
}

/// Half-away-from-zero rounding to cents, nudged by one epsilon so values
/// like `1.005` land on the upper cent.
pub fn round_to_2(n: f64) -> f64 {
    ((n + f64::EPSILON) * 100.0).round() / 100.0
}

pub fn clamp01(n: f64) -> f64 {
    if !n.is_finite() {
        return 0.0;
    }
    n.clamp(0.0, 1.0)
}

/// Renders `value` as `CHF 1'234.50`. Undefined values render as `CHF -` so a
/// missing rate is never shown as zero.
pub fn format_chf(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "CHF -".to_string();
    }

    let rounded = if decimals == 2 {
        round_to_2(value)
    } else {
        value
    };
    let body = format!("{:.*}", decimals, rounded.abs());
    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (body.as_str(), None),
    };

    let mut out = String::from("CHF ");
    if rounded < 0.0 && body.chars().any(|c| c != '0' && c != '.') {
        out.push('-');
    }
    out.push_str(&group_digits(int_part, GROUPING_SEPARATOR));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx != 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped
}
