//! Duration expression parsing.

use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;

// Fractional digits beyond this point are below nanosecond resolution for every supported unit.
const MAX_FRACTION_DIGITS: usize = 18;

/// Parses a duration expression.
///
/// Expressions are a sequence of decimal numbers, each with an optional fraction and a mandatory unit suffix, such as
/// `300ms`, `1.5s`, or `2h45m`. Valid units are `ns`, `us` (or `µs`/`μs`), `ms`, `s`, `m`, and `h`. A leading `+` is
/// accepted, and the bare string `0` is the only expression allowed to omit its unit.
///
/// # Errors
///
/// If the expression is empty, negative, missing a unit, uses an unknown unit, or does not fit in 63 bits of
/// nanoseconds, an error describing the problem is returned.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let mut remaining = input.trim();
    if remaining.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    if let Some(rest) = remaining.strip_prefix('+') {
        remaining = rest;
    } else if remaining.starts_with('-') {
        return Err(format!("negative duration '{}' is not supported", input));
    }

    if remaining == "0" {
        return Ok(Duration::ZERO);
    }

    if remaining.is_empty() {
        return Err(format!("invalid duration '{}'", input));
    }

    let mut total_ns: u128 = 0;
    while !remaining.is_empty() {
        let (whole, rest) = split_digits(remaining);
        let (fraction, rest) = match rest.strip_prefix('.') {
            Some(after_dot) => split_digits(after_dot),
            None => ("", rest),
        };

        // ".s" is not a number, but "1." and ".5" both are.
        if whole.is_empty() && fraction.is_empty() {
            return Err(format!("invalid duration '{}'", input));
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (unit, rest) = rest.split_at(unit_len);
        if unit.is_empty() {
            return Err(format!("missing unit in duration '{}'", input));
        }

        let unit_ns = unit_to_nanos(unit).ok_or_else(|| format!("unknown unit '{}' in duration '{}'", unit, input))?;
        let term_ns = term_to_nanos(whole, fraction, unit_ns).ok_or_else(|| out_of_range(input))?;
        total_ns = total_ns.checked_add(term_ns).ok_or_else(|| out_of_range(input))?;

        remaining = rest;
    }

    u64::try_from(total_ns)
        .ok()
        .filter(|ns| *ns <= i64::MAX as u64)
        .map(Duration::from_nanos)
        .ok_or_else(|| out_of_range(input))
}

fn split_digits(s: &str) -> (&str, &str) {
    let len = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(len)
}

fn unit_to_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(60 * NANOS_PER_SECOND),
        "h" => Some(3600 * NANOS_PER_SECOND),
        _ => None,
    }
}

fn term_to_nanos(whole: &str, fraction: &str, unit_ns: u128) -> Option<u128> {
    let whole_value: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut term_ns = whole_value.checked_mul(unit_ns)?;

    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    if !fraction.is_empty() {
        let fraction_value: u128 = fraction.parse().ok()?;
        let scale = 10u128.pow(fraction.len() as u32);
        term_ns = term_ns.checked_add(fraction_value * unit_ns / scale)?;
    }

    Some(term_ns)
}

fn out_of_range(input: &str) -> String {
    format!("duration '{}' is out of range", input)
}
