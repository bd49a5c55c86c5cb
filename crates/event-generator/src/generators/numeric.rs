//! Numeric value generators.

use rand::Rng;

/// Generate a random integer in the given range (inclusive).
pub fn generate_int_range<R: Rng>(rng: &mut R, min: i64, max: i64) -> i64 {
    if min >= max {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Generate a random float in the given range (inclusive).
///
/// Returns `min` when the span is empty or not representable.
pub fn generate_float_range<R: Rng>(rng: &mut R, min: f64, max: f64) -> f64 {
    if min >= max || !(max - min).is_finite() {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Format an amount held in minor units as a decimal string.
///
/// `format_minor_units(12345, 2)` is `"123.45"`.
pub fn format_minor_units(amount: i64, decimals: u32) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let scale = 10u64.pow(decimals);
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!(
        "{sign}{}.{:0width$}",
        abs / scale,
        abs % scale,
        width = decimals as usize
    )
}
