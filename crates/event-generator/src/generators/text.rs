//! Hex, digit and pattern string generators.
//!
//! Pattern placeholders:
//! - `{uuid}` - random UUID v4
//! - `{rand:N}` - N random decimal digits
//! - `{hex:N}` - N random lowercase hex characters

use rand::Rng;

use super::uuid::generate_uuid_v4;

const HEX_CHARS: &[u8] = b"0123456789abcdef";

/// Generate a lowercase hex string of exactly `length` characters.
pub fn generate_hex<R: Rng>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| HEX_CHARS[rng.gen_range(0..16)] as char)
        .collect()
}

/// Generate a string of exactly `length` decimal digits.
pub fn generate_digits<R: Rng>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Expand a pattern string.
pub fn generate_pattern<R: Rng>(pattern: &str, rng: &mut R) -> String {
    let mut result = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(start) = rest.find('{') {
        result.push_str(&rest[..start]);
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let end = start + len;
        let placeholder = &rest[start + 1..end];

        match expand_placeholder(placeholder, rng) {
            Some(expanded) => result.push_str(&expanded),
            // Unknown placeholders are kept verbatim
            None => result.push_str(&rest[start..=end]),
        }
        rest = &rest[end + 1..];
    }

    result.push_str(rest);
    result
}

/// Widths requested by the `{rand:N}` and `{hex:N}` placeholders of a pattern.
///
/// Widths too large for `usize` are reported as `usize::MAX`.
pub fn pattern_widths(pattern: &str) -> Vec<usize> {
    let mut widths = Vec::new();
    let mut rest = pattern;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let end = start + len;
        let placeholder = &rest[start + 1..end];
        let digits = placeholder
            .strip_prefix("rand:")
            .or_else(|| placeholder.strip_prefix("hex:"));
        if let Some(digits) = digits {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                widths.push(digits.parse().unwrap_or(usize::MAX));
            }
        }
        rest = &rest[end + 1..];
    }
    widths
}

fn expand_placeholder<R: Rng>(placeholder: &str, rng: &mut R) -> Option<String> {
    if placeholder == "uuid" {
        return Some(generate_uuid_v4(rng).hyphenated().to_string());
    }
    if let Some(digits) = placeholder.strip_prefix("rand:") {
        return digits.parse().ok().map(|n| generate_digits(rng, n));
    }
    if let Some(digits) = placeholder.strip_prefix("hex:") {
        return digits.parse().ok().map(|n| generate_hex(rng, n));
    }
    None
}
