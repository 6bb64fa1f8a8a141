//! Lenient conversions from raw page tokens to typed listing attributes.
//!
//! Every function here is total: unrecognized input yields `None` and never an error,
//! so a malformed cell on a listing page simply leaves the attribute unknown.

use std::sync::LazyLock;

use regex::Regex;

static RE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+-[0-9]+$").expect("invalid regex: property code"));

const TOP_FLOOR_MARKER: char = '>';

/// Accepts only a full `digits-digits` listing code.
pub fn parse_code(text: &str) -> Option<String> {
    RE_CODE.is_match(text).then(|| text.to_string())
}

/// Accepts only non-empty ASCII digit runs. Values that overflow `u32` are absent.
pub fn parse_integer(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Floors may carry a `>` marker on the top floor, e.g. `>3`.
pub fn parse_floor(text: &str) -> Option<u32> {
    parse_integer(text.trim_matches(TOP_FLOOR_MARKER))
}

/// A literal count, or the first matching category word.
///
/// Matching is by substring in priority order, so `"uno"` falls into the `"no"` bucket.
pub fn parse_balcony_count(text: &str) -> Option<u32> {
    if let Some(count) = parse_integer(text) {
        return Some(count);
    }

    let lower = text.to_lowercase();
    if lower.contains("no") || lower.contains("assente") {
        Some(0)
    } else if lower.contains("si") || lower.contains("uno") {
        Some(1)
    } else if lower.contains("due") {
        Some(2)
    } else if lower.contains("tre") {
        Some(3)
    } else {
        None
    }
}

/// `si` means present, `no`/`assente` absent, anything else unknown.
pub fn parse_tri_state(text: &str) -> Option<bool> {
    let lower = text.to_lowercase();
    if lower.contains("si") {
        Some(true)
    } else if lower.contains("no") || lower.contains("assente") {
        Some(false)
    } else {
        None
    }
}
