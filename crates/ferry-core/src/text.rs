//! Small text helpers shared across the Ferry crates.

use std::borrow::Cow;

/// Truncate `s` to at most `max_chars` characters, appending `suffix` when
/// anything was cut.
///
/// Counts `char`s rather than bytes so multibyte input never splits a
/// codepoint.
#[must_use]
pub fn truncate_chars<'a>(s: &'a str, max_chars: usize, suffix: &str) -> Cow<'a, str> {
    match s.char_indices().nth(max_chars) {
        None => Cow::Borrowed(s),
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + suffix.len());
            out.push_str(&s[..byte_idx]);
            out.push_str(suffix);
            Cow::Owned(out)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
