//! Small text helpers shared by the extraction engines.

use std::sync::LazyLock;

use regex::Regex;

/// Lower-case fragments of "reveal more" controls, in every language the
/// site is served in.
pub const LOAD_MORE_NEEDLES: &[&str] = &[
    "загрузить",
    "ещё",
    "еще",
    "показать",
    "load more",
    "show more",
];

/// Placeholder stored when a review has no readable body.
pub const MISSING_REVIEW_TEXT: &str = "[No review text found]";

const TRUNCATION_MARKERS: &[&str] = &[
    "...",
    "\u{2026}",
    "еще",
    "ещё",
    "целиком",
    "read more",
    "show more",
];

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// First run of ASCII digits in `text`, e.g. `"128"` from `"128 оценок"`.
#[must_use]
pub fn first_digit_run(text: &str) -> Option<&str> {
    DIGIT_RUN.find(text).map(|m| m.as_str())
}

/// Whether a review body looks cut off and offers a "read more" control.
#[must_use]
pub fn looks_truncated(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRUNCATION_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Percent-decode a URL for display, replacing invalid UTF-8.
#[must_use]
pub fn decode_link(url: &str) -> String {
    percent_encoding::percent_decode_str(url)
        .decode_utf8_lossy()
        .into_owned()
}
