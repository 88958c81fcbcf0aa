//! Storage key fragments from free-text event names.

use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_]+").unwrap());

/// Convert arbitrary text into a lowercase, whitespace-free key fragment.
///
/// Drops everything except word characters, whitespace and hyphens,
/// lowercases, trims, then collapses whitespace/underscore runs into one
/// hyphen. Capitals with no lowercase form (`ϒ`, mathematical bold) are
/// dropped. Never fails; empty input gives an empty token.
pub fn sanitize_filename(name: &str) -> String {
    let stripped = DISALLOWED.replace_all(name, "");
    let lowered: String = stripped
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_uppercase())
        .collect();
    SEPARATORS.replace_all(lowered.trim(), "-").into_owned()
}
