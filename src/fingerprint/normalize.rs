use std::collections::BTreeSet;

/// Collapse runs of whitespace and trim. Returns `None` when nothing is left.
pub fn normalize_text(raw: &str) -> Option<String> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Trimmed attribute value, or `None` for missing/blank attributes.
pub fn attribute_value(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Split a `class` attribute into its token set.
pub fn class_tokens(raw: Option<&str>) -> BTreeSet<String> {
    raw.unwrap_or("")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
