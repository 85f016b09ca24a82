//! Lightweight clean-up of LLM replies before JSON parsing.

use std::sync::LazyLock;

use regex::Regex;

/// Repair common LLM JSON mistakes: markdown fences, prose around the array,
/// trailing commas and unquoted keys.
pub fn repair_json(text: &str) -> String {
    static TRAILING_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r",(\s*[\]}])").expect("valid regex")
    });
    static BARE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"([{,])\s*([A-Za-z_][A-Za-z0-9_\- ]*)\s*:").expect("valid regex")
    });

    let unfenced = text.replace("```json", "").replace("```", "");
    let isolated = isolate_array(unfenced.trim());
    let fixed = TRAILING_COMMA_RE.replace_all(isolated, "$1");
    BARE_KEY_RE
        .replace_all(&fixed, |caps: &regex::Captures<'_>| {
            format!("{} \"{}\":", &caps[1], caps[2].trim())
        })
        .into_owned()
}

/// Slice from the first `[` to the last `]`, if both exist in that order.
fn isolate_array(text: &str) -> &str {
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Repair and parse a reply that should hold a JSON array.
///
/// Anything that is not an array after repair yields an empty list.
pub fn parse_array(text: &str) -> Vec<serde_json::Value> {
    match serde_json::from_str(&repair_json(text)) {
        Ok(serde_json::Value::Array(items)) => items,
        _ => Vec::new(),
    }
}
