//! Builds the compact JSON payload sent to the model.
//!
//! The payload trims raw page signals to a bounded size and flattens any
//! embedded JSON data layer into one-line records the model can read.

use serde::Serialize;
use serde_json::Value;

use portscout_shared::PageSignals;

const MAX_ANCHOR_HINTS: usize = 300;
const MAX_BLOCKS: usize = 250;
const MAX_DOM_CHUNKS: usize = 80;
const MAX_STRUCTURED_RECORDS: usize = 200;

/// Nesting depth beyond which the data-layer walk stops.
const MAX_JSON_DEPTH: usize = 8;

/// Keys that mark an object as a company-like record.
const NAME_FIELDS: &[&str] = &["name", "companyName", "company_name", "title", "companyname"];

/// CMS bookkeeping keys left out of flattened records.
const SKIP_FIELDS: &[&str] = &[
    "_createdAt",
    "_updatedAt",
    "_rev",
    "_id",
    "_key",
    "_system",
    "_type",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorHint {
    pub text: String,
    /// Last path segment of the link target (often a company slug).
    pub hint: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionPayload {
    pub anchor_hints: Vec<AnchorHint>,
    pub blocks: Vec<String>,
    pub dom_chunks: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub structured_data: Vec<String>,
}

impl ExtractionPayload {
    pub fn from_signals(signals: &PageSignals) -> Self {
        let anchor_hints = signals
            .anchors
            .iter()
            .filter_map(|a| {
                let text = a.text.trim();
                let href = a.href.trim();
                if text.is_empty() && href.is_empty() {
                    return None;
                }
                Some(AnchorHint {
                    text: text.to_string(),
                    hint: href_hint(href),
                })
            })
            .take(MAX_ANCHOR_HINTS)
            .collect();

        let mut structured_data = Vec::new();
        for doc in &signals.structured_json {
            collect_records(doc, 0, &mut structured_data);
        }
        structured_data.truncate(MAX_STRUCTURED_RECORDS);

        Self {
            anchor_hints,
            blocks: signals.text_blocks.iter().take(MAX_BLOCKS).cloned().collect(),
            dom_chunks: signals.dom_records.iter().take(MAX_DOM_CHUNKS).cloned().collect(),
            structured_data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor_hints.is_empty()
            && self.blocks.is_empty()
            && self.dom_chunks.is_empty()
            && self.structured_data.is_empty()
    }
}

fn href_hint(href: &str) -> String {
    if !href.contains('/') {
        return String::new();
    }
    href.trim_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Walk embedded JSON looking for arrays of objects that carry a name field.
fn collect_records(value: &Value, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_JSON_DEPTH {
        return;
    }

    match value {
        Value::Object(map) => {
            for child in map.values() {
                collect_records(child, depth + 1, out);
            }
        }
        Value::Array(items) => {
            let Some(Value::Object(first)) = items.first() else {
                return;
            };
            if NAME_FIELDS.iter().any(|f| first.contains_key(*f)) {
                out.extend(items.iter().filter_map(flatten_record));
            } else {
                for item in items.iter().filter(|i| i.is_object()) {
                    collect_records(item, depth + 1, out);
                }
            }
        }
        _ => {}
    }
}

/// `key: value | key: value` over the non-empty string fields of an object.
fn flatten_record(item: &Value) -> Option<String> {
    let map = item.as_object()?;
    let parts: Vec<String> = map
        .iter()
        .filter(|(k, _)| !SKIP_FIELDS.contains(&k.as_str()))
        .filter_map(|(k, v)| {
            let s = v.as_str()?;
            (!s.trim().is_empty()).then(|| format!("{k}: {s}"))
        })
        .collect();

    (!parts.is_empty()).then(|| parts.join(" | "))
}
