//! HTML → [`PageSignals`] extraction.
//!
//! Pure functions over a parsed document; nothing here touches the network.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use portscout_shared::{Anchor, PageSignals};

/// Link text shorter than this falls back to an image's alt text.
const MIN_ANCHOR_TEXT: usize = 3;

/// Text blocks outside this size range are layout noise or whole-page wrappers.
const MIN_BLOCK_LEN: usize = 30;
const MAX_BLOCK_LEN: usize = 1500;

/// Extract every signal from an HTML body fetched from `base_url`.
pub fn extract_signals(html: &str, base_url: &Url) -> PageSignals {
    let doc = Html::parse_document(html);

    PageSignals {
        page_text: page_text(&doc),
        anchors: extract_anchors(&doc, base_url),
        text_blocks: extract_blocks(&doc),
        dom_records: extract_tables(&doc),
        structured_json: extract_embedded_json(&doc),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Whitespace-collapsed text of an element.
fn element_text(el: ElementRef<'_>) -> String {
    collapse(&el.text().collect::<Vec<_>>().join(" "))
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible body text, skipping script and style contents.
fn page_text(doc: &Html) -> String {
    let Some(body) = selector("body").and_then(|s| doc.select(&s).next()) else {
        return String::new();
    };

    let parts: Vec<&str> = body
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(|p| p.value().as_element().map(|e| e.name()));
            match parent {
                Some("script" | "style" | "noscript" | "template") => None,
                _ => Some(&**text),
            }
        })
        .collect();

    collapse(&parts.join(" "))
}

/// Anchors with resolved hrefs, deduplicated on (text, href).
pub fn extract_anchors(doc: &Html, base_url: &Url) -> Vec<Anchor> {
    let (Some(link_sel), Some(img_sel)) = (selector("a"), selector("img[alt]")) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut anchors = Vec::new();

    for el in doc.select(&link_sel) {
        let raw_href = el.value().attr("href").unwrap_or_default().trim();
        if raw_href.starts_with("javascript:") || raw_href.starts_with("mailto:") {
            continue;
        }

        let href = if raw_href.is_empty() || raw_href.starts_with('#') {
            raw_href.to_string()
        } else {
            base_url
                .join(raw_href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| raw_href.to_string())
        };

        let mut text = element_text(el);
        if text.chars().count() < MIN_ANCHOR_TEXT {
            if let Some(alt) = el
                .select(&img_sel)
                .filter_map(|img| img.value().attr("alt"))
                .map(str::trim)
                .find(|alt| !alt.is_empty())
            {
                text = alt.to_string();
            }
        }

        if text.is_empty() && href.is_empty() {
            continue;
        }
        if seen.insert((text.clone(), href.clone())) {
            anchors.push(Anchor { text, href });
        }
    }

    anchors
}

/// Mid-sized text blocks from cards, list items and sections, deduplicated.
pub fn extract_blocks(doc: &Html) -> Vec<String> {
    let Some(sel) = selector("article, li, section, div") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();

    doc.select(&sel)
        .map(element_text)
        .filter(|t| {
            let len = t.chars().count();
            len > MIN_BLOCK_LEN && len < MAX_BLOCK_LEN
        })
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Text of each table, deduplicated.
pub fn extract_tables(doc: &Html) -> Vec<String> {
    let Some(sel) = selector("table") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();

    doc.select(&sel)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Script bodies that parse as JSON (JSON-LD, hydration state, and so on).
pub fn extract_embedded_json(doc: &Html) -> Vec<serde_json::Value> {
    let Some(sel) = selector("script") else {
        return Vec::new();
    };

    doc.select(&sel)
        .filter_map(|script| {
            let body = script.text().collect::<String>();
            let body = body.trim();
            if !body.contains('{') {
                return None;
            }
            serde_json::from_str::<serde_json::Value>(body).ok()
        })
        .filter(|v| v.is_object() || v.is_array())
        .collect()
}

/// Gatsby's static data endpoint for the page at `url`.
pub fn gatsby_page_data_url(url: &Url) -> Option<Url> {
    let path = url.path().trim_matches('/');
    let path = if path.is_empty() { "index" } else { path };
    let origin = url.origin().ascii_serialization();
    Url::parse(&format!("{origin}/page-data/{path}/page-data.json")).ok()
}
