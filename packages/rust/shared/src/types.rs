//! Core domain types flowing through the enrichment pipeline.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Crawl signals
// ---------------------------------------------------------------------------

/// A link found on a portfolio page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    /// Visible link text (or image alt text when the text is too short).
    pub text: String,
    /// Absolute target URL, or the raw `href` when it could not be resolved.
    pub href: String,
}

/// Raw page signals returned by the crawl boundary.
///
/// The default value doubles as the crawl-failure sentinel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSignals {
    /// Whitespace-collapsed visible text of the page.
    pub page_text: String,
    /// Deduplicated anchors.
    pub anchors: Vec<Anchor>,
    /// Mid-sized text blocks (cards, list items, sections).
    pub text_blocks: Vec<String>,
    /// Text of tabular DOM regions.
    pub dom_records: Vec<String>,
    /// JSON documents embedded in the page or served by its data endpoints.
    pub structured_json: Vec<serde_json::Value>,
}

impl PageSignals {
    /// True when the crawl produced nothing an extractor could use.
    pub fn is_empty(&self) -> bool {
        self.page_text.is_empty()
            && self.anchors.is_empty()
            && self.text_blocks.is_empty()
            && self.dom_records.is_empty()
            && self.structured_json.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

/// A candidate company produced by the extraction boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySeed {
    /// Company name (never empty once accepted by the pipeline).
    pub name: String,
    /// Website as extracted, or an empty string.
    pub website: String,
    /// Raw extraction context (e.g. the anchor text the name came from).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl CompanySeed {
    pub fn new(name: impl Into<String>, website: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            website: website.into(),
            hint: None,
        }
    }
}

/// Which mechanism supplied a company's final website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// The website the extractor returned was accepted as-is.
    Llm,
    KnowledgeGraph,
    CustomSearch,
    /// Nothing usable was found; the website is empty.
    None,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::KnowledgeGraph => "knowledge_graph",
            Self::CustomSearch => "custom_search",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A seed together with its resolved website.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCompany {
    pub seed: CompanySeed,
    /// Final website; empty when `source` is [`ResolutionSource::None`].
    pub website: String,
    pub source: ResolutionSource,
}

impl ResolvedCompany {
    pub fn name(&self) -> &str {
        &self.seed.name
    }
}

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// One organic result from a web search.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

impl SearchHit {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// One entity from a knowledge-graph lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityHit {
    /// Entity display name.
    pub name: String,
    /// The entity's own website field.
    pub url: Option<String>,
    /// URL attached to the entity's detailed description.
    pub description_url: Option<String>,
}

impl EntityHit {
    /// Candidate websites in preference order.
    pub fn websites(&self) -> impl Iterator<Item = &str> {
        [self.url.as_deref(), self.description_url.as_deref()]
            .into_iter()
            .flatten()
            .filter(|w| !w.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Deal articles
// ---------------------------------------------------------------------------

/// A ranked news/press URL about a deal involving a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealArticle {
    pub url: String,
    pub score: i32,
}

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

/// Maximum number of article columns in an output row.
pub const MAX_ARTICLES: usize = 3;

/// The persisted output row, one per (source URL, company).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub source_url: String,
    pub investor_name: String,
    pub investor_website: String,
    pub company_name: String,
    pub company_website: String,
    pub article_1: String,
    pub article_2: String,
    pub article_3: String,
}

impl PipelineRecord {
    /// Column order of the output table.
    pub const COLUMNS: [&'static str; 8] = [
        "source_url",
        "investor_name",
        "investor_website",
        "company_name",
        "company_website",
        "article_1",
        "article_2",
        "article_3",
    ];

    /// Fill the article columns from a ranked list (extra entries are ignored).
    pub fn with_articles(mut self, articles: &[DealArticle]) -> Self {
        let mut urls = articles.iter().take(MAX_ARTICLES).map(|a| a.url.clone());
        self.article_1 = urls.next().unwrap_or_default();
        self.article_2 = urls.next().unwrap_or_default();
        self.article_3 = urls.next().unwrap_or_default();
        self
    }

    /// Number of non-empty article columns.
    pub fn article_count(&self) -> usize {
        [&self.article_1, &self.article_2, &self.article_3]
            .iter()
            .filter(|a| !a.is_empty())
            .count()
    }
}
