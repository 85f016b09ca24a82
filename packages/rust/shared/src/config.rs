//! Application configuration for portscout.
//!
//! User config lives at `~/.portscout/portscout.toml`.
//! CLI flags override config file values, which override defaults.
//! The file only ever names environment variables; secret values are read
//! once at startup by [`crate::Settings::resolve`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoutError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "portscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".portscout";

// ---------------------------------------------------------------------------
// Config structs (matching portscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// LLM used for company extraction.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Company-website lookup (Knowledge Graph + Custom Search).
    #[serde(default)]
    pub company_search: CompanySearchConfig,

    /// Deal-article search.
    #[serde(default)]
    pub deal_search: DealSearchConfig,

    /// Optional relational mirror of the output rows.
    #[serde(default)]
    pub mirror: MirrorConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Keyword and domain lists used by the resolver and the article scorer.
    #[serde(default)]
    pub heuristics: HeuristicsConfig,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// CSV with one source URL per row.
    #[serde(default = "default_input_file")]
    pub input_file: String,

    /// Append-only CSV output (also the resume checkpoint).
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Per-page crawl timeout.
    #[serde(default = "default_crawl_timeout")]
    pub crawl_timeout_secs: u64,

    /// Timeout for knowledge-graph lookups.
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,

    /// Timeout for search API calls.
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,

    /// Timeout for a single LLM extraction call.
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout_secs: u64,

    /// User agent sent by the crawler and the API clients.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_file: default_input_file(),
            output_file: default_output_file(),
            crawl_timeout_secs: default_crawl_timeout(),
            lookup_timeout_secs: default_lookup_timeout(),
            search_timeout_secs: default_search_timeout(),
            llm_timeout_secs: default_llm_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_input_file() -> String {
    "input_urls.csv".into()
}
fn default_output_file() -> String {
    "output/output.csv".into()
}
fn default_crawl_timeout() -> u64 {
    30
}
fn default_lookup_timeout() -> u64 {
    10
}
fn default_search_timeout() -> u64 {
    20
}
fn default_llm_timeout() -> u64 {
    120
}
fn default_user_agent() -> String {
    concat!("portscout/", env!("CARGO_PKG_VERSION")).into()
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for extraction.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_openrouter_base")]
    pub base_url: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            base_url: default_openrouter_base(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_openrouter_base() -> String {
    "https://openrouter.ai/api/v1".into()
}

/// `[company_search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySearchConfig {
    /// Env var with the Google API key (enables the Knowledge Graph lookup).
    #[serde(default = "default_company_key_env")]
    pub api_key_env: String,

    /// Env var with the Custom Search engine id (enables the search fallback).
    #[serde(default = "default_company_cse_env")]
    pub cse_id_env: String,

    #[serde(default = "default_kg_endpoint")]
    pub knowledge_graph_endpoint: String,

    #[serde(default = "default_custom_search_endpoint")]
    pub custom_search_endpoint: String,

    /// Results requested from the search fallback.
    #[serde(default = "default_company_results")]
    pub results: u32,
}

impl Default for CompanySearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_company_key_env(),
            cse_id_env: default_company_cse_env(),
            knowledge_graph_endpoint: default_kg_endpoint(),
            custom_search_endpoint: default_custom_search_endpoint(),
            results: default_company_results(),
        }
    }
}

fn default_company_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_company_cse_env() -> String {
    "GOOGLE_CSE_ID".into()
}
fn default_kg_endpoint() -> String {
    "https://kgsearch.googleapis.com/v1/entities:search".into()
}
fn default_custom_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_company_results() -> u32 {
    5
}

/// `[deal_search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealSearchConfig {
    #[serde(default = "default_deal_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_deal_cx_env")]
    pub cx_env: String,

    #[serde(default = "default_custom_search_endpoint")]
    pub endpoint: String,

    /// Results requested per deal query (the API caps this at 10).
    #[serde(default = "default_deal_results")]
    pub results: u32,
}

impl Default for DealSearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_deal_key_env(),
            cx_env: default_deal_cx_env(),
            endpoint: default_custom_search_endpoint(),
            results: default_deal_results(),
        }
    }
}

fn default_deal_key_env() -> String {
    "GOOGLE_DEAL_API_KEY".into()
}
fn default_deal_cx_env() -> String {
    "GOOGLE_DEAL_CX".into()
}
fn default_deal_results() -> u32 {
    10
}

/// `[mirror]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Env var with the libSQL connection string (file path or remote URL).
    #[serde(default = "default_mirror_url_env")]
    pub url_env: String,

    /// Env var with the auth token for remote databases.
    #[serde(default = "default_mirror_token_env")]
    pub auth_token_env: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            url_env: default_mirror_url_env(),
            auth_token_env: default_mirror_token_env(),
        }
    }
}

fn default_mirror_url_env() -> String {
    "DATABASE_URL".into()
}
fn default_mirror_token_env() -> String {
    "LIBSQL_AUTH_TOKEN".into()
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per external call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    2_000
}
fn default_max_backoff_ms() -> u64 {
    60_000
}

/// `[heuristics]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicsConfig {
    /// Substrings that mark a website as belonging to a fund or a directory
    /// rather than to the portfolio company itself.
    #[serde(default = "default_fund_keywords")]
    pub fund_keywords: Vec<String>,

    /// Domains never accepted as a company's official website.
    #[serde(default = "default_aggregator_domains")]
    pub aggregator_domains: Vec<String>,

    /// Domains never returned as deal articles.
    #[serde(default = "default_blocked_domains")]
    pub blocked_domains: Vec<String>,

    #[serde(default = "default_high_value_domains")]
    pub high_value_domains: Vec<String>,

    #[serde(default = "default_low_value_domains")]
    pub low_value_domains: Vec<String>,

    #[serde(default = "default_deal_keywords")]
    pub deal_keywords: Vec<String>,

    #[serde(default = "default_news_segments")]
    pub news_segments: Vec<String>,

    #[serde(default = "default_non_article_segments")]
    pub non_article_segments: Vec<String>,

    #[serde(default = "default_non_article_extensions")]
    pub non_article_extensions: Vec<String>,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            fund_keywords: default_fund_keywords(),
            aggregator_domains: default_aggregator_domains(),
            blocked_domains: default_blocked_domains(),
            high_value_domains: default_high_value_domains(),
            low_value_domains: default_low_value_domains(),
            deal_keywords: default_deal_keywords(),
            news_segments: default_news_segments(),
            non_article_segments: default_non_article_segments(),
            non_article_extensions: default_non_article_extensions(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn default_fund_keywords() -> Vec<String> {
    strings(&[
        "portfolio", "fund", "capital", "partners", "equity", "invest", "ventures", "holdings",
        "kkr", "blackstone", "apollo", "advent", "crunchbase", "pitchbook", "bloomberg",
        "linkedin",
    ])
}

fn default_aggregator_domains() -> Vec<String> {
    strings(&[
        "linkedin.com", "crunchbase.com", "pitchbook.com", "bloomberg.com", "wikipedia.org",
        "glassdoor.com", "angel.co", "wellfound.com", "facebook.com", "twitter.com", "x.com",
        "instagram.com", "youtube.com", "techcrunch.com", "zoominfo.com", "dnb.com",
    ])
}

fn default_blocked_domains() -> Vec<String> {
    strings(&[
        "pitchbook.com",
        "prnewswire.com",
        "prweb.com",
        "preqin.com",
        "crunchbase.com",
        "linkedin.com",
        "find-and-update.company-information.service.gov.uk",
    ])
}

fn default_high_value_domains() -> Vec<String> {
    strings(&[
        "businesswire.com", "globenewswire.com", "reuters.com", "bloomberg.com", "ft.com",
        "wsj.com", "cnbc.com", "dealogic.com", "privateequitywire.co.uk", "pe-hub.com",
        "buyoutsinsider.com", "mergr.com", "techcrunch.com", "finsmes.com", "thesaasnews.com",
    ])
}

fn default_low_value_domains() -> Vec<String> {
    strings(&[
        "linkedin.com", "facebook.com", "twitter.com", "x.com", "instagram.com", "youtube.com",
        "reddit.com", "wikipedia.org", "google.com", "bing.com",
    ])
}

fn default_deal_keywords() -> Vec<String> {
    strings(&[
        "acqui", "merger", "deal", "takeover", "buyout", "divest", "acquisition", "purchase",
        "transaction", "completes", "announces", "agreement", "press-release", "news-release",
        "press_release", "newsrelease", "raises", "funding", "invest", "series-a", "series-b",
        "series-c", "secures", "closes", "growth-capital", "round",
    ])
}

fn default_news_segments() -> Vec<String> {
    strings(&["/news/", "/press/", "/media/", "/article/", "/stories/"])
}

fn default_non_article_segments() -> Vec<String> {
    strings(&["/category/", "/tag/", "/search", "/pub/dir/", "/profile/"])
}

fn default_non_article_extensions() -> Vec<String> {
    strings(&[".pdf", ".jpg", ".png", ".gif", ".txt", ".csv", ".zip"])
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.portscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.portscout/portscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ScoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ScoutError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| ScoutError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ScoutError::io(path, e))?;
    tracing::info!(?path, "created default config file");
    Ok(())
}
