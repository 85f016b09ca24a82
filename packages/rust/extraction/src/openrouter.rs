//! OpenRouter chat-completions extractor.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use portscout_core::domain::investor_name_from;
use portscout_core::{SeedExtractor, SourceUrl};
use portscout_shared::{
    CompanySeed, ExternalError, LlmSettings, PageSignals, Result, ScoutError, SecretString,
};

use crate::payload::ExtractionPayload;
use crate::repair::parse_array;

const MAX_TOKENS: u32 = 8000;

const SYSTEM_PROMPT: &str = "\
You are an expert portfolio page parser.

GOAL:
Extract ALL portfolio company names that appear on this investor page.

IMPORTANT:
- Companies may appear as cards, tiles, grids, tables, or repeated links
- Many companies are represented only by anchor links
- Anchor text OR anchor hint may represent the company name
- Repeated anchor patterns usually indicate portfolio companies
- structured_data contains records extracted from the page's data layer \
(look for name, companyName, or title fields for company names, and website fields for URLs)

STRICT RULES:
- Do NOT invent companies
- Do NOT guess from context alone
- If a company is not clearly present, exclude it
- Deduplicate aggressively

OUTPUT FORMAT:
Return ONLY a JSON ARRAY:
[
  {\"company_name\": \"Company Name\", \"company_website\": \"\"}
]

If website is unknown, use empty string.
NO explanations. NO extra text.";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Extracts company seeds by asking an OpenRouter-hosted model.
pub struct OpenRouterExtractor {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
}

impl OpenRouterExtractor {
    pub fn new(settings: &LlmSettings, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    /// Extract seeds for the page at `source`.
    ///
    /// A page with no usable signals is answered without calling the model.
    #[instrument(skip_all, fields(url = %source))]
    pub async fn extract_seeds(
        &self,
        source: &Url,
        signals: &PageSignals,
    ) -> std::result::Result<Vec<CompanySeed>, ExternalError> {
        let payload = ExtractionPayload::from_signals(signals);
        if payload.is_empty() {
            debug!("no signals to extract from");
            return Ok(Vec::new());
        }

        let user_content = serde_json::to_string(&payload)
            .map_err(|e| ExternalError::BadRequest(format!("payload serialization: {e}")))?;

        let reply = self.complete(&user_content).await?;
        let seeds = parse_seeds(&reply);

        info!(
            investor = %investor_name_from(source),
            anchors = payload.anchor_hints.len(),
            records = payload.structured_data.len(),
            seeds = seeds.len(),
            "extraction complete"
        );
        Ok(seeds)
    }

    async fn complete(&self, user_content: &str) -> std::result::Result<String, ExternalError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: 0.0,
            max_tokens: MAX_TOKENS,
        };

        debug!(model = %self.model, "OpenRouter chat request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .header("X-Title", "portscout")
            .json(&request)
            .send()
            .await
            .map_err(|e| ExternalError::from_reqwest(&e, "openrouter"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExternalError::from_status(status.as_u16(), "openrouter"));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExternalError::from_reqwest(&e, "openrouter"))?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ExternalError::MalformedResponse(format!("openrouter: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl SeedExtractor for OpenRouterExtractor {
    async fn extract(
        &self,
        source: &SourceUrl,
        signals: &PageSignals,
    ) -> std::result::Result<Vec<CompanySeed>, ExternalError> {
        self.extract_seeds(source.as_url(), signals).await
    }
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

/// Turn a model reply into seeds: trimmed names, blanks dropped,
/// case-insensitive dedup in reply order, websites forced to `https://`.
pub fn parse_seeds(reply: &str) -> Vec<CompanySeed> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for item in parse_array(reply) {
        let name = item
            .get("company_name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim();
        if name.is_empty() || !seen.insert(name.to_lowercase()) {
            continue;
        }

        let website = item
            .get("company_website")
            .and_then(|v| v.as_str())
            .map(normalize_website)
            .unwrap_or_default();

        seeds.push(CompanySeed::new(name, website));
    }
    seeds
}

/// Force an `https://` scheme; empty stays empty.
pub fn normalize_website(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        String::new()
    } else if let Some(rest) = raw.strip_prefix("http://") {
        format!("https://{rest}")
    } else if raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}
