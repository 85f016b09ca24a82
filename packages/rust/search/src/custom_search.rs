//! Google Programmable Search (Custom Search JSON API) client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, instrument};

use portscout_core::WebSearch;
use portscout_shared::{ExternalError, Result, SearchEngineSettings, SearchHit, SecretString};

use crate::{build_client, decode_json};

/// The API refuses larger pages.
const MAX_RESULTS: u32 = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// Absent when the query has no results.
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

/// Custom Search client bound to one search engine (`cx`).
pub struct CustomSearchClient {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    cx: String,
    results: u32,
}

impl CustomSearchClient {
    pub fn new(
        settings: &SearchEngineSettings,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            cx: settings.cx.clone(),
            results: settings.results.clamp(1, MAX_RESULTS),
        })
    }
}

#[async_trait]
impl WebSearch for CustomSearchClient {
    #[instrument(skip_all, fields(query = %query))]
    async fn search(&self, query: &str) -> std::result::Result<Vec<SearchHit>, ExternalError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.expose_secret()),
                ("cx", self.cx.as_str()),
                ("q", query),
                ("num", self.results.to_string().as_str()),
            ])
            .send()
            .await;

        let parsed: SearchResponse = decode_json(response, "custom search").await?;
        let hits: Vec<SearchHit> = parsed
            .items
            .into_iter()
            .filter(|item| !item.link.trim().is_empty())
            .map(|item| SearchHit {
                url: item.link,
                title: item.title,
                snippet: item.snippet,
            })
            .collect();

        debug!(results = hits.len(), "custom search complete");
        Ok(hits)
    }
}
