//! Search adapters for portscout.
//!
//! Two Google APIs back the search boundaries of the engine:
//! - [`CustomSearchClient`] (Programmable Search) implements [`portscout_core::WebSearch`]
//!   and serves both deal-article and company-website searches.
//! - [`KnowledgeGraphClient`] implements [`portscout_core::KnowledgeGraph`].
//!
//! Every call returns a classified [`ExternalError`] so the engine's retry
//! policy can tell transient failures from permanent ones.

mod custom_search;
mod knowledge_graph;

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use portscout_shared::{ExternalError, Result, ScoutError};

pub use custom_search::CustomSearchClient;
pub use knowledge_graph::KnowledgeGraphClient;

/// Maximum number of redirects to follow for API calls.
const MAX_REDIRECTS: usize = 3;

/// Build a reqwest client with appropriate settings.
fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .build()
        .map_err(|e| ScoutError::Network(format!("failed to build HTTP client: {e}")))
}

/// Check the status and decode a JSON body, classifying every failure.
async fn decode_json<T: DeserializeOwned>(
    response: std::result::Result<Response, reqwest::Error>,
    api: &str,
) -> std::result::Result<T, ExternalError> {
    let response = response.map_err(|e| ExternalError::from_reqwest(&e, api))?;

    let status = response.status();
    if !status.is_success() {
        debug!(api, %status, "API returned error status");
        return Err(ExternalError::from_status(status.as_u16(), api));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ExternalError::from_reqwest(&e, api))?;

    serde_json::from_str(&body)
        .map_err(|e| ExternalError::MalformedResponse(format!("{api}: {e}")))
}
