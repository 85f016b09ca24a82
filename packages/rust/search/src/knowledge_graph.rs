//! Google Knowledge Graph Search API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, instrument};

use portscout_core::KnowledgeGraph;
use portscout_shared::{CompanySearchSettings, EntityHit, ExternalError, Result, SecretString};

use crate::{build_client, decode_json};

/// Entities requested per lookup.
const LOOKUP_LIMIT: &str = "5";

#[derive(Debug, Deserialize)]
struct EntitySearchResponse {
    #[serde(default, rename = "itemListElement")]
    items: Vec<EntityItem>,
}

#[derive(Debug, Deserialize)]
struct EntityItem {
    #[serde(default)]
    result: Option<EntityResult>,
}

#[derive(Debug, Deserialize)]
struct EntityResult {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "detailedDescription")]
    detailed_description: Option<DetailedDescription>,
}

#[derive(Debug, Deserialize)]
struct DetailedDescription {
    #[serde(default)]
    url: Option<String>,
}

/// Knowledge Graph entity lookup.
pub struct KnowledgeGraphClient {
    client: Client,
    endpoint: String,
    api_key: SecretString,
}

impl KnowledgeGraphClient {
    pub fn new(
        settings: &CompanySearchSettings,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            endpoint: settings.knowledge_graph_endpoint.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl KnowledgeGraph for KnowledgeGraphClient {
    #[instrument(skip_all, fields(name = %name))]
    async fn lookup(&self, name: &str) -> std::result::Result<Vec<EntityHit>, ExternalError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.expose_secret()),
                ("query", name),
                ("limit", LOOKUP_LIMIT),
            ])
            .send()
            .await;

        let parsed: EntitySearchResponse = decode_json(response, "knowledge graph").await?;
        let hits: Vec<EntityHit> = parsed
            .items
            .into_iter()
            .filter_map(|item| item.result)
            .map(|result| EntityHit {
                name: result.name,
                url: result.url,
                description_url: result.detailed_description.and_then(|d| d.url),
            })
            .collect();

        debug!(entities = hits.len(), "knowledge graph lookup complete");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> KnowledgeGraphClient {
        let settings = CompanySearchSettings {
            api_key: SecretString::from("kg-key"),
            knowledge_graph_endpoint: format!("{}/v1/entities:search", server.uri()),
            custom_search: None,
        };
        KnowledgeGraphClient::new(&settings, "portscout-test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn maps_entities() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("key", "kg-key"))
            .and(query_param("query", "Acme Corp"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "itemListElement": [
                    {"result": {"name": "Acme Corp", "url": "https://acmecorp.com"}, "resultScore": 120.5},
                    {"result": {
                        "name": "Acme Corporation",
                        "detailedDescription": {"url": "https://en.wikipedia.org/wiki/Acme"}
                    }},
                    {"resultScore": 1.0}
                ]
            })))
            .mount(&server)
            .await;

        let hits = client(&server).lookup("Acme Corp").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url.as_deref(), Some("https://acmecorp.com"));
        assert_eq!(hits[1].name, "Acme Corporation");
        assert!(hits[1].url.is_none());
        assert_eq!(
            hits[1].description_url.as_deref(),
            Some("https://en.wikipedia.org/wiki/Acme")
        );
    }

    #[tokio::test]
    async fn empty_response_has_no_entities() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        assert!(client(&server).lookup("Nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rate_limit_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client(&server).lookup("Acme").await.unwrap_err();
        assert!(matches!(err, ExternalError::RateLimited(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_connection_error() {
        let settings = CompanySearchSettings {
            api_key: SecretString::from("kg-key"),
            knowledge_graph_endpoint: "http://127.0.0.1:9/v1/entities:search".into(),
            custom_search: None,
        };
        let kg = KnowledgeGraphClient::new(&settings, "portscout-test", Duration::from_secs(2))
            .unwrap();
        let err = kg.lookup("Acme").await.unwrap_err();
        assert!(err.is_transient(), "{err}");
    }
}
