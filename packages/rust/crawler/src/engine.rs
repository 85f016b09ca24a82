//! HTTP crawl adapter.
//!
//! Fetches one portfolio page, extracts its signals, and probes the Gatsby
//! page-data endpoint for structured JSON. Failures never escape: the crawl
//! boundary reports them as empty signals.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::{debug, info, instrument, warn};
use url::Url;

use portscout_core::validator::check_static;
use portscout_core::{PageCrawler, SourceUrl};
use portscout_shared::{PageSignals, Result, ScoutError};

use crate::signals::{extract_signals, gatsby_page_data_url};

/// Maximum redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Timeout for the page-data probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Crawler configuration.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub user_agent: String,
    /// Upper bound for the page fetch; the pipeline passes its own per call.
    pub timeout: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("portscout/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Plain-HTTP page crawler.
pub struct HttpCrawler {
    client: Client,
}

impl HttpCrawler {
    /// Create a new crawler with the given configuration.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(redirect_policy())
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Crawl `url`, turning any failure into empty signals.
    pub async fn crawl_url(&self, url: &Url, timeout: Duration) -> PageSignals {
        match self.fetch_signals(url, timeout).await {
            Ok(signals) => signals,
            Err(e) => {
                warn!(%url, error = %e, "crawl failed");
                PageSignals::default()
            }
        }
    }

    /// Fetch `url` and extract its signals, plus any page-data JSON.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_signals(&self, url: &Url, timeout: Duration) -> Result<PageSignals> {
        debug!("fetching page");

        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ScoutError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::Network(format!("{url}: HTTP {status}")));
        }

        // Redirects may land elsewhere; relative links resolve against the final URL.
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| ScoutError::Network(format!("{url}: body read failed: {e}")))?;

        let mut signals = extract_signals(&body, &final_url);

        if let Some(data) = self.probe_page_data(url).await {
            signals.structured_json.push(data);
        }

        info!(
            anchors = signals.anchors.len(),
            blocks = signals.text_blocks.len(),
            tables = signals.dom_records.len(),
            json = signals.structured_json.len(),
            "page crawled"
        );
        Ok(signals)
    }

    /// GET the Gatsby page-data document; any failure means "not there".
    async fn probe_page_data(&self, url: &Url) -> Option<serde_json::Value> {
        let endpoint = gatsby_page_data_url(url)?;
        let response = self
            .client
            .get(endpoint.as_str())
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .ok()?;

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        if !response.status().is_success() || !is_json {
            return None;
        }

        let data = response.json::<serde_json::Value>().await.ok()?;
        debug!(%endpoint, "page-data endpoint found");
        Some(data)
    }
}

#[async_trait]
impl PageCrawler for HttpCrawler {
    async fn crawl(&self, url: &SourceUrl, timeout: Duration) -> PageSignals {
        self.crawl_url(url.as_url(), timeout).await
    }
}

/// Follow up to [`MAX_REDIRECTS`] redirects, refusing hops that the static URL
/// checks reject (internal host names, non-public IP literals, non-HTTP schemes).
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        if is_unsafe_redirect(attempt.url()) {
            warn!(target_url = %attempt.url(), "refusing unsafe redirect");
            return attempt.stop();
        }
        attempt.follow()
    })
}

fn is_unsafe_redirect(url: &Url) -> bool {
    check_static(url.as_str()).is_err()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PORTFOLIO: &str = r#"<html><body>
        <h1>Portfolio</h1>
        <div class="grid">
          <a href="/companies/acme"><img src="acme.svg" alt="Acme Corp"></a>
          <a href="https://betalabs.io">Beta Labs</a>
        </div>
    </body></html>"#;

    fn crawler() -> HttpCrawler {
        HttpCrawler::new(&CrawlerConfig::default()).unwrap()
    }

    #[test]
    fn redirect_safety() {
        let unsafe_targets = [
            "http://127.0.0.1/",
            "http://169.254.169.254/latest/meta-data/",
            "http://[::1]/",
            "file:///etc/passwd",
            "http://localhost:8080/admin",
            "http://metadata.google.internal/computeMetadata/v1/",
            "http://printer.local/",
            "https://db.corp.internal/",
        ];
        for target in unsafe_targets {
            assert!(is_unsafe_redirect(&Url::parse(target).unwrap()), "{target}");
        }
        assert!(!is_unsafe_redirect(&Url::parse("https://examplepe.com/p").unwrap()));
        assert!(!is_unsafe_redirect(&Url::parse("https://93.184.216.34/").unwrap()));
    }

    #[tokio::test]
    async fn crawls_page_and_page_data() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/portfolio"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PORTFOLIO))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/page-data/portfolio/page-data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"data": {"companies": [{"name": "Gamma AI"}]}}
            })))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/portfolio", server.uri())).unwrap();
        let signals = crawler()
            .fetch_signals(&url, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(signals.anchors.len(), 2);
        assert_eq!(signals.anchors[0].text, "Acme Corp");
        assert_eq!(
            signals.anchors[0].href,
            format!("{}/companies/acme", server.uri())
        );
        assert_eq!(signals.structured_json.len(), 1);
        assert_eq!(
            signals.structured_json[0]["result"]["data"]["companies"][0]["name"],
            "Gamma AI"
        );
    }

    #[tokio::test]
    async fn non_json_page_data_is_ignored() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PORTFOLIO))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/page-data/index/page-data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not found</html>"))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let signals = crawler()
            .fetch_signals(&url, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(signals.structured_json.is_empty());
        assert!(!signals.is_empty());
    }

    #[tokio::test]
    async fn http_errors_become_empty_signals() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/portfolio"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/portfolio", server.uri())).unwrap();
        let c = crawler();
        assert!(c.fetch_signals(&url, Duration::from_secs(5)).await.is_err());
        assert!(c.crawl_url(&url, Duration::from_secs(5)).await.is_empty());
    }
}
