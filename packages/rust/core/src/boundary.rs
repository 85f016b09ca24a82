//! Contracts between the enrichment engine and its external collaborators.
//!
//! Every network- or disk-touching dependency of the engine sits behind one of
//! these traits so the engine can be driven by in-memory fakes in tests.

use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;

use portscout_shared::{
    CompanySeed, EntityHit, ExternalError, PageSignals, PipelineRecord, Result, SearchHit,
};

use crate::validator::SourceUrl;

/// Fetches a validated page and returns its raw signals.
#[async_trait]
pub trait PageCrawler: Send + Sync {
    /// Never fails: a crawl failure is reported as `PageSignals::default()`.
    async fn crawl(&self, url: &SourceUrl, timeout: Duration) -> PageSignals;
}

/// Turns raw page signals into candidate companies.
#[async_trait]
pub trait SeedExtractor: Send + Sync {
    async fn extract(
        &self,
        source: &SourceUrl,
        signals: &PageSignals,
    ) -> std::result::Result<Vec<CompanySeed>, ExternalError>;
}

/// General web search.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> std::result::Result<Vec<SearchHit>, ExternalError>;
}

/// Entity lookup by name.
#[async_trait]
pub trait KnowledgeGraph: Send + Sync {
    async fn lookup(&self, name: &str) -> std::result::Result<Vec<EntityHit>, ExternalError>;
}

/// Append-only destination for finished records.
///
/// Appending the same record twice must not corrupt earlier rows.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn append(&self, record: &PipelineRecord) -> Result<()>;
}

/// Durable view over the source URLs that already have output.
pub trait ProcessedSource: Send + Sync {
    fn load_processed(&self) -> Result<HashSet<String>>;
}

/// DNS lookup used by the URL validator.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the system DNS configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}
