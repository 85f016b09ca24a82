//! In-memory fakes of every boundary trait, for engine tests.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use portscout_shared::{
    CompanySeed, EntityHit, ExternalError, PageSignals, PipelineRecord, Result, ScoutError,
    SearchHit,
};

use crate::boundary::{
    HostResolver, KnowledgeGraph, PageCrawler, ProcessedSource, RecordSink, SeedExtractor,
    WebSearch,
};
use crate::validator::SourceUrl;

// ---------------------------------------------------------------------------
// DNS
// ---------------------------------------------------------------------------

/// Resolver answering from a fixed table; unknown hosts fail to resolve.
#[derive(Clone, Default)]
pub struct StaticResolver {
    table: HashMap<String, Vec<IpAddr>>,
    lookups: Arc<AtomicUsize>,
}

impl StaticResolver {
    pub fn with(mut self, host: &str, ips: &[&str]) -> Self {
        let ips = ips.iter().filter_map(|ip| ip.parse().ok()).collect();
        self.table.insert(host.to_string(), ips);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn resolve(&self, host: &str, _port: u16) -> std::io::Result<Vec<IpAddr>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.table.get(host).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no such host {host}"))
        })
    }
}

// ---------------------------------------------------------------------------
// Crawl and extraction
// ---------------------------------------------------------------------------

/// Crawler serving canned signals per URL; unknown URLs crawl empty.
#[derive(Default)]
pub struct FakeCrawler {
    pages: Mutex<HashMap<String, PageSignals>>,
    calls: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeCrawler {
    pub fn set(&self, url: &str, signals: PageSignals) {
        self.pages.lock().unwrap().insert(url.to_string(), signals);
    }

    /// Make every crawl take `delay` before answering.
    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageCrawler for FakeCrawler {
    async fn crawl(&self, url: &SourceUrl, _timeout: Duration) -> PageSignals {
        self.calls.lock().unwrap().push(url.as_str().to_string());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.pages
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .unwrap_or_default()
    }
}

type SeedResult = std::result::Result<Vec<CompanySeed>, ExternalError>;

/// Extractor answering per source URL; unknown URLs yield no seeds.
#[derive(Default)]
pub struct FakeExtractor {
    answers: Mutex<HashMap<String, SeedResult>>,
    calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn set(&self, url: &str, answer: SeedResult) {
        self.answers.lock().unwrap().insert(url.to_string(), answer);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeedExtractor for FakeExtractor {
    async fn extract(&self, source: &SourceUrl, _signals: &PageSignals) -> SeedResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .get(source.as_str())
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ---------------------------------------------------------------------------
// Search and knowledge graph
// ---------------------------------------------------------------------------

/// Canned answers keyed by query, with an optional failure for every call.
struct Script<T> {
    answers: Mutex<HashMap<String, std::result::Result<Vec<T>, ExternalError>>>,
    failure: Option<ExternalError>,
    queries: Mutex<Vec<String>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            answers: Mutex::new(HashMap::new()),
            failure: None,
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> Script<T> {
    fn answer(&self, query: &str) -> std::result::Result<Vec<T>, ExternalError> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.answers
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
pub struct FakeSearch {
    script: Script<SearchHit>,
}

impl FakeSearch {
    pub fn with_results(self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.set(query, Ok(hits));
        self
    }

    pub fn failing_with(mut self, err: ExternalError) -> Self {
        self.script.failure = Some(err);
        self
    }

    pub fn set(&self, query: &str, answer: std::result::Result<Vec<SearchHit>, ExternalError>) {
        self.script.answers.lock().unwrap().insert(query.to_string(), answer);
    }

    pub fn queries(&self) -> Vec<String> {
        self.script.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for FakeSearch {
    async fn search(&self, query: &str) -> std::result::Result<Vec<SearchHit>, ExternalError> {
        self.script.answer(query)
    }
}

#[derive(Default)]
pub struct FakeKnowledgeGraph {
    script: Script<EntityHit>,
}

impl FakeKnowledgeGraph {
    pub fn with_results(self, name: &str, hits: Vec<EntityHit>) -> Self {
        self.script.answers.lock().unwrap().insert(name.to_string(), Ok(hits));
        self
    }

    pub fn failing_with(mut self, err: ExternalError) -> Self {
        self.script.failure = Some(err);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.script.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeGraph for FakeKnowledgeGraph {
    async fn lookup(&self, name: &str) -> std::result::Result<Vec<EntityHit>, ExternalError> {
        self.script.answer(name)
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Record sink kept in memory; doubles as the resume checkpoint.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<PipelineRecord>>,
    fail: bool,
}

impl MemorySink {
    /// A sink whose every write fails.
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn records(&self) -> Vec<PipelineRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn append(&self, record: &PipelineRecord) -> Result<()> {
        if self.fail {
            return Err(ScoutError::Storage("disk full".into()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

impl ProcessedSource for MemorySink {
    fn load_processed(&self) -> Result<HashSet<String>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.source_url.clone())
            .collect())
    }
}
