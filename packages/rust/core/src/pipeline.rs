//! Per-URL enrichment pipeline: validate → crawl → extract → (resolve → score
//! → persist) per company.
//!
//! Each source URL ends in a [`UrlOutcome`]. Only `Fatal` (the primary output
//! store refusing a write) stops the batch; everything else is logged and the
//! run moves on.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use portscout_shared::{
    CompanySeed, PageSignals, PipelineRecord, ResolutionSource, Result, ScoutError,
};

use crate::boundary::{PageCrawler, RecordSink, SeedExtractor};
use crate::deals::DealFinder;
use crate::domain::{investor_name_from, investor_website_from};
use crate::resolver::WebsiteResolver;
use crate::resume::ResumeTracker;
use crate::retry::{CallOutcome, RetryPolicy, with_retry};
use crate::validator::{SourceUrl, UrlGuard};

/// Where a URL's processing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Crawling,
    Extracting,
    Resolving,
    Scoring,
    Persisting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validating => "validating",
            Self::Crawling => "crawling",
            Self::Extracting => "extracting",
            Self::Resolving => "resolving",
            Self::Scoring => "scoring",
            Self::Persisting => "persisting",
        })
    }
}

/// How one source URL ended.
#[derive(Debug)]
pub enum UrlOutcome {
    /// Every extracted company was persisted (possibly zero).
    Completed { companies: usize },
    /// Abandoned at `stage`; earlier companies of the URL may already be saved.
    Skipped { stage: Stage, reason: String },
    /// The batch cannot continue.
    Fatal(ScoutError),
}

/// Totals for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// URLs in the input, duplicates included.
    pub input: usize,
    /// URLs skipped because output already had them (or they repeated).
    pub already_processed: usize,
    pub completed: usize,
    pub skipped: usize,
    pub records: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called once the pending queue is known.
    fn run_started(&self, pending: usize, already_processed: usize);
    /// Called before a source URL is processed.
    fn url_started(&self, url: &str, current: usize, total: usize);
    /// Called after a record is written to the primary store.
    fn company_saved(&self, record: &PipelineRecord, source: ResolutionSource);
    /// Called when a source URL reaches its outcome.
    fn url_finished(&self, url: &str, outcome: &UrlOutcome);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn run_started(&self, _pending: usize, _already_processed: usize) {}
    fn url_started(&self, _url: &str, _current: usize, _total: usize) {}
    fn company_saved(&self, _record: &PipelineRecord, _source: ResolutionSource) {}
    fn url_finished(&self, _url: &str, _outcome: &UrlOutcome) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Collaborators wired into a [`Pipeline`].
#[derive(Clone)]
pub struct PipelineDeps {
    pub guard: UrlGuard,
    pub crawler: Arc<dyn PageCrawler>,
    pub extractor: Arc<dyn SeedExtractor>,
    pub resolver: WebsiteResolver,
    pub deals: DealFinder,
    /// Primary output store; also the resume checkpoint.
    pub primary: Arc<dyn RecordSink>,
    /// Optional relational mirror; failures are only logged.
    pub mirror: Option<Arc<dyn RecordSink>>,
}

/// Tunables for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub crawl_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            crawl_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// The enrichment engine.
pub struct Pipeline {
    deps: PipelineDeps,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps, options: PipelineOptions) -> Self {
        Self { deps, options }
    }

    /// Process every unprocessed URL of `input` in order, one at a time.
    ///
    /// Returns an error only when a URL ends `Fatal`.
    #[instrument(skip_all, fields(input = input.len()))]
    pub async fn run(
        &self,
        input: &[String],
        tracker: &mut ResumeTracker,
        progress: &dyn ProgressReporter,
    ) -> Result<RunSummary> {
        let start = Instant::now();
        let pending = tracker.filter(input);
        let mut summary = RunSummary {
            input: input.len(),
            already_processed: input.len() - pending.len(),
            ..Default::default()
        };

        info!(
            pending = pending.len(),
            already_processed = summary.already_processed,
            "starting enrichment run"
        );
        progress.run_started(pending.len(), summary.already_processed);

        let total = pending.len();
        for (i, url) in pending.iter().enumerate() {
            progress.url_started(url, i + 1, total);
            let outcome = self.process_url(url, progress).await;
            progress.url_finished(url, &outcome);

            match outcome {
                UrlOutcome::Completed { companies } => {
                    summary.completed += 1;
                    summary.records += companies;
                }
                UrlOutcome::Skipped { stage, reason } => {
                    warn!(url = %url, %stage, %reason, "skipped source url");
                    summary.skipped += 1;
                }
                UrlOutcome::Fatal(err) => {
                    summary.elapsed = start.elapsed();
                    progress.done(&summary);
                    return Err(err);
                }
            }
            tracker.mark_processed(url);
        }

        summary.elapsed = start.elapsed();
        progress.done(&summary);
        info!(
            completed = summary.completed,
            skipped = summary.skipped,
            records = summary.records,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "enrichment run complete"
        );
        Ok(summary)
    }

    /// Take one source URL through every stage.
    #[instrument(skip_all, fields(url = %raw))]
    pub async fn process_url(&self, raw: &str, progress: &dyn ProgressReporter) -> UrlOutcome {
        let source_url = raw.trim();

        // --- Validating ---
        let url = match self.deps.guard.validate(source_url).await {
            Ok(url) => url,
            Err(rejection) => {
                return UrlOutcome::Skipped {
                    stage: Stage::Validating,
                    reason: rejection.to_string(),
                };
            }
        };

        // --- Crawling ---
        let signals = self.crawl(&url).await;
        if signals.is_empty() {
            return UrlOutcome::Skipped {
                stage: Stage::Crawling,
                reason: "crawl returned no content".into(),
            };
        }

        // --- Extracting ---
        let seeds = match self.extract(&url, &signals).await {
            Ok(seeds) => seeds,
            Err(reason) => {
                return UrlOutcome::Skipped {
                    stage: Stage::Extracting,
                    reason,
                };
            }
        };
        info!(companies = seeds.len(), "extracted companies");

        let investor_name = investor_name_from(url.as_url());
        let investor_website = investor_website_from(url.as_url());
        let mut saved = 0;

        for seed in &seeds {
            // --- Resolving ---
            let company = self.deps.resolver.resolve(seed, url.host()).await;

            // --- Scoring ---
            let articles = match self
                .deps
                .deals
                .find_deal_articles(company.name(), &investor_name, &company.website)
                .await
            {
                Ok(articles) => articles,
                Err(err) => {
                    return UrlOutcome::Skipped {
                        stage: Stage::Scoring,
                        reason: format!("deal search failed for {}: {err}", company.name()),
                    };
                }
            };

            // --- Persisting ---
            let record = PipelineRecord {
                source_url: source_url.to_string(),
                investor_name: investor_name.clone(),
                investor_website: investor_website.clone(),
                company_name: company.name().to_string(),
                company_website: company.website.clone(),
                ..Default::default()
            }
            .with_articles(&articles);

            if let Err(err) = self.deps.primary.append(&record).await {
                return UrlOutcome::Fatal(err);
            }
            if let Some(mirror) = &self.deps.mirror {
                if let Err(err) = mirror.append(&record).await {
                    warn!(company = %record.company_name, error = %err, "mirror write failed");
                }
            }

            info!(
                company = %record.company_name,
                website = %record.company_website,
                source = %company.source,
                articles = record.article_count(),
                "saved company"
            );
            progress.company_saved(&record, company.source);
            saved += 1;
        }

        UrlOutcome::Completed { companies: saved }
    }

    async fn crawl(&self, url: &SourceUrl) -> PageSignals {
        let timeout = self.options.crawl_timeout;
        match tokio::time::timeout(timeout, self.deps.crawler.crawl(url, timeout)).await {
            Ok(signals) => signals,
            Err(_) => {
                warn!(url = %url, timeout_secs = timeout.as_secs(), "crawl timed out");
                PageSignals::default()
            }
        }
    }

    async fn extract(
        &self,
        url: &SourceUrl,
        signals: &PageSignals,
    ) -> std::result::Result<Vec<CompanySeed>, String> {
        let extractor = &self.deps.extractor;
        let outcome =
            with_retry(&self.options.retry, "extraction", || extractor.extract(url, signals)).await;

        match outcome {
            CallOutcome::Ok(seeds) => Ok(dedup_seeds(seeds)),
            CallOutcome::Exhausted(err) => Err(format!("extraction retries exhausted: {err}")),
            CallOutcome::Permanent(err) => Err(format!("extraction failed: {err}")),
        }
    }
}

/// Drop nameless seeds and repeats (case-insensitive), keeping first occurrences.
fn dedup_seeds(seeds: Vec<CompanySeed>) -> Vec<CompanySeed> {
    let mut seen = HashSet::new();
    seeds
        .into_iter()
        .filter_map(|mut seed| {
            seed.name = seed.name.trim().to_string();
            if seed.name.is_empty() || !seen.insert(seed.name.to_lowercase()) {
                return None;
            }
            Some(seed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use portscout_shared::{Anchor, ExternalError, HeuristicsConfig, SearchHit};

    use super::*;
    use crate::deals::ArticleScorer;
    use crate::testing::{
        FakeCrawler, FakeExtractor, FakeKnowledgeGraph, FakeSearch, MemorySink, StaticResolver,
    };

    const SOURCE: &str = "https://examplepe.com/portfolio";

    struct Harness {
        crawler: Arc<FakeCrawler>,
        extractor: Arc<FakeExtractor>,
        deal_search: Arc<FakeSearch>,
        kg: Arc<FakeKnowledgeGraph>,
        primary: Arc<MemorySink>,
        mirror: Arc<MemorySink>,
        resolver: StaticResolver,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                crawler: Arc::new(FakeCrawler::default()),
                extractor: Arc::new(FakeExtractor::default()),
                deal_search: Arc::new(FakeSearch::default()),
                kg: Arc::new(FakeKnowledgeGraph::default()),
                primary: Arc::new(MemorySink::default()),
                mirror: Arc::new(MemorySink::default()),
                resolver: StaticResolver::default()
                    .with("examplepe.com", &["93.184.216.34"])
                    .with("otherpe.com", &["93.184.216.35"])
                    .with("intranet.example.com", &["10.0.0.1"]),
            }
        }

        fn pipeline(&self) -> Pipeline {
            let heuristics = HeuristicsConfig::default();
            let retry = RetryPolicy::default();
            let deps = PipelineDeps {
                guard: UrlGuard::new(Arc::new(self.resolver.clone())),
                crawler: self.crawler.clone(),
                extractor: self.extractor.clone(),
                resolver: WebsiteResolver::new(&heuristics, retry.clone())
                    .with_knowledge_graph(self.kg.clone()),
                deals: DealFinder::new(
                    self.deal_search.clone(),
                    ArticleScorer::new(&heuristics),
                    retry.clone(),
                ),
                primary: self.primary.clone(),
                mirror: Some(self.mirror.clone()),
            };
            Pipeline::new(
                deps,
                PipelineOptions {
                    crawl_timeout: Duration::from_secs(30),
                    retry,
                },
            )
        }
    }

    fn acme_page() -> PageSignals {
        PageSignals {
            anchors: vec![Anchor {
                text: "Acme Corp".into(),
                href: "https://acmecorp.com".into(),
            }],
            ..Default::default()
        }
    }

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    /// Records every progress callback.
    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn run_started(&self, pending: usize, already: usize) {
            self.push(format!("start {pending} {already}"));
        }
        fn url_started(&self, url: &str, current: usize, total: usize) {
            self.push(format!("url {current}/{total} {url}"));
        }
        fn company_saved(&self, record: &PipelineRecord, source: ResolutionSource) {
            self.push(format!("saved {} {source}", record.company_name));
        }
        fn url_finished(&self, _url: &str, outcome: &UrlOutcome) {
            self.push(match outcome {
                UrlOutcome::Completed { companies } => format!("done {companies}"),
                UrlOutcome::Skipped { stage, .. } => format!("skipped {stage}"),
                UrlOutcome::Fatal(_) => "fatal".into(),
            });
        }
        fn done(&self, summary: &RunSummary) {
            self.push(format!("summary {}", summary.records));
        }
    }

    impl RecordingProgress {
        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn end_to_end_acme_scenario() {
        let h = Harness::new();
        h.crawler.set(SOURCE, acme_page());
        h.extractor
            .set(SOURCE, Ok(vec![CompanySeed::new("Acme Corp", "acmecorp.com")]));
        h.deal_search.set(
            r#""Acme Corp" "Examplepe""#,
            Ok(vec![
                SearchHit::new("reuters.com/article/acme-merger"),
                SearchHit::new("linkedin.com/company/acme"),
            ]),
        );

        let mut tracker = ResumeTracker::default();
        let progress = RecordingProgress::default();
        let summary = h
            .pipeline()
            .run(&urls(&[SOURCE]), &mut tracker, &progress)
            .await
            .unwrap();

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.records, 1);

        let rows = h.primary.records();
        assert_eq!(
            rows,
            vec![PipelineRecord {
                source_url: SOURCE.into(),
                investor_name: "Examplepe".into(),
                investor_website: "https://examplepe.com".into(),
                company_name: "Acme Corp".into(),
                company_website: "acmecorp.com".into(),
                article_1: "reuters.com/article/acme-merger".into(),
                article_2: String::new(),
                article_3: String::new(),
            }]
        );
        assert_eq!(h.mirror.records(), rows);
        assert!(h.kg.queries().is_empty());
        assert!(tracker.is_processed(SOURCE));
        assert_eq!(
            progress.events(),
            vec![
                "start 1 0".to_string(),
                format!("url 1/1 {SOURCE}"),
                "saved Acme Corp llm".to_string(),
                "done 1".to_string(),
                "summary 1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn second_run_does_no_work() {
        let h = Harness::new();
        h.crawler.set(SOURCE, acme_page());
        h.extractor
            .set(SOURCE, Ok(vec![CompanySeed::new("Acme Corp", "acmecorp.com")]));
        let input = urls(&[SOURCE]);

        let mut tracker = ResumeTracker::load(h.primary.as_ref()).unwrap();
        h.pipeline()
            .run(&input, &mut tracker, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(h.primary.records().len(), 1);
        let crawls = h.crawler.calls().len();

        // Fresh tracker rebuilt from durable output, as on a restart.
        let mut tracker = ResumeTracker::load(h.primary.as_ref()).unwrap();
        let summary = h
            .pipeline()
            .run(&input, &mut tracker, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(summary.already_processed, 1);
        assert_eq!(summary.completed, 0);
        assert_eq!(h.primary.records().len(), 1);
        assert_eq!(h.crawler.calls().len(), crawls);
    }

    #[tokio::test]
    async fn resume_processes_only_the_remainder() {
        let h = Harness::new();
        let other = "https://otherpe.com/companies";
        h.crawler.set(SOURCE, acme_page());
        h.crawler.set(other, acme_page());
        h.extractor
            .set(SOURCE, Ok(vec![CompanySeed::new("Acme Corp", "acmecorp.com")]));
        h.extractor.set(
            other,
            Ok(vec![
                CompanySeed::new("Beta Labs", "betalabs.io"),
                CompanySeed::new("Gamma AI", "gamma.ai"),
            ]),
        );

        // A previous run already saved the first URL.
        let mut tracker = ResumeTracker::default();
        h.pipeline()
            .run(&urls(&[SOURCE]), &mut tracker, &SilentProgress)
            .await
            .unwrap();

        let mut tracker = ResumeTracker::load(h.primary.as_ref()).unwrap();
        let summary = h
            .pipeline()
            .run(&urls(&[SOURCE, other]), &mut tracker, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(summary.already_processed, 1);
        assert_eq!(summary.records, 2);
        let names: Vec<String> = h.primary.records().into_iter().map(|r| r.company_name).collect();
        assert_eq!(names, vec!["Acme Corp", "Beta Labs", "Gamma AI"]);
        assert_eq!(h.crawler.calls(), vec![SOURCE.to_string(), other.to_string()]);
    }

    #[tokio::test]
    async fn unsafe_urls_never_reach_the_crawler() {
        let h = Harness::new();
        let progress = RecordingProgress::default();
        let summary = h
            .pipeline()
            .run(
                &urls(&[
                    "http://127.0.0.1/portfolio",
                    "http://169.254.169.254/latest/meta-data/",
                    "https://intranet.example.com/portfolio",
                    "not a url",
                ]),
                &mut ResumeTracker::default(),
                &progress,
            )
            .await
            .unwrap();

        assert_eq!(summary.skipped, 4);
        assert!(h.crawler.calls().is_empty());
        assert!(progress.events().contains(&"skipped validating".to_string()));
    }

    #[tokio::test]
    async fn one_bad_url_does_not_stop_the_batch() {
        let h = Harness::new();
        let other = "https://otherpe.com/companies";
        // SOURCE has no crawl fixture, so it comes back empty.
        h.crawler.set(other, acme_page());
        h.extractor
            .set(other, Ok(vec![CompanySeed::new("Beta Labs", "betalabs.io")]));

        let progress = RecordingProgress::default();
        let summary = h
            .pipeline()
            .run(&urls(&[SOURCE, other]), &mut ResumeTracker::default(), &progress)
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(h.primary.records().len(), 1);
        assert!(progress.events().contains(&"skipped crawling".to_string()));
    }

    #[tokio::test]
    async fn permanent_extraction_failure_skips_url() {
        let h = Harness::new();
        h.crawler.set(SOURCE, acme_page());
        h.extractor
            .set(SOURCE, Err(ExternalError::Auth("invalid key".into())));

        let outcome = h.pipeline().process_url(SOURCE, &SilentProgress).await;
        assert!(matches!(
            outcome,
            UrlOutcome::Skipped {
                stage: Stage::Extracting,
                ..
            }
        ));
        assert_eq!(h.extractor.calls(), 1);
    }

    #[tokio::test]
    async fn permanent_deal_search_failure_skips_url() {
        let h = Harness::new();
        h.crawler.set(SOURCE, acme_page());
        h.extractor
            .set(SOURCE, Ok(vec![CompanySeed::new("Acme Corp", "acmecorp.com")]));
        h.deal_search.set(
            r#""Acme Corp" "Examplepe""#,
            Err(ExternalError::BadRequest("400".into())),
        );

        let outcome = h.pipeline().process_url(SOURCE, &SilentProgress).await;
        assert!(matches!(
            outcome,
            UrlOutcome::Skipped {
                stage: Stage::Scoring,
                ..
            }
        ));
        assert!(h.primary.records().is_empty());
    }

    #[tokio::test]
    async fn duplicate_and_blank_seeds_are_dropped() {
        let h = Harness::new();
        h.crawler.set(SOURCE, acme_page());
        h.extractor.set(
            SOURCE,
            Ok(vec![
                CompanySeed::new("Acme Corp", "acmecorp.com"),
                CompanySeed::new("  ", "blank.com"),
                CompanySeed::new("ACME CORP", "acme.io"),
                CompanySeed::new("Beta Labs", ""),
            ]),
        );

        let outcome = h.pipeline().process_url(SOURCE, &SilentProgress).await;
        assert!(matches!(outcome, UrlOutcome::Completed { companies: 2 }));

        let rows = h.primary.records();
        assert_eq!(rows[0].company_website, "acmecorp.com");
        assert_eq!(rows[1].company_name, "Beta Labs");
        assert!(rows[1].company_website.is_empty());
        assert_eq!(h.kg.queries(), vec!["Beta Labs"]);
    }

    #[tokio::test]
    async fn primary_store_failure_is_fatal() {
        let h = Harness {
            primary: Arc::new(MemorySink::failing()),
            ..Harness::new()
        };
        h.crawler.set(SOURCE, acme_page());
        h.extractor
            .set(SOURCE, Ok(vec![CompanySeed::new("Acme Corp", "acmecorp.com")]));

        let mut tracker = ResumeTracker::default();
        let err = h
            .pipeline()
            .run(&urls(&[SOURCE]), &mut tracker, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::Storage(_)));
        assert!(!tracker.is_processed(SOURCE));
        assert!(h.mirror.records().is_empty());
    }

    #[tokio::test]
    async fn mirror_failure_is_not_fatal() {
        let h = Harness {
            mirror: Arc::new(MemorySink::failing()),
            ..Harness::new()
        };
        h.crawler.set(SOURCE, acme_page());
        h.extractor
            .set(SOURCE, Ok(vec![CompanySeed::new("Acme Corp", "acmecorp.com")]));

        let outcome = h.pipeline().process_url(SOURCE, &SilentProgress).await;
        assert!(matches!(outcome, UrlOutcome::Completed { companies: 1 }));
        assert_eq!(h.primary.records().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_crawl_times_out_and_skips() {
        let h = Harness::new();
        h.crawler.set(SOURCE, acme_page());
        h.crawler.delay(Duration::from_secs(120));

        let outcome = h.pipeline().process_url(SOURCE, &SilentProgress).await;
        assert!(matches!(
            outcome,
            UrlOutcome::Skipped {
                stage: Stage::Crawling,
                ..
            }
        ));
        assert_eq!(h.extractor.calls(), 0);
    }
}
