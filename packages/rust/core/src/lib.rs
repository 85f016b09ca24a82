//! Enrichment engine for portscout.
//!
//! Sequences validate → crawl → extract → resolve → score → persist for every
//! source URL, and owns the resume, retry and SSRF rules around those calls.
//! Collaborators plug in through the traits in [`boundary`].

pub mod boundary;
pub mod deals;
pub mod domain;
pub mod pipeline;
pub mod resolver;
pub mod resume;
pub mod retry;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use boundary::{
    HostResolver, KnowledgeGraph, PageCrawler, ProcessedSource, RecordSink, SeedExtractor,
    SystemResolver, WebSearch,
};
pub use deals::{ArticleScorer, DealFinder, deal_query};
pub use pipeline::{
    Pipeline, PipelineDeps, PipelineOptions, ProgressReporter, RunSummary, SilentProgress, Stage,
    UrlOutcome,
};
pub use resolver::WebsiteResolver;
pub use resume::ResumeTracker;
pub use retry::{CallOutcome, RetryPolicy, with_retry};
pub use validator::{Rejection, SourceUrl, UrlGuard, is_public_ip};
