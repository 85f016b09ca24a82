//! Builds the engine from resolved settings and concrete collaborators.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use tracing::debug;

use portscout_core::{
    ArticleScorer, DealFinder, Pipeline, PipelineDeps, PipelineOptions, RecordSink, RetryPolicy,
    SystemResolver, UrlGuard, WebsiteResolver,
};
use portscout_crawler::{CrawlerConfig, HttpCrawler};
use portscout_extraction::OpenRouterExtractor;
use portscout_search::{CustomSearchClient, KnowledgeGraphClient};
use portscout_shared::{AppConfig, Settings};

pub(crate) fn build_pipeline(
    config: &AppConfig,
    settings: &Settings,
    primary: Arc<dyn RecordSink>,
    mirror: Option<Arc<dyn RecordSink>>,
) -> Result<Pipeline> {
    let pipeline = &config.pipeline;
    let user_agent = pipeline.user_agent.as_str();
    let crawl_timeout = Duration::from_secs(pipeline.crawl_timeout_secs);
    let lookup_timeout = Duration::from_secs(pipeline.lookup_timeout_secs);
    let search_timeout = Duration::from_secs(pipeline.search_timeout_secs);
    let retry = RetryPolicy::from(&config.retry);

    let crawler = HttpCrawler::new(&CrawlerConfig {
        user_agent: user_agent.to_string(),
        timeout: crawl_timeout,
    })?;

    let extractor = OpenRouterExtractor::new(
        &settings.llm,
        user_agent,
        Duration::from_secs(pipeline.llm_timeout_secs),
    )?;

    let mut resolver = WebsiteResolver::new(&config.heuristics, retry.clone());
    if let Some(company_search) = &settings.company_search {
        let kg = KnowledgeGraphClient::new(company_search, user_agent, lookup_timeout)?;
        resolver = resolver.with_knowledge_graph(Arc::new(kg));

        if let Some(engine) = &company_search.custom_search {
            let search = CustomSearchClient::new(engine, user_agent, search_timeout)?;
            resolver = resolver.with_search(Arc::new(search));
        }
    }
    debug!(
        knowledge_graph = settings.company_search.is_some(),
        company_search = settings
            .company_search
            .as_ref()
            .is_some_and(|c| c.custom_search.is_some()),
        "website resolver configured"
    );

    let deal_search = CustomSearchClient::new(&settings.deal_search, user_agent, search_timeout)?;
    let deals = DealFinder::new(
        Arc::new(deal_search),
        ArticleScorer::new(&config.heuristics),
        retry.clone(),
    );

    let deps = PipelineDeps {
        guard: UrlGuard::new(Arc::new(SystemResolver)),
        crawler: Arc::new(crawler),
        extractor: Arc::new(extractor),
        resolver,
        deals,
        primary,
        mirror,
    };

    Ok(Pipeline::new(
        deps,
        PipelineOptions {
            crawl_timeout,
            retry,
        },
    ))
}
