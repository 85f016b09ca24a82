//! Website resolution with a knowledge-graph then web-search fallback.
//!
//! Lookups are optional capabilities: a resolver built without a knowledge
//! graph or search client simply skips that tier. Failures of either tier are
//! misses, never errors.

use std::sync::Arc;

use tracing::{debug, instrument, warn};
use url::Url;

use portscout_shared::{
    CompanySeed, EntityHit, HeuristicsConfig, ResolutionSource, ResolvedCompany, SearchHit,
};

use crate::boundary::{KnowledgeGraph, WebSearch};
use crate::domain::{compact, matches_any, normalize_host, parse_lenient, registrable_domain};
use crate::retry::{CallOutcome, RetryPolicy, with_retry};

/// Shortest domain label trusted to identify a company by name.
const MIN_LABEL_MATCH_LEN: usize = 3;

/// Decides each company's final website.
#[derive(Clone)]
pub struct WebsiteResolver {
    knowledge_graph: Option<Arc<dyn KnowledgeGraph>>,
    search: Option<Arc<dyn WebSearch>>,
    fund_keywords: Vec<String>,
    aggregator_domains: Vec<String>,
    retry: RetryPolicy,
}

impl WebsiteResolver {
    pub fn new(heuristics: &HeuristicsConfig, retry: RetryPolicy) -> Self {
        Self {
            knowledge_graph: None,
            search: None,
            fund_keywords: heuristics.fund_keywords.iter().map(|k| k.to_lowercase()).collect(),
            aggregator_domains: heuristics
                .aggregator_domains
                .iter()
                .map(|d| d.to_lowercase())
                .collect(),
            retry,
        }
    }

    pub fn with_knowledge_graph(mut self, kg: Arc<dyn KnowledgeGraph>) -> Self {
        self.knowledge_graph = Some(kg);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.search = Some(search);
        self
    }

    /// Pick a website for `seed`. `investor_domain` is the host of the page the
    /// seed came from.
    #[instrument(skip_all, fields(company = %seed.name))]
    pub async fn resolve(&self, seed: &CompanySeed, investor_domain: &str) -> ResolvedCompany {
        let investor = registrable_domain(investor_domain);

        if self.accepts_extracted(&seed.website, &investor) {
            return resolved(seed, seed.website.trim().to_string(), ResolutionSource::Llm);
        }
        debug!(website = %seed.website, "extracted website rejected, trying lookups");

        if let Some(website) = self.from_knowledge_graph(&seed.name, &investor).await {
            return resolved(seed, website, ResolutionSource::KnowledgeGraph);
        }

        if let Some(website) = self.from_search(&seed.name, &investor).await {
            return resolved(seed, website, ResolutionSource::CustomSearch);
        }

        debug!("no website found");
        resolved(seed, String::new(), ResolutionSource::None)
    }

    /// The "looks wrong" check applied to extracted websites.
    fn accepts_extracted(&self, website: &str, investor: &str) -> bool {
        let Some(url) = parse_lenient(website) else {
            return false;
        };
        let Some(host) = url.host_str().map(normalize_host) else {
            return false;
        };

        if registrable_domain(&host) == investor {
            return false;
        }
        if matches_any(&host, &self.aggregator_domains) {
            return false;
        }

        let haystack = format!("{host}{}", url.path().to_lowercase());
        !self.has_fund_keyword(&haystack)
    }

    fn has_fund_keyword(&self, text: &str) -> bool {
        self.fund_keywords.iter().any(|k| text.contains(k.as_str()))
    }

    /// Host checks shared by both lookup tiers.
    fn acceptable_host(&self, url: &Url, investor: &str) -> Option<String> {
        let host = url.host_str().map(normalize_host)?;
        let ok = registrable_domain(&host) != investor
            && !matches_any(&host, &self.aggregator_domains)
            && !self.has_fund_keyword(&host);
        ok.then_some(host)
    }

    async fn from_knowledge_graph(&self, name: &str, investor: &str) -> Option<String> {
        let kg = self.knowledge_graph.as_ref()?;
        let outcome = with_retry(&self.retry, "knowledge_graph", || kg.lookup(name)).await;
        let entities = match outcome {
            CallOutcome::Ok(entities) => entities,
            CallOutcome::Exhausted(_) => return None,
            CallOutcome::Permanent(err) => {
                warn!(error = %err, "knowledge graph lookup failed, treating as miss");
                return None;
            }
        };

        entities
            .iter()
            .find_map(|entity| self.plausible_entity_site(entity, name, investor))
    }

    fn plausible_entity_site(
        &self,
        entity: &EntityHit,
        name: &str,
        investor: &str,
    ) -> Option<String> {
        let name_key = compact(name);
        let same_name = compact(&entity.name) == name_key && !name_key.is_empty();

        entity.websites().find_map(|candidate| {
            let url = parse_lenient(candidate)?;
            let host = self.acceptable_host(&url, investor)?;
            let registrable = registrable_domain(&host);
            let label = compact(registrable.split('.').next().unwrap_or_default());
            let domain_key = compact(&registrable);

            let name_in_domain = !name_key.is_empty() && domain_key.contains(&name_key);
            let domain_in_name = label.len() >= MIN_LABEL_MATCH_LEN && name_key.contains(&label);

            (same_name || name_in_domain || domain_in_name).then(|| candidate.trim().to_string())
        })
    }

    async fn from_search(&self, name: &str, investor: &str) -> Option<String> {
        let search = self.search.as_ref()?;
        let query = format!("\"{}\" official website", name.trim());
        let outcome = with_retry(&self.retry, "company_search", || search.search(&query)).await;
        let hits = match outcome {
            CallOutcome::Ok(hits) => hits,
            CallOutcome::Exhausted(_) => return None,
            CallOutcome::Permanent(err) => {
                warn!(error = %err, "company search failed, treating as miss");
                return None;
            }
        };

        hits.iter().find_map(|hit| self.usable_search_hit(hit, investor))
    }

    fn usable_search_hit(&self, hit: &SearchHit, investor: &str) -> Option<String> {
        let url = parse_lenient(&hit.url)?;
        self.acceptable_host(&url, investor)?;
        let host = url.host_str()?;
        Some(match url.port() {
            Some(port) => format!("{}://{host}:{port}", url.scheme()),
            None => format!("{}://{host}", url.scheme()),
        })
    }
}

fn resolved(seed: &CompanySeed, website: String, source: ResolutionSource) -> ResolvedCompany {
    ResolvedCompany {
        seed: seed.clone(),
        website,
        source,
    }
}
