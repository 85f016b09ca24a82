//! Deal article search and scoring.
//!
//! Scoring is a pure additive model over the URL alone; every rule fires
//! independently. Ranking is a stable sort, so equal scores keep search order.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument};
use url::Url;

use portscout_shared::{DealArticle, ExternalError, HeuristicsConfig, MAX_ARTICLES, SearchHit};

use crate::boundary::WebSearch;
use crate::domain::{compact, domain_matches, matches_any, normalize_host, parse_lenient};
use crate::retry::{CallOutcome, RetryPolicy, with_retry};

pub const BASELINE_SCORE: i32 = 50;
pub const HIGH_VALUE_BONUS: i32 = 30;
pub const DEAL_KEYWORD_BONUS: i32 = 20;
pub const NEWS_SEGMENT_BONUS: i32 = 10;
pub const DEEP_PATH_BONUS: i32 = 5;
pub const LOW_VALUE_PENALTY: i32 = -40;
pub const HOMEPAGE_PENALTY: i32 = -30;
pub const NON_ARTICLE_PENALTY: i32 = -20;
pub const EXTENSION_PENALTY: i32 = -15;

/// Paths that denote a site root.
const HOMEPAGE_PATHS: &[&str] = &["", "/", "/index.html", "/index.htm"];

/// Company names shorter than this (compacted) are too ambiguous to match hosts.
const MIN_NAME_MATCH_LEN: usize = 4;

/// Scores and filters candidate article URLs.
#[derive(Debug, Clone)]
pub struct ArticleScorer {
    blocked: Vec<String>,
    high_value: Vec<String>,
    low_value: Vec<String>,
    deal_keywords: Vec<String>,
    news_segments: Vec<String>,
    non_article_segments: Vec<String>,
    extensions: Vec<String>,
}

impl ArticleScorer {
    pub fn new(heuristics: &HeuristicsConfig) -> Self {
        let lower = |items: &[String]| -> Vec<String> {
            items.iter().map(|s| s.trim().to_lowercase()).collect()
        };
        Self {
            blocked: lower(&heuristics.blocked_domains),
            high_value: lower(&heuristics.high_value_domains),
            low_value: lower(&heuristics.low_value_domains),
            deal_keywords: lower(&heuristics.deal_keywords),
            news_segments: lower(&heuristics.news_segments),
            non_article_segments: lower(&heuristics.non_article_segments),
            extensions: lower(&heuristics.non_article_extensions),
        }
    }

    /// Relevance score of `raw`; unparseable URLs score as a bare homepage.
    pub fn score_url(&self, raw: &str) -> i32 {
        match parse_lenient(raw) {
            Some(url) => self.score(&url),
            None => BASELINE_SCORE + HOMEPAGE_PENALTY,
        }
    }

    fn score(&self, url: &Url) -> i32 {
        let host = url.host_str().map(normalize_host).unwrap_or_default();
        let path = url.path().to_lowercase();
        let mut score = BASELINE_SCORE;

        if matches_any(&host, &self.high_value) {
            score += HIGH_VALUE_BONUS;
        }
        if matches_any(&host, &self.low_value) {
            score += LOW_VALUE_PENALTY;
        }
        if self.deal_keywords.iter().any(|k| path.contains(k.as_str())) {
            score += DEAL_KEYWORD_BONUS;
        }
        if HOMEPAGE_PATHS.contains(&path.as_str()) {
            score += HOMEPAGE_PENALTY;
        }
        if self.non_article_segments.iter().any(|s| path.contains(s.as_str())) {
            score += NON_ARTICLE_PENALTY;
        }
        if path.split('/').filter(|s| !s.is_empty()).count() >= 2 {
            score += DEEP_PATH_BONUS;
        }
        if self.extensions.iter().any(|e| path.ends_with(e.as_str())) {
            score += EXTENSION_PENALTY;
        }
        if self.news_segments.iter().any(|s| path.contains(s.as_str())) {
            score += NEWS_SEGMENT_BONUS;
        }

        score
    }

    /// True when the URL's domain may never appear in results.
    pub fn is_blocked(&self, raw: &str) -> bool {
        parse_lenient(raw)
            .and_then(|u| u.host_str().map(normalize_host))
            .is_some_and(|host| matches_any(&host, &self.blocked))
    }

    /// Filter, score and rank search hits; returns at most [`MAX_ARTICLES`].
    ///
    /// Dropped: unparseable URLs, blocked domains, duplicates, and the
    /// company's own site. A known `company_website` removes every hit on that
    /// domain; otherwise only the first hit whose host carries the company
    /// name is taken to be the company site.
    pub fn rank(
        &self,
        company_name: &str,
        company_website: &str,
        hits: &[SearchHit],
    ) -> Vec<DealArticle> {
        let own_site =
            parse_lenient(company_website).and_then(|u| u.host_str().map(normalize_host));
        let guessed_site = match own_site {
            Some(_) => None,
            None => self.guess_company_site(company_name, hits),
        };
        let mut seen = HashSet::new();

        let mut articles: Vec<DealArticle> = hits
            .iter()
            .filter_map(|hit| {
                let raw = hit.url.trim();
                let url = parse_lenient(raw)?;
                let host = normalize_host(url.host_str()?);

                if matches_any(&host, &self.blocked) {
                    debug!(url = raw, "dropping blocked domain");
                    return None;
                }
                let on_own_site = own_site
                    .as_deref()
                    .is_some_and(|site| domain_matches(&host, site));
                if on_own_site || guessed_site == Some(raw) {
                    debug!(url = raw, "dropping company's own site");
                    return None;
                }
                if !seen.insert(raw.to_string()) {
                    return None;
                }

                Some(DealArticle {
                    url: raw.to_string(),
                    score: self.score(&url),
                })
            })
            .collect();

        // Vec::sort_by is stable.
        articles.sort_by(|a, b| b.score.cmp(&a.score));
        articles.truncate(MAX_ARTICLES);
        articles
    }

    /// First hit whose host contains the compacted company name, skipping
    /// curated press and social domains.
    fn guess_company_site<'a>(
        &self,
        company_name: &str,
        hits: &'a [SearchHit],
    ) -> Option<&'a str> {
        let name_key = compact(company_name);
        if name_key.len() < MIN_NAME_MATCH_LEN {
            return None;
        }

        hits.iter().map(|hit| hit.url.trim()).find(|raw| {
            parse_lenient(raw)
                .and_then(|u| u.host_str().map(normalize_host))
                .is_some_and(|host| {
                    !matches_any(&host, &self.low_value)
                        && !matches_any(&host, &self.high_value)
                        && compact(&host).contains(&name_key)
                })
        })
    }
}

/// Search query for a company/investor pair, or `None` when both are blank.
pub fn deal_query(company_name: &str, investor_name: &str) -> Option<String> {
    let parts: Vec<String> = [company_name, investor_name]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("\"{}\"", s.replace('"', "")))
        .collect();

    (!parts.is_empty()).then(|| parts.join(" "))
}

/// Finds the best deal articles for a company.
#[derive(Clone)]
pub struct DealFinder {
    search: Arc<dyn WebSearch>,
    scorer: ArticleScorer,
    retry: RetryPolicy,
}

impl DealFinder {
    pub fn new(search: Arc<dyn WebSearch>, scorer: ArticleScorer, retry: RetryPolicy) -> Self {
        Self {
            search,
            scorer,
            retry,
        }
    }

    pub fn scorer(&self) -> &ArticleScorer {
        &self.scorer
    }

    /// Up to three ranked articles for the pair.
    ///
    /// Exhausted retries yield an empty list; a permanent search failure is
    /// returned so the caller can skip the source URL.
    #[instrument(skip_all, fields(company = company_name, investor = investor_name))]
    pub async fn find_deal_articles(
        &self,
        company_name: &str,
        investor_name: &str,
        company_website: &str,
    ) -> Result<Vec<DealArticle>, ExternalError> {
        let Some(query) = deal_query(company_name, investor_name) else {
            return Ok(Vec::new());
        };

        let outcome = with_retry(&self.retry, "deal_search", || self.search.search(&query)).await;
        let hits = match outcome {
            CallOutcome::Ok(hits) => hits,
            CallOutcome::Exhausted(_) => return Ok(Vec::new()),
            CallOutcome::Permanent(err) => return Err(err),
        };

        let articles = self.scorer.rank(company_name, company_website, &hits);
        debug!(hits = hits.len(), kept = articles.len(), "deal articles ranked");
        Ok(articles)
    }
}
