//! Process-wide settings resolved once at startup.
//!
//! [`Settings::resolve`] reads every secret named by the [`AppConfig`] through
//! an injectable lookup, reports all missing required values together, and
//! turns optional ones into capability values. Nothing re-reads the
//! environment afterwards.

use secrecy::SecretString;

use crate::config::AppConfig;
use crate::error::ConfigurationError;

/// Credentials for the LLM extraction call.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
}

/// Credentials for a Custom Search engine.
#[derive(Debug, Clone)]
pub struct SearchEngineSettings {
    pub api_key: SecretString,
    pub cx: String,
    pub endpoint: String,
    pub results: u32,
}

impl SearchEngineSettings {
    /// Resolve only the deal-search engine, for commands that need nothing else.
    pub fn resolve_deal_search<F>(config: &AppConfig, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        match (
            read(&config.deal_search.api_key_env),
            read(&config.deal_search.cx_env),
        ) {
            (Some(key), Some(cx)) => Ok(Self {
                api_key: SecretString::from(key),
                cx,
                endpoint: config.deal_search.endpoint.clone(),
                results: config.deal_search.results,
            }),
            (key, cx) => {
                let mut missing = Vec::new();
                if key.is_none() {
                    missing.push(config.deal_search.api_key_env.clone());
                }
                if cx.is_none() {
                    missing.push(config.deal_search.cx_env.clone());
                }
                Err(ConfigurationError { missing })
            }
        }
    }
}

/// Company-website lookup credentials.
///
/// The Knowledge Graph only needs the key; the Custom Search fallback also
/// needs an engine id and is disabled without one.
#[derive(Debug, Clone)]
pub struct CompanySearchSettings {
    pub api_key: SecretString,
    pub knowledge_graph_endpoint: String,
    pub custom_search: Option<SearchEngineSettings>,
}

/// Relational mirror connection.
#[derive(Debug, Clone)]
pub struct MirrorSettings {
    pub url: String,
    pub auth_token: Option<SecretString>,
}

/// Immutable startup settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmSettings,
    pub deal_search: SearchEngineSettings,
    /// `None` disables website lookups beyond the extracted website.
    pub company_search: Option<CompanySearchSettings>,
    /// `None` disables the relational mirror.
    pub mirror: Option<MirrorSettings>,
}

impl Settings {
    /// Resolve settings from `config`, reading values through `lookup`
    /// (usually `|name| std::env::var(name).ok()`).
    ///
    /// Blank values count as missing.
    pub fn resolve<F>(config: &AppConfig, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut missing = Vec::new();
        let mut require = |name: &str| {
            let value = read(name);
            if value.is_none() {
                missing.push(name.to_string());
            }
            value
        };

        let llm_key = require(&config.openrouter.api_key_env);
        let deal_key = require(&config.deal_search.api_key_env);
        let deal_cx = require(&config.deal_search.cx_env);

        let (Some(llm_key), Some(deal_key), Some(deal_cx)) = (llm_key, deal_key, deal_cx) else {
            return Err(ConfigurationError { missing });
        };

        let company_search = read(&config.company_search.api_key_env).map(|key| {
            let custom_search =
                read(&config.company_search.cse_id_env).map(|cx| SearchEngineSettings {
                    api_key: SecretString::from(key.clone()),
                    cx,
                    endpoint: config.company_search.custom_search_endpoint.clone(),
                    results: config.company_search.results,
                });
            CompanySearchSettings {
                api_key: SecretString::from(key),
                knowledge_graph_endpoint: config.company_search.knowledge_graph_endpoint.clone(),
                custom_search,
            }
        });

        let mirror = read(&config.mirror.url_env).map(|url| MirrorSettings {
            url,
            auth_token: read(&config.mirror.auth_token_env).map(SecretString::from),
        });

        Ok(Self {
            llm: LlmSettings {
                api_key: SecretString::from(llm_key),
                model: config.openrouter.default_model.clone(),
                base_url: config.openrouter.base_url.clone(),
            },
            deal_search: SearchEngineSettings {
                api_key: SecretString::from(deal_key),
                cx: deal_cx,
                endpoint: config.deal_search.endpoint.clone(),
                results: config.deal_search.results,
            },
            company_search,
            mirror,
        })
    }
}
