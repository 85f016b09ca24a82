//! Shared types, error model, and configuration for portscout.
//!
//! This crate is the foundation depended on by all other portscout crates.
//! It provides:
//! - [`ScoutError`] and [`ExternalError`], the unified error types
//! - Domain types ([`CompanySeed`], [`PageSignals`], [`PipelineRecord`], ...)
//! - Configuration ([`AppConfig`], config loading) and startup [`Settings`]

pub mod config;
pub mod error;
pub mod settings;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompanySearchConfig, DealSearchConfig, HeuristicsConfig, MirrorConfig,
    OpenRouterConfig, PipelineConfig, RetryConfig, config_dir, config_file_path, init_config,
    init_config_at, load_config, load_config_from,
};
pub use error::{ConfigurationError, ExternalError, Result, ScoutError};
pub use secrecy::SecretString;
pub use settings::{
    CompanySearchSettings, LlmSettings, MirrorSettings, SearchEngineSettings, Settings,
};
pub use types::{
    Anchor, CompanySeed, DealArticle, EntityHit, MAX_ARTICLES, PageSignals, PipelineRecord,
    ResolutionSource, ResolvedCompany, SearchHit,
};
