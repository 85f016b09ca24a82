//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};

use portscout_core::{ArticleScorer, DealFinder, RecordSink, ResumeTracker, RetryPolicy};
use portscout_search::CustomSearchClient;
use portscout_shared::{
    AppConfig, SearchEngineSettings, Settings, config_file_path, init_config_at, load_config,
    load_config_from,
};
use portscout_storage::{CsvStore, MirrorStore, read_input_urls};

use crate::progress::CliProgress;
use crate::wiring::build_pipeline;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// portscout: portfolio company discovery and deal-article enrichment.
#[derive(Parser)]
#[command(
    name = "portscout",
    version,
    about = "Discover portfolio companies on investor pages and enrich them with websites and deal articles.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.portscout/portscout.toml).
    #[arg(long, global = true, env = "PORTSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the enrichment pipeline over the input URL list.
    Run {
        /// Input CSV of investor portfolio URLs.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output CSV (appended to; also the resume checkpoint).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not write to the relational mirror even if configured.
        #[arg(long)]
        no_mirror: bool,
    },

    /// Search deal articles for one company/investor pair.
    Articles {
        /// Company name.
        company: String,

        /// Investor name.
        investor: String,

        /// Company website, used to drop the company's own pages.
        #[arg(long, default_value = "")]
        website: String,
    },

    /// Print the deal-relevance score of one or more URLs.
    Score {
        /// URLs to score.
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "portscout=info",
        1 => "portscout=debug",
        _ => "portscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Run {
            input,
            output,
            no_mirror,
        } => {
            let config = app_config(config_path.as_deref())?;
            cmd_run(&config, input, output, no_mirror).await
        }
        Command::Articles {
            company,
            investor,
            website,
        } => {
            let config = app_config(config_path.as_deref())?;
            cmd_articles(&config, &company, &investor, &website).await
        }
        Command::Score { urls } => {
            let config = app_config(config_path.as_deref())?;
            cmd_score(&config, &urls);
            Ok(())
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path.as_deref()),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn app_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config: &AppConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    no_mirror: bool,
) -> Result<()> {
    let settings = Settings::resolve(config, env_lookup)?;

    let input_path = input.unwrap_or_else(|| PathBuf::from(&config.pipeline.input_file));
    let output_path = output.unwrap_or_else(|| PathBuf::from(&config.pipeline.output_file));

    let urls = read_input_urls(&input_path)
        .wrap_err_with(|| format!("cannot read input URLs from {}", input_path.display()))?;

    let store = Arc::new(CsvStore::new(&output_path)?);
    let mut tracker = ResumeTracker::load(store.as_ref())?;

    let mirror: Option<Arc<dyn RecordSink>> = match (&settings.mirror, no_mirror) {
        (Some(mirror_settings), false) => match MirrorStore::open(mirror_settings).await {
            Ok(mirror) => Some(Arc::new(mirror) as Arc<dyn RecordSink>),
            Err(err) => {
                warn!(error = %err, "relational mirror unavailable, continuing without it");
                None
            }
        },
        _ => None,
    };

    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        urls = urls.len(),
        mirror = mirror.is_some(),
        knowledge_graph = settings.company_search.is_some(),
        "starting portscout run"
    );

    let pipeline = build_pipeline(config, &settings, store, mirror)?;
    let progress = CliProgress::new();
    pipeline.run(&urls, &mut tracker, &progress).await?;
    Ok(())
}

async fn cmd_articles(
    config: &AppConfig,
    company: &str,
    investor: &str,
    website: &str,
) -> Result<()> {
    let engine = SearchEngineSettings::resolve_deal_search(config, env_lookup)?;
    let search = CustomSearchClient::new(
        &engine,
        &config.pipeline.user_agent,
        Duration::from_secs(config.pipeline.search_timeout_secs),
    )?;

    let finder = DealFinder::new(
        Arc::new(search),
        ArticleScorer::new(&config.heuristics),
        RetryPolicy::from(&config.retry),
    );

    let articles = finder.find_deal_articles(company, investor, website).await?;
    if articles.is_empty() {
        println!("No deal articles found for {company} / {investor}.");
        return Ok(());
    }

    for (rank, article) in articles.iter().enumerate() {
        println!("{}. [{}] {}", rank + 1, article.score, article.url);
    }
    Ok(())
}

fn cmd_score(config: &AppConfig, urls: &[String]) {
    let scorer = ArticleScorer::new(&config.heuristics);
    for url in urls {
        if scorer.is_blocked(url) {
            println!("[blocked] {url}");
        } else {
            println!("[{}] {url}", scorer.score_url(url));
        }
    }
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };
    init_config_at(&path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = app_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
