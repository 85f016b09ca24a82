//! portscout CLI: discover portfolio companies on investor websites and
//! enrich each with its official website and top deal articles.

mod commands;
mod progress;
mod wiring;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
