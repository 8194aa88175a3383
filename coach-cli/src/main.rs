//! coachmem: append messages to, inspect and clear coach conversation memory.
//! Config from env (`.env` supported); results are printed to stdout.

use anyhow::Result;
use clap::Parser;
use coach_cli::{build_manager, commands::summarizer_for, init_tracing, run, AppConfig, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    init_tracing(&config.log_file)?;

    let manager = build_manager(&config, summarizer_for(&config)).await?;
    let output = run(&manager, cli.command).await?;
    println!("{output}");

    Ok(())
}
