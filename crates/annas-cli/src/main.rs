//! CLI entry point for the `annas` tool.

use std::process::ExitCode;

use anyhow::Result;
use annas_core::{AnnasScraper, DownloadSettings, ScraperConfig};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Args, Command};

const LOG_LEVEL_VAR: &str = "ANNAS_LOG_LEVEL";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args);
    debug!(?args, "CLI arguments parsed");

    let json = args.json_output();
    match run(args).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) if json => {
            println!("{}", commands::error_json(&e));
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<String> {
    let scraper = AnnasScraper::with_config(ScraperConfig::from_env())?;

    match args.command {
        Command::Search { query, json } => commands::search(&scraper, &query, json).await,
        Command::Download {
            hash,
            title,
            format,
            output,
        } => {
            let settings =
                DownloadSettings::from_lookup_with_dir(|key| std::env::var(key).ok(), output)?;
            commands::download(&scraper, &hash, &title, &format, &settings).await
        }
    }
}

/// Installs the stderr subscriber
///
/// Priority: RUST_LOG > ANNAS_LOG_LEVEL > quiet/verbose flags > warn
fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_directive(args, std::env::var(LOG_LEVEL_VAR).ok()))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_directive(args: &Args, env_level: Option<String>) -> String {
    if let Some(level) = env_level.map(|l| l.trim().to_lowercase()).filter(|l| !l.is_empty()) {
        return level;
    }
    if args.quiet {
        return "error".to_string();
    }
    match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
    .to_string()
}
