//! Thing Search CLI
//!
//! Compiles thing searches into aggregation pipelines, translates thing
//! events into index updates and runs searches against an in-memory index
//! built from replayed events.

mod commands;
mod config;

use clap::Parser;
use thingsearch_query::QueryError;
use tracing::{error, info};

use crate::commands::Command;
use crate::config::CliConfig;

/// Thing search query compiler and index maintainer.
#[derive(Debug, Parser)]
#[command(name = "thingsearch")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: CliConfig,

    #[command(subcommand)]
    command: Command,
}

/// Installs the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "thingsearch={level},thingsearch_persistence={level},thingsearch_query={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.config.log_level);

    let search_config = match cli.config.validate() {
        Ok(search_config) => search_config,
        Err(errors) => {
            for error in &errors {
                eprintln!("Configuration error: {}", error);
            }
            std::process::exit(1);
        }
    };

    info!(
        default_page_size = search_config.default_page_size,
        max_page_size = search_config.max_page_size,
        max_index_content_length = search_config.max_index_content_length,
        "Starting thing search"
    );

    match cli.command.run(&search_config).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => {
            if let Some(query_error) = err.downcast_ref::<QueryError>() {
                error!(error_code = query_error.error_code(), "Invalid search request");
                eprintln!(
                    "{}",
                    serde_json::to_string_pretty(&query_error.description())?
                );
                std::process::exit(2);
            }
            Err(err)
        }
    }
}
