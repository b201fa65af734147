//! Tabletalk - chat with your tables
//!
#![doc = "Main entry point for the Tabletalk application."]

use anyhow::Result;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tabletalk::cli::{Cli, Commands};
use tabletalk::commands;
use tabletalk::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { session } => {
            if let Some(csv) = &session.csv {
                tracing::debug!("Loading CSV from: {}", csv.display());
            }
            commands::chat::run_chat(config, session).await?;
            Ok(())
        }
        Commands::Ask { session, question } => {
            tracing::info!("Answering a single question");
            commands::ask::run_ask(config, session, question).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never interleave with the transcript on stdout.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose {
        "tabletalk=debug"
    } else {
        "tabletalk=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
