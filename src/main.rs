//! Mira - knowledge assistant chat client
//!
#![doc = "Main entry point for the Mira command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mira::cli::{Cli, Commands};
use mira::commands;
use mira::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat => {
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Ask { text } => {
            tracing::info!("Sending a single question");
            commands::ask::run_ask(config, text.join(" ")).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::debug!("Starting sessions command");
            commands::sessions::handle_sessions(config, command).await?;
            Ok(())
        }
        Commands::Clear => {
            commands::clear::run_clear(config).await?;
            Ok(())
        }
        Commands::Status => {
            commands::status::run_status(config).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output.
/// Logs go to stderr so answers on stdout stay clean.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "mira=debug" } else { "mira=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
