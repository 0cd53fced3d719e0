//! grantscout CLI: the main entry point.
//!
//! Commands:
//! - `serve`     : Start the HTTP gateway
//! - `chat`      : Run one request from the terminal and print its frames
//! - `config`    : Print the default, resolved or on-disk config
//! - `doctor`    : Diagnose configuration
//! - `personas`  : List personas and their tools

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "grantscout",
    about = "grantscout: tool-augmented research funding assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send a single message and stream the response
    Chat {
        /// Persona to answer as
        #[arg(short, long, default_value = "general")]
        persona: String,

        /// Use the built-in sample data instead of the configured data service
        #[arg(long)]
        offline: bool,

        /// Bearer token used to resolve the access tier
        #[arg(long, env = "GRANTSCOUT_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// The message to send
        message: String,
    },

    /// Show configuration
    Config {
        /// Print the config file path
        #[arg(long, conflicts_with = "show")]
        path: bool,

        /// Print the resolved config (secrets removed)
        #[arg(long)]
        show: bool,
    },

    /// Diagnose configuration
    Doctor,

    /// List personas
    Personas,
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat {
            persona,
            offline,
            token,
            message,
        } => commands::chat::run(persona, message, offline, token).await?,
        Commands::Config { path, show } => {
            if path {
                commands::config_cmd::path()?
            } else if show {
                commands::config_cmd::show()?
            } else {
                commands::config_cmd::default()?
            }
        }
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Personas => commands::personas::run()?,
    }

    Ok(())
}
