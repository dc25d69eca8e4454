//! tunwall CLI
//!
//! Single binary for all tunwall operations:
//! - Start/stop the supervised tunnel session
//! - Inspect status, installed servers, and the tunnel log
//! - Manage configuration and the packet filter

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunwall::commands;
use tw_core::paths::Paths;

#[derive(Parser)]
#[command(name = "tunwall")]
#[command(author, version, about = "Supervised single-session VPN tunnel with firewall lockdown")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base directory (defaults to ~/.tunwall)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a server and lock down the firewall
    /// Alias: connect
    #[command(alias = "connect")]
    Start {
        /// Option set to use (defaults to the configured default set)
        option_set: Option<String>,
        /// Run the tunnel in the foreground and block until it exits
        #[arg(short, long)]
        wait: bool,
        /// Request a fresh forwarding identity (and therefore a new port)
        #[arg(short, long)]
        new_port: bool,
    },

    /// Stop the running tunnel and clear its markers
    Stop,

    /// Show tunnel, forwarded-port, and marker-file status
    Status,

    /// List installed servers
    Servers,

    /// Print the tunnel process log
    Log,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage the packet filter
    Firewall {
        #[command(subcommand)]
        action: FirewallAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a commented starter configuration
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
    /// Show current configuration
    Show,
    /// Show config file path
    Path,
}

#[derive(Subcommand)]
enum FirewallAction {
    /// Reset the packet filter to accept-all
    Down,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let paths = match &cli.base_dir {
        Some(base) => Paths::new(base.clone()),
        None => Paths::default_layout(),
    };
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| paths.config_path.clone());
    tracing::debug!("Using base directory: {:?}", paths.base_dir);

    match cli.command {
        Commands::Start {
            option_set,
            wait,
            new_port,
        } => {
            commands::start_command(&paths, &config_path, option_set.as_deref(), wait, new_port)
                .await?;
        }

        Commands::Stop => {
            commands::stop_command(&paths)?;
        }

        Commands::Status => {
            commands::status_command(&paths)?;
        }

        Commands::Servers => {
            commands::servers_command(&paths)?;
        }

        Commands::Log => {
            commands::log_command(&paths)?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Init { force } => {
                commands::config_init(&config_path, force)?;
            }
            ConfigAction::Show => {
                commands::config_show(&config_path)?;
            }
            ConfigAction::Path => {
                commands::config_path(&config_path)?;
            }
        },

        Commands::Firewall { action } => match action {
            FirewallAction::Down => {
                commands::firewall_down()?;
            }
        },
    }

    Ok(())
}
