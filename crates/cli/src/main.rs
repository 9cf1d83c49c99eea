//! wsync CLI - mirror a directory to a remote as it changes

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

/// wsync - Debounced directory mirroring over rsync
#[derive(Parser)]
#[command(name = "wsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Config file (default: <config dir>/wsync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and mirror changes until interrupted
    Watch {
        /// Directory to mirror (default: watch.root, then the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Destination, `[user@]host:path` or a local directory
        #[arg(long)]
        remote: Option<String>,
    },
    /// Show whether an instance is mirroring a directory
    Status {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Stop the instance mirroring a directory
    Stop {
        #[arg(long)]
        root: Option<PathBuf>,

        /// Seconds to wait for the instance to exit
        #[arg(long, default_value = "10")]
        timeout: u64,
    },
    /// View and edit the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Print one value
    Get {
        /// Dotted key, e.g. batch.batch_size
        key: String,
    },
    /// Set one value
    Set { key: String, value: String },
    /// Show the config file location
    Path {
        /// Create the file with example contents if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an annotated example configuration
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = cli_lib::logging::init(cli.verbose, cli.log_file.as_deref())?;
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Watch { root, remote } => {
            cmd::watch::run(config, root.as_deref(), remote.as_deref()).await
        }
        Commands::Status { root } => cmd::status::run(config, root.as_deref()).await,
        Commands::Stop { root, timeout } => cmd::stop::run(config, root.as_deref(), timeout).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(config).await,
            ConfigCommands::Get { key } => cmd::config::run_get(config, &key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(config, &key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(config, create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
