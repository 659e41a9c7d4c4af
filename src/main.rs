//! # devrank CLI
//!
//! ## Usage
//!
//! ```bash
//! devrank --config ./config/devrank.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `devrank collect` | Search, enrich, rank and save every location |
//! | `devrank serve` | Start the read-only HTTP server |
//! | `devrank status` | Show checkpoint state and the last summary |
//! | `devrank locations` | List configured locations |
//!
//! ## Examples
//!
//! ```bash
//! # Resume (or start) a collection
//! devrank collect
//!
//! # Start over, ignoring the checkpoint
//! devrank collect --fresh
//!
//! # Re-collect two locations only
//! devrank collect --only peru --only chile
//!
//! # See how many users a search would return
//! devrank collect --dry-run --max-users 20
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use devrank::config;
use devrank::logging;
use devrank::pipeline::{self, CollectOptions};
use devrank::progress::ProgressMode;
use devrank::server;
use devrank::status;

/// devrank: rank GitHub developers by location.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/devrank.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "devrank",
    about = "Collect and rank public GitHub profiles by location",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/devrank.toml")]
    config: PathBuf,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the collection pipeline.
    ///
    /// Locations already completed according to the checkpoint are skipped,
    /// so rerunning after a crash resumes the previous run.
    Collect {
        /// Only collect this location (repeatable). Selected locations are
        /// collected even if the checkpoint marks them completed.
        #[arg(long = "only", value_name = "KEY")]
        only: Vec<String>,

        /// Ignore the checkpoint and collect every location again.
        #[arg(long)]
        fresh: bool,

        /// Run the search stage only and print hit counts. Writes nothing.
        #[arg(long)]
        dry_run: bool,

        /// Override `collect.max_users_per_location`.
        #[arg(long)]
        max_users: Option<usize>,

        /// Progress on stderr: auto (human when TTY), off, human, json.
        #[arg(long, value_enum, default_value = "auto")]
        progress: ProgressMode,
    },

    /// Start the read-only HTTP server.
    Serve,

    /// Show checkpoint state and the last summary.
    Status,

    /// List configured locations and their checkpoint status.
    Locations,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Collect {
            only,
            fresh,
            dry_run,
            max_users,
            progress,
        } => {
            let options = CollectOptions {
                only,
                fresh,
                dry_run,
                max_users,
            };
            pipeline::run_collect(&cfg, options, progress.reporter()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Status => {
            status::show_status(&cfg)?;
        }
        Commands::Locations => {
            status::list_locations(&cfg)?;
        }
    }

    Ok(())
}
