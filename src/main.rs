//! `mirror` - sync a fork with merged upstream PRs

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Mirror merged upstream PRs into a fork and auto-merge them
#[derive(Parser, Debug)]
#[command(name = "mirror", version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(long, global = true, default_value = "mirror.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one sync cycle for each branch
    Evaluate {
        /// Branch to evaluate (repeatable, defaults to all configured)
        #[arg(long = "branch")]
        branches: Vec<String>,

        /// GitHub token
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Show stored pending PR records
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let result = match args.command {
        Commands::Evaluate { branches, token } => {
            cli::run_evaluate(&args.config, &token, &branches).await
        }
        Commands::Status => cli::run_status(&args.config).map(|()| 0),
    };

    match result {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            error!(error = %e, "mirror failed");
            ExitCode::from(2)
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`)
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
