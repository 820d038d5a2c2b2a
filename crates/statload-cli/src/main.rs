mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "statload",
    version,
    about = "Bulk loader for quarterback season statistics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a JSON record file into the database
    Load {
        /// Path to job YAML file
        job: PathBuf,
        /// Path to JSON file with players, seasons, and splits
        input: PathBuf,
        /// Abort on the first failed batch
        #[arg(long)]
        fail_fast: bool,
    },
    /// Validate a job file without writing anything
    Check {
        /// Path to job YAML file
        job: PathBuf,
    },
    /// Show recent ingest runs from the database
    Report {
        /// Path to job YAML file
        job: PathBuf,
        /// Number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Load {
            job,
            input,
            fail_fast,
        } => commands::load::execute(&job, &input, fail_fast),
        Commands::Check { job } => commands::check::execute(&job),
        Commands::Report { job, limit } => commands::report::execute(&job, limit),
    }
}
