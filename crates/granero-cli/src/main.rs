mod commands;
mod output;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "granero",
    version,
    about = "Pest inspection report ingestion and grain loss ledger for silos"
)]
struct Cli {
    /// Engine config file (default: built-in config)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a pest report (PDF or extracted .txt) into samples (without recording)
    Parse {
        /// Path to PDF or text file
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write parsed output to a JSON file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Map a JSON form submission into samples (without recording)
    Form {
        /// Path to form JSON file
        input_file: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Ingest a report (PDF, .txt or form .json): match batches and append loss rows
    Ingest {
        /// Path to PDF, text or form JSON file
        input_file: PathBuf,

        /// JSON store file with silos, batches, grain costs and the ledger
        #[arg(short, long, value_name = "FILE")]
        store: PathBuf,

        /// Week date (YYYY-MM-DD) for reports without dates (default: today)
        #[arg(short, long)]
        week: Option<NaiveDate>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Show the accumulated loss of a grain batch
    Ledger {
        /// Batch id
        batch_id: String,

        /// JSON store file
        #[arg(short, long, value_name = "FILE")]
        store: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Inspect and validate engine config
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config as JSON
    Show,
    /// Validate a config file
    Validate {
        /// Path to JSON config file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Parse {
            input_file,
            output,
            out,
        } => commands::parse::run(input_file, config, &output, out),
        Commands::Form { input_file, output } => commands::form::run(input_file, &output),
        Commands::Ingest {
            input_file,
            store,
            week,
            output,
        } => commands::ingest::run(input_file, &store, config, week, &output).await,
        Commands::Ledger {
            batch_id,
            store,
            output,
        } => commands::ledger::run(&batch_id, &store, &output).await,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(config),
            ConfigAction::Validate { file } => commands::config::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
