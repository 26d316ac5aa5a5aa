use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use assessment_parser::config::{self, ParserConfig};
use assessment_parser::pipeline::batch;
use assessment_parser::pipeline::families::DocumentFamily;

/// Turn a directory of clinical PDF reports into one pseudonymized CSV.
#[derive(Debug, Parser)]
#[command(name = config::APP_NAME, version, about)]
struct Cli {
    /// Document family of every file in the input directory
    #[arg(long, value_enum)]
    family: DocumentFamily,

    /// Directory holding the PDF reports
    #[arg(long, value_name = "DIR")]
    input: PathBuf,

    /// Output CSV file, or a directory for the family's default file name
    #[arg(long, value_name = "FILE|DIR")]
    output: PathBuf,

    /// JSON file overriding built-in patterns, tables and the secret
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    assessment_parser::init_tracing(cli.verbose);
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let result = ParserConfig::load(cli.config.as_deref())
        .map_err(batch::BatchError::from)
        .and_then(|config| batch::process(&cli.input, &cli.output, cli.family, &config));

    match result {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!(error = %e, "Could not render batch report"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Batch failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
