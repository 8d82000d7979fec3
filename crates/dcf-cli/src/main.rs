mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::error::Error;
use std::process;

use dcf_core::{DcfError, ErrorPayload};

use commands::valuation::{ValuateArgs, WaccArgs};
use logging::LogLevel;

/// Exit code for rejected input (bad assumptions, missing or malformed fields).
const EXIT_CLIENT_ERROR: i32 = 2;

/// Discounted-cash-flow equity valuation
#[derive(Parser)]
#[command(
    name = "dcf",
    version,
    about = "Discounted-cash-flow equity valuation",
    long_about = "Projects free cash flow, discounts it and a Gordon growth terminal value \
                  to present value, and derives equity value per share with decimal precision. \
                  Input comes from --input, piped JSON on stdin, or individual flags."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log verbosity on stderr (RUST_LOG overrides)
    #[arg(long, default_value = "warn", global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a DCF valuation and report per-share value
    Valuate(ValuateArgs),
    /// Build a discount rate from CAPM cost of equity and WACC
    Wacc(WaccArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level);

    let result: Result<serde_json::Value, Box<dyn Error>> = match cli.command {
        Commands::Valuate(args) => commands::valuation::run_valuate(args),
        Commands::Wacc(args) => commands::valuation::run_wacc(args),
        Commands::Version => {
            println!("dcf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);

            let (payload, code) = match e.downcast_ref::<DcfError>() {
                Some(err) if err.is_client_error() => (err.to_payload(), EXIT_CLIENT_ERROR),
                Some(err) => (err.to_payload(), 1),
                None => (
                    ErrorPayload {
                        error: e.to_string(),
                        kind: "internal".into(),
                    },
                    1,
                ),
            };
            if matches!(cli.output, OutputFormat::Json) {
                if let Ok(value) = serde_json::to_value(&payload) {
                    output::format_output(&cli.output, &value);
                }
            }
            process::exit(code);
        }
    }
}
