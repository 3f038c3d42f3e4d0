use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

mod batch;
mod check;
mod compare;
mod config;
mod export;
mod input;

use batch::BatchArgs;
use compare::CompareArgs;
use export::ExportFormat;
use input::InputFormat;

/// mrprotocol - MR imaging protocol compliance checker
#[derive(Parser)]
#[command(name = "mrprotocol")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Output form of compliance reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable report
    #[default]
    Text,
    /// JSON grouped by sequence and parameter
    Json,
    /// One deviation per line
    Tsv,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare an acquisition against a reference protocol
    Compare {
        /// Reference protocol (definition XML, protocol JSON, DICOM JSON or BIDS)
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Acquired protocol to check
        #[arg(value_name = "CANDIDATE")]
        candidate: PathBuf,

        /// Input kind of the reference
        #[arg(long, default_value = "auto", value_enum)]
        reference_format: InputFormat,

        /// Input kind of the candidate
        #[arg(long, default_value = "auto", value_enum)]
        candidate_format: InputFormat,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Report candidate parameters the reference does not list
        #[arg(long)]
        extra_parameters: bool,

        /// Report output format
        #[arg(short = 'f', long, default_value = "text", value_enum)]
        format: ReportFormat,

        /// Write the report to a file instead of stdout
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Compare many acquisitions against one reference in parallel
    Batch {
        /// Reference protocol
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Acquired protocols to check
        #[arg(value_name = "CANDIDATES", required = true)]
        candidates: Vec<PathBuf>,

        /// Input kind of the candidates
        #[arg(long, default_value = "auto", value_enum)]
        candidate_format: InputFormat,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Report candidate parameters the reference does not list
        #[arg(long)]
        extra_parameters: bool,

        /// Report output format
        #[arg(short = 'f', long, default_value = "text", value_enum)]
        format: ReportFormat,

        /// Write the reports to a file instead of stdout
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Load a protocol and show the rule each parameter resolves to
    Check {
        /// Protocol file or BIDS directory
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Input kind
        #[arg(long, default_value = "auto", value_enum)]
        format: InputFormat,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Export a protocol as a reference definition
    Export {
        /// Protocol file or BIDS directory
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output path (stdout when omitted)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Input kind
        #[arg(long, default_value = "auto", value_enum)]
        from: InputFormat,

        /// Output form
        #[arg(long, default_value = "xml", value_enum)]
        to: ExportFormat,

        /// Protocol name to write
        #[arg(long)]
        name: Option<String>,

        /// Protocol version to write
        #[arg(long)]
        version: Option<String>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Compare {
            reference,
            candidate,
            reference_format,
            candidate_format,
            config,
            extra_parameters,
            format,
            output,
        } => compare::run(CompareArgs {
            reference,
            candidate,
            reference_format,
            candidate_format,
            config,
            extra_parameters,
            format,
            output,
        }),
        Commands::Batch {
            reference,
            candidates,
            candidate_format,
            config,
            extra_parameters,
            format,
            output,
        } => batch::run(BatchArgs {
            reference,
            candidates,
            format: candidate_format,
            config,
            extra_parameters,
            report_format: format,
            output,
        }),
        Commands::Check {
            file,
            format,
            config,
        } => check::run(file, format, config),
        Commands::Export {
            input,
            output,
            from,
            to,
            name,
            version,
        } => export::run(input, output, from, to, name, version),
    }
}

/// Write to a file, or print to stdout
fn write_output(rendered: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{}", rendered);
            if !rendered.ends_with('\n') {
                println!();
            }
            Ok(())
        }
    }
}
