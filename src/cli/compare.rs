use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use mrprotocol::comparator::Comparator;

use super::config::Config;
use super::input::{self, InputFormat};
use super::{write_output, ReportFormat};

/// Options of the compare command
pub struct CompareArgs {
    pub reference: PathBuf,
    pub candidate: PathBuf,
    pub reference_format: InputFormat,
    pub candidate_format: InputFormat,
    pub config: Option<PathBuf>,
    pub extra_parameters: bool,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
}

/// Compare one acquisition against a reference protocol
pub fn run(args: CompareArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    info!("Protocol Comparison");
    info!("===================");
    info!("Reference: {}", args.reference.display());
    info!("Candidate: {}", args.candidate.display());

    let reference = input::load(&args.reference, args.reference_format)
        .context("Failed to load reference protocol")?;
    let candidate = input::load(&args.candidate, args.candidate_format)
        .context("Failed to load candidate protocol")?;

    let registry = reference.registry(config.registry()?);
    let report = Comparator::new(&registry)
        .with_options(config.options(args.extra_parameters))
        .compare(&reference.protocol, &candidate.protocol)
        .context("Comparison failed")?;

    let rendered = match args.format {
        ReportFormat::Text => {
            #[cfg(feature = "colorized_output")]
            {
                if args.output.is_none() {
                    report.format_colored()
                } else {
                    report.to_string()
                }
            }

            #[cfg(not(feature = "colorized_output"))]
            {
                report.to_string()
            }
        }
        ReportFormat::Json => report.export().to_json().context("Failed to export JSON")?,
        ReportFormat::Tsv => report.export().to_tsv().context("Failed to export TSV")?,
    };
    write_output(&rendered, args.output.as_deref())?;

    // Exit with error code if the candidate is not compliant
    if !report.is_compliant() {
        std::process::exit(1);
    }

    Ok(())
}
