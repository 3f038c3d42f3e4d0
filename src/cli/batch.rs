use anyhow::{bail, Context, Result};
use log::info;
use serde_json::json;
use std::path::PathBuf;

use mrprotocol::comparator::{BatchOutcome, BatchSummary, CancellationToken, Comparator};

use super::config::Config;
use super::input::{self, InputFormat};
use super::{write_output, ReportFormat};

/// Options of the batch command
pub struct BatchArgs {
    pub reference: PathBuf,
    pub candidates: Vec<PathBuf>,
    pub format: InputFormat,
    pub config: Option<PathBuf>,
    pub extra_parameters: bool,
    pub report_format: ReportFormat,
    pub output: Option<PathBuf>,
}

/// Compare many acquisitions against one reference protocol in parallel
pub fn run(args: BatchArgs) -> Result<()> {
    if args.candidates.is_empty() {
        bail!("No candidate inputs given");
    }
    let config = Config::load(args.config.as_deref())?;

    let reference = input::load(&args.reference, InputFormat::Auto)
        .context("Failed to load reference protocol")?;
    let candidates = args
        .candidates
        .iter()
        .map(|path| {
            input::load(path, args.format)
                .map(|loaded| loaded.protocol)
                .with_context(|| format!("Failed to load candidate {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let registry = reference.registry(config.registry()?);
    let comparator =
        Comparator::new(&registry).with_options(config.options(args.extra_parameters));
    let outcomes = comparator.compare_batch(
        &reference.protocol,
        &candidates,
        &CancellationToken::new(),
    );
    let summary = BatchSummary::from_outcomes(&outcomes);

    let rendered = match args.report_format {
        ReportFormat::Text => render_text(&args.candidates, &outcomes, &summary),
        ReportFormat::Json => render_json(&args.candidates, &outcomes, &summary)?,
        ReportFormat::Tsv => render_tsv(&args.candidates, &outcomes)?,
    };
    write_output(&rendered, args.output.as_deref())?;

    info!(
        "{} of {} candidate(s) compliant",
        summary.compliant, summary.total
    );
    if summary.compliant != summary.total {
        std::process::exit(1);
    }
    Ok(())
}

fn render_text(paths: &[PathBuf], outcomes: &[BatchOutcome], summary: &BatchSummary) -> String {
    let mut output = String::new();
    for (path, outcome) in paths.iter().zip(outcomes) {
        match outcome {
            BatchOutcome::Completed(report) => {
                output.push_str(&format!("== {} ==\n{}\n", path.display(), report));
            }
            BatchOutcome::Failed(e) => {
                output.push_str(&format!("== {} ==\nComparison failed: {}\n\n", path.display(), e));
            }
            BatchOutcome::Cancelled => {
                output.push_str(&format!("== {} ==\nCancelled\n\n", path.display()));
            }
        }
    }
    output.push_str(&format!(
        "Batch: {} total, {} compliant, {} non-compliant, {} failed, {} cancelled\n",
        summary.total, summary.compliant, summary.non_compliant, summary.failed, summary.cancelled
    ));
    output
}

fn render_json(
    paths: &[PathBuf],
    outcomes: &[BatchOutcome],
    summary: &BatchSummary,
) -> Result<String> {
    let results = paths
        .iter()
        .zip(outcomes)
        .map(|(path, outcome)| {
            let input = path.display().to_string();
            Ok(match outcome {
                BatchOutcome::Completed(report) => {
                    json!({ "input": input, "report": serde_json::to_value(report.export())? })
                }
                BatchOutcome::Failed(e) => json!({ "input": input, "error": e.to_string() }),
                BatchOutcome::Cancelled => json!({ "input": input, "cancelled": true }),
            })
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    let document = json!({
        "summary": {
            "total": summary.total,
            "compliant": summary.compliant,
            "non_compliant": summary.non_compliant,
            "failed": summary.failed,
            "cancelled": summary.cancelled,
        },
        "results": results,
    });
    serde_json::to_string_pretty(&document).context("Failed to export JSON")
}

/// One TSV block per completed comparison, prefixed with the input path
fn render_tsv(paths: &[PathBuf], outcomes: &[BatchOutcome]) -> Result<String> {
    let mut output = String::new();
    for (path, outcome) in paths.iter().zip(outcomes) {
        if let Some(report) = outcome.report() {
            output.push_str(&format!("# {}\n", path.display()));
            output.push_str(&report.export().to_tsv().context("Failed to export TSV")?);
        }
    }
    Ok(output)
}
