//! Parallel comparison of many candidates against one reference

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;
use rayon::prelude::*;

use crate::protocol::Protocol;
use crate::report::ComplianceReport;
use crate::rules::RuleError;

use super::Comparator;

/// Shared flag that stops a batch before further comparisons start
///
/// Comparisons already running finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once [`cancel`](Self::cancel) was called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Result of one comparison in a batch
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// Comparison ran to completion
    Completed(ComplianceReport),
    /// Rule resolution failed
    Failed(RuleError),
    /// Cancelled before the comparison started
    Cancelled,
}

impl BatchOutcome {
    /// Report, if the comparison completed
    pub fn report(&self) -> Option<&ComplianceReport> {
        match self {
            BatchOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }

    /// True if the comparison completed with a compliant verdict
    pub fn is_compliant(&self) -> bool {
        self.report().is_some_and(ComplianceReport::is_compliant)
    }
}

/// Tally of a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Candidates in the batch
    pub total: usize,
    /// Completed and compliant
    pub compliant: usize,
    /// Completed and not compliant
    pub non_compliant: usize,
    /// Rule resolution failed
    pub failed: usize,
    /// Never started
    pub cancelled: usize,
}

impl BatchSummary {
    /// Count the outcomes of a batch
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                BatchOutcome::Completed(report) if report.is_compliant() => summary.compliant += 1,
                BatchOutcome::Completed(_) => summary.non_compliant += 1,
                BatchOutcome::Failed(_) => summary.failed += 1,
                BatchOutcome::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }
}

impl Comparator<'_> {
    /// Compare every candidate against the reference on the rayon pool.
    ///
    /// Outcomes are returned in candidate order.
    pub fn compare_batch(
        &self,
        reference: &Protocol,
        candidates: &[Protocol],
        token: &CancellationToken,
    ) -> Vec<BatchOutcome> {
        info!(
            "Comparing {} candidate(s) against {}",
            candidates.len(),
            reference.label()
        );

        let outcomes: Vec<BatchOutcome> = candidates
            .par_iter()
            .map(|candidate| {
                if token.is_cancelled() {
                    return BatchOutcome::Cancelled;
                }
                match self.compare(reference, candidate) {
                    Ok(report) => BatchOutcome::Completed(report),
                    Err(e) => BatchOutcome::Failed(e),
                }
            })
            .collect();

        let summary = BatchSummary::from_outcomes(&outcomes);
        info!(
            "Batch done: {} compliant, {} non-compliant, {} failed, {} cancelled",
            summary.compliant, summary.non_compliant, summary.failed, summary.cancelled
        );
        outcomes
    }
}
