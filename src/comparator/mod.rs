//! # Protocol Comparator
//!
//! Walks a reference [`Protocol`] against a candidate and records every
//! discrepancy as a [`Deviation`].
//!
//! ## Traversal
//!
//! 1. Reference sequences in order. A sequence missing from the candidate is
//!    one failing `MissingSequence` deviation and its parameters are skipped.
//! 2. Reference parameters in order. A parameter missing from the candidate
//!    is a `MissingParameter` deviation (warning when the reference marks it
//!    optional); no rule is resolved for it.
//! 3. Present parameters are checked for type agreement. A parameter whose
//!    rule is `Ignore` stops there; otherwise unspecified values and unit
//!    agreement are checked, then the resolved rule is applied.
//! 4. Candidate sequences unknown to the reference are reported last, as
//!    informational `ExtraSequence` deviations.
//!
//! The comparison is pure: the same inputs always give the same deviations
//! in the same order.
//!
//! ## Usage
//!
//! ```rust
//! use mrprotocol::comparator::Comparator;
//! use mrprotocol::protocol::{Parameter, ProtocolBuilder, SequenceBuilder};
//! use mrprotocol::rules::{EquivalenceRule, RuleRegistry};
//!
//! let registry = RuleRegistry::new()
//!     .with_parameter_rule("RepetitionTime", EquivalenceRule::tolerance(50.0)?.into());
//!
//! let protocol = |tr: f64| {
//!     ProtocolBuilder::new("ABCD")
//!         .sequence(
//!             SequenceBuilder::new("T1")
//!                 .parameter(Parameter::number("RepetitionTime", tr).with_unit("ms"))
//!                 .build()?,
//!         )
//!         .build()
//! };
//!
//! let report = Comparator::new(&registry).compare(&protocol(2000.0)?, &protocol(2100.0)?)?;
//! assert!(!report.is_compliant());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use log::{debug, warn};

use crate::protocol::{Parameter, Protocol, Sequence};
use crate::report::{ComplianceReport, ProtocolIdentity};
use crate::rules::{EquivalenceRule, RuleError, RuleRegistry};

mod batch;
mod deviation;

#[cfg(test)]
mod tests;

pub use batch::{BatchOutcome, BatchSummary, CancellationToken};
pub use deviation::{Deviation, DeviationKind, Severity};

/// Comparison switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Report candidate parameters that the reference does not list
    pub report_extra_parameters: bool,
}

impl CompareOptions {
    /// Enable or disable `ExtraParameter` deviations
    pub fn with_extra_parameters(mut self, enabled: bool) -> Self {
        self.report_extra_parameters = enabled;
        self
    }
}

/// Compares candidate protocols against a reference using a rule registry
///
/// The registry is borrowed read-only, so one comparator can be shared
/// between threads.
#[derive(Debug, Clone, Copy)]
pub struct Comparator<'r> {
    registry: &'r RuleRegistry,
    options: CompareOptions,
}

impl<'r> Comparator<'r> {
    /// Comparator with default options
    pub fn new(registry: &'r RuleRegistry) -> Self {
        Self {
            registry,
            options: CompareOptions::default(),
        }
    }

    /// Replace the options
    pub fn with_options(mut self, options: CompareOptions) -> Self {
        self.options = options;
        self
    }

    /// The registry rules are resolved from
    pub fn registry(&self) -> &'r RuleRegistry {
        self.registry
    }

    /// Current options
    pub fn options(&self) -> CompareOptions {
        self.options
    }

    /// Compare a candidate protocol against the reference.
    ///
    /// Fails only when a present parameter has no applicable rule.
    pub fn compare(
        &self,
        reference: &Protocol,
        candidate: &Protocol,
    ) -> Result<ComplianceReport, RuleError> {
        let mut deviations = Vec::new();

        for ref_seq in reference.sequences() {
            match candidate.sequence(ref_seq.name()) {
                Some(cand_seq) => self.compare_sequence(ref_seq, cand_seq, &mut deviations)?,
                None => {
                    debug!("Sequence '{}' missing from candidate", ref_seq.name());
                    deviations.push(Deviation::sequence_level(
                        ref_seq.name(),
                        DeviationKind::MissingSequence,
                        Severity::Failing,
                    ));
                }
            }
        }

        for cand_seq in candidate.sequences() {
            if !reference.contains(cand_seq.name()) {
                debug!("Extra candidate sequence '{}'", cand_seq.name());
                deviations.push(Deviation::sequence_level(
                    cand_seq.name(),
                    DeviationKind::ExtraSequence,
                    Severity::Informational,
                ));
            }
        }

        Ok(ComplianceReport::new(
            ProtocolIdentity::from(reference),
            ProtocolIdentity::from(candidate),
            deviations,
        ))
    }

    fn compare_sequence(
        &self,
        reference: &Sequence,
        candidate: &Sequence,
        deviations: &mut Vec<Deviation>,
    ) -> Result<(), RuleError> {
        for ref_param in reference {
            match candidate.parameter(ref_param.name()) {
                Some(cand_param) => {
                    if let Some(deviation) =
                        self.compare_parameter(reference.name(), ref_param, cand_param)?
                    {
                        debug!("{}", deviation);
                        deviations.push(deviation);
                    }
                }
                None => {
                    let severity = if ref_param.is_required() {
                        Severity::Failing
                    } else {
                        Severity::Warning
                    };
                    let deviation = Deviation::parameter_level(
                        reference.name(),
                        ref_param.name(),
                        DeviationKind::MissingParameter,
                        severity,
                    )
                    .with_values(Some(ref_param.value()), None);
                    debug!("{}", deviation);
                    deviations.push(deviation);
                }
            }
        }

        if self.options.report_extra_parameters {
            for cand_param in candidate {
                if !reference.contains(cand_param.name()) {
                    deviations.push(
                        Deviation::parameter_level(
                            candidate.name(),
                            cand_param.name(),
                            DeviationKind::ExtraParameter,
                            Severity::Informational,
                        )
                        .with_values(None, Some(cand_param.value())),
                    );
                }
            }
        }

        Ok(())
    }

    fn compare_parameter(
        &self,
        sequence: &str,
        reference: &Parameter,
        candidate: &Parameter,
    ) -> Result<Option<Deviation>, RuleError> {
        let failing = |kind| {
            Deviation::parameter_level(sequence, reference.name(), kind, Severity::Failing)
                .with_values(Some(reference.value()), Some(candidate.value()))
        };

        if reference.data_type() != candidate.data_type() {
            return Ok(Some(failing(DeviationKind::TypeMismatch)));
        }

        // Ignored parameters skip every remaining check; resolution errors
        // surface only once the values are known to be comparable
        let resolved = self.registry.resolve(reference);
        if let Ok(rule) = &resolved {
            if rule.config.rule == EquivalenceRule::Ignore {
                return Ok(None);
            }
        }

        if reference.value().is_unspecified() || candidate.value().is_unspecified() {
            warn!(
                "Unspecified value for {}.{} (reference: {}, candidate: {})",
                sequence,
                reference.name(),
                reference.value(),
                candidate.value()
            );
            return Ok(Some(failing(DeviationKind::UnspecifiedValue)));
        }

        if let (Some(ref_unit), Some(cand_unit)) = (reference.unit(), candidate.unit()) {
            if ref_unit != cand_unit {
                return Ok(Some(
                    failing(DeviationKind::UnitMismatch).with_units(Some(ref_unit), Some(cand_unit)),
                ));
            }
        }

        let resolved = resolved?;
        let outcome = resolved
            .config
            .rule
            .evaluate(reference.value(), candidate.value());
        if outcome.compliant {
            return Ok(None);
        }

        Ok(Some(
            Deviation::parameter_level(
                sequence,
                reference.name(),
                DeviationKind::NonCompliant,
                resolved.config.severity,
            )
            .with_values(Some(reference.value()), Some(candidate.value()))
            .with_units(reference.unit(), candidate.unit())
            .with_rule(&resolved.config.rule, outcome.magnitude),
        ))
    }
}

/// Compare two protocols with default options
pub fn compare(
    reference: &Protocol,
    candidate: &Protocol,
    registry: &RuleRegistry,
) -> Result<ComplianceReport, RuleError> {
    Comparator::new(registry).compare(reference, candidate)
}
