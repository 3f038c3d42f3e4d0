use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::ParamValue;
use crate::rules::EquivalenceRule;

/// How serious a deviation is
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth surfacing, does not affect the verdict
    Informational,
    /// Should be reviewed, does not affect the verdict
    Warning,
    /// Makes the candidate non-compliant
    #[default]
    Failing,
}

impl Severity {
    /// Keyword used in definition files and exports
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Informational => "informational",
            Severity::Warning => "warning",
            Severity::Failing => "failing",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "informational" | "info" => Ok(Severity::Informational),
            "warning" | "warn" => Ok(Severity::Warning),
            "failing" | "fail" | "critical" => Ok(Severity::Failing),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// What kind of discrepancy was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationKind {
    /// A reference sequence is absent from the candidate
    MissingSequence,
    /// A candidate sequence is absent from the reference
    ExtraSequence,
    /// A reference parameter is absent from the candidate sequence
    MissingParameter,
    /// A candidate parameter is absent from the reference sequence
    ExtraParameter,
    /// Reference and candidate values have different data types
    TypeMismatch,
    /// Reference and candidate carry different units
    UnitMismatch,
    /// Reference or candidate value is unspecified
    UnspecifiedValue,
    /// The equivalence rule rejected the candidate value
    NonCompliant,
}

impl DeviationKind {
    /// Keyword used in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviationKind::MissingSequence => "missing_sequence",
            DeviationKind::ExtraSequence => "extra_sequence",
            DeviationKind::MissingParameter => "missing_parameter",
            DeviationKind::ExtraParameter => "extra_parameter",
            DeviationKind::TypeMismatch => "type_mismatch",
            DeviationKind::UnitMismatch => "unit_mismatch",
            DeviationKind::UnspecifiedValue => "unspecified_value",
            DeviationKind::NonCompliant => "non_compliant",
        }
    }

    /// True for sequence-level deviations
    pub fn is_sequence_level(&self) -> bool {
        matches!(self, DeviationKind::MissingSequence | DeviationKind::ExtraSequence)
    }
}

impl fmt::Display for DeviationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discrepancy between a reference and a candidate protocol
///
/// Deviations are only produced by the comparator and never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deviation {
    sequence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameter: Option<String>,
    kind: DeviationKind,
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate: Option<ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<EquivalenceRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    magnitude: Option<f64>,
}

impl Deviation {
    pub(crate) fn sequence_level(
        sequence: impl Into<String>,
        kind: DeviationKind,
        severity: Severity,
    ) -> Self {
        Self {
            sequence: sequence.into(),
            parameter: None,
            kind,
            severity,
            reference: None,
            candidate: None,
            reference_unit: None,
            candidate_unit: None,
            rule: None,
            magnitude: None,
        }
    }

    pub(crate) fn parameter_level(
        sequence: impl Into<String>,
        parameter: impl Into<String>,
        kind: DeviationKind,
        severity: Severity,
    ) -> Self {
        Self {
            parameter: Some(parameter.into()),
            ..Self::sequence_level(sequence, kind, severity)
        }
    }

    pub(crate) fn with_values(
        mut self,
        reference: Option<&ParamValue>,
        candidate: Option<&ParamValue>,
    ) -> Self {
        self.reference = reference.cloned();
        self.candidate = candidate.cloned();
        self
    }

    pub(crate) fn with_units(mut self, reference: Option<&str>, candidate: Option<&str>) -> Self {
        self.reference_unit = reference.map(str::to_string);
        self.candidate_unit = candidate.map(str::to_string);
        self
    }

    pub(crate) fn with_rule(mut self, rule: &EquivalenceRule, magnitude: Option<f64>) -> Self {
        self.rule = Some(rule.clone());
        self.magnitude = magnitude;
        self
    }

    /// Sequence name
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Parameter name, `None` for sequence-level deviations
    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// Deviation kind
    pub fn kind(&self) -> DeviationKind {
        self.kind
    }

    /// Severity
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// True if the deviation makes the candidate non-compliant
    pub fn is_failing(&self) -> bool {
        self.severity == Severity::Failing
    }

    /// Reference value, if one was involved
    pub fn reference(&self) -> Option<&ParamValue> {
        self.reference.as_ref()
    }

    /// Candidate value, if one was involved
    pub fn candidate(&self) -> Option<&ParamValue> {
        self.candidate.as_ref()
    }

    /// Reference unit, if any
    pub fn reference_unit(&self) -> Option<&str> {
        self.reference_unit.as_deref()
    }

    /// Candidate unit, if any
    pub fn candidate_unit(&self) -> Option<&str> {
        self.candidate_unit.as_deref()
    }

    /// Rule that rejected the candidate, for `NonCompliant` deviations
    pub fn rule(&self) -> Option<&EquivalenceRule> {
        self.rule.as_ref()
    }

    /// Size of the deviation, when the rule can measure it
    pub fn magnitude(&self) -> Option<f64> {
        self.magnitude
    }

    /// `sequence` or `sequence.parameter`
    pub fn location(&self) -> String {
        match &self.parameter {
            Some(p) => format!("{}.{}", self.sequence, p),
            None => self.sequence.clone(),
        }
    }
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.location(), self.severity, self.kind)?;
        match (&self.reference, &self.candidate) {
            (Some(r), Some(c)) => write!(f, ": expected {}, found {}", r, c)?,
            (Some(r), None) => write!(f, ": expected {}", r)?,
            (None, Some(c)) => write!(f, ": found {}", c)?,
            (None, None) => {}
        }
        if self.kind == DeviationKind::UnitMismatch {
            write!(
                f,
                " (units {} vs {})",
                self.reference_unit.as_deref().unwrap_or("-"),
                self.candidate_unit.as_deref().unwrap_or("-")
            )?;
        }
        if let Some(rule) = &self.rule {
            write!(f, " under {}", rule)?;
        }
        if let Some(m) = self.magnitude {
            write!(f, " (off by {})", m)?;
        }
        Ok(())
    }
}
