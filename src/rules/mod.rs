//! # Equivalence Rules
//!
//! An equivalence rule decides whether a candidate parameter value is
//! compliant with its reference value. Rules are a closed set of variants
//! ([`EquivalenceRule`]) so that resolution and applicability checks are
//! exhaustive.
//!
//! | Rule | Compliant when | Applies to |
//! |------|----------------|------------|
//! | `exact` | values equal after normalization | all types |
//! | `tolerance` | `\|ref - cand\| <= tol` (absolute or relative, inclusive) | number, numbers |
//! | `set` | candidate is one of the allowed values | all types |
//! | `pattern` | candidate fully matches a regex | text, token |
//! | `ignore` | always | all types |
//! | `coil` | shared receive-coil groups have identical elements | text, token |
//!
//! Rules are looked up through a [`RuleRegistry`], which is passed explicitly
//! to the comparator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::comparator::Severity;
use crate::protocol::{DataType, ParamValue};

mod coil;
mod error;
mod pattern;
mod registry;
mod tolerance;


pub use coil::CoilElements;
pub use error::RuleError;
pub use pattern::Pattern;
pub use registry::{ResolvedRule, RuleRegistry, RuleSource};
pub use tolerance::{Tolerance, ToleranceMode};

/// Comparison policy applied to a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EquivalenceRule {
    /// Values must be identical after type normalization
    Exact,
    /// Numeric values must agree within a tolerance
    Tolerance(Tolerance),
    /// Candidate must be one of the allowed values
    #[serde(rename = "set")]
    OneOf {
        /// Allowed values
        allowed: Vec<ParamValue>,
    },
    /// Candidate string must match the pattern
    Pattern {
        /// Anchored regular expression
        pattern: Pattern,
    },
    /// Always compliant
    Ignore,
    /// Receive-coil active elements must agree on every shared coil group
    #[serde(rename = "coil")]
    CoilElements,
}

impl EquivalenceRule {
    /// Keyword used in definition files
    pub fn kind(&self) -> &'static str {
        match self {
            EquivalenceRule::Exact => "exact",
            EquivalenceRule::Tolerance(_) => "tolerance",
            EquivalenceRule::OneOf { .. } => "set",
            EquivalenceRule::Pattern { .. } => "pattern",
            EquivalenceRule::Ignore => "ignore",
            EquivalenceRule::CoilElements => "coil",
        }
    }

    /// Set-membership rule
    pub fn one_of(allowed: impl IntoIterator<Item = ParamValue>) -> Self {
        EquivalenceRule::OneOf {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Pattern rule; fails on an invalid regex
    pub fn pattern(source: &str) -> Result<Self, RuleError> {
        Ok(EquivalenceRule::Pattern {
            pattern: Pattern::new(source)?,
        })
    }

    /// Absolute tolerance rule; fails on a negative tolerance
    pub fn tolerance(amount: f64) -> Result<Self, RuleError> {
        Ok(EquivalenceRule::Tolerance(Tolerance::absolute(amount)?))
    }

    /// Relative tolerance rule; fails on a negative fraction
    pub fn relative_tolerance(fraction: f64) -> Result<Self, RuleError> {
        Ok(EquivalenceRule::Tolerance(Tolerance::relative(fraction)?))
    }

    /// True if the rule can govern parameters of the given type
    pub fn applies_to(&self, data_type: DataType) -> bool {
        match self {
            EquivalenceRule::Exact | EquivalenceRule::Ignore => true,
            EquivalenceRule::Tolerance(_) => data_type.is_numeric(),
            EquivalenceRule::Pattern { .. } | EquivalenceRule::CoilElements => {
                data_type.is_textual()
            }
            EquivalenceRule::OneOf { allowed } => allowed
                .iter()
                .all(|value| value.data_type() == Some(data_type)),
        }
    }

    /// Apply the rule to a reference and a candidate value.
    ///
    /// Values of different types, or unspecified values, are never
    /// compliant (except under `Ignore`).
    pub fn evaluate(&self, reference: &ParamValue, candidate: &ParamValue) -> RuleOutcome {
        match self {
            EquivalenceRule::Ignore => RuleOutcome::compliant(),
            EquivalenceRule::Exact => {
                let magnitude = numeric_difference(reference, candidate);
                RuleOutcome::new(reference.normalized_eq(candidate), magnitude)
            }
            EquivalenceRule::Tolerance(tolerance) => {
                match (reference, candidate) {
                    (ParamValue::Number(r), ParamValue::Number(c)) => {
                        RuleOutcome::new(tolerance.within(*r, *c), Some((r - c).abs()))
                    }
                    (ParamValue::Numbers(r), ParamValue::Numbers(c)) if r.len() == c.len() => {
                        let ok = r.iter().zip(c).all(|(r, c)| tolerance.within(*r, *c));
                        RuleOutcome::new(ok, numeric_difference(reference, candidate))
                    }
                    _ => RuleOutcome::violation(),
                }
            }
            EquivalenceRule::OneOf { allowed } => {
                RuleOutcome::new(allowed.iter().any(|a| a.normalized_eq(candidate)), None)
            }
            EquivalenceRule::Pattern { pattern } => match candidate.as_str() {
                Some(text) => RuleOutcome::new(pattern.is_match(text), None),
                None => RuleOutcome::violation(),
            },
            EquivalenceRule::CoilElements => match (reference.as_str(), candidate.as_str()) {
                (Some(r), Some(c)) => {
                    match CoilElements::parse(r).differing_groups(&CoilElements::parse(c)) {
                        Some(differing) => RuleOutcome::new(differing == 0, Some(differing as f64)),
                        None => RuleOutcome::violation(),
                    }
                }
                _ => RuleOutcome::violation(),
            },
        }
    }
}

impl fmt::Display for EquivalenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquivalenceRule::Tolerance(t) => write!(f, "tolerance({})", t),
            EquivalenceRule::OneOf { allowed } => {
                let items: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                write!(f, "set{{{}}}", items.join(", "))
            }
            EquivalenceRule::Pattern { pattern } => write!(f, "pattern({})", pattern),
            other => f.write_str(other.kind()),
        }
    }
}

/// Largest absolute element-wise difference of two numeric values
fn numeric_difference(reference: &ParamValue, candidate: &ParamValue) -> Option<f64> {
    let (r, c) = (reference.as_numbers()?, candidate.as_numbers()?);
    if r.len() != c.len() || r.is_empty() {
        return None;
    }
    r.iter()
        .zip(c)
        .map(|(r, c)| (r - c).abs())
        .reduce(f64::max)
}

/// A rule together with the severity reported when it is violated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// The rule
    #[serde(flatten)]
    pub rule: EquivalenceRule,
    /// Severity of a violation
    #[serde(default)]
    pub severity: Severity,
}

impl RuleConfig {
    /// Rule with the default (failing) severity
    pub fn new(rule: EquivalenceRule) -> Self {
        Self {
            rule,
            severity: Severity::default(),
        }
    }

    /// Override the severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Exact match, failing severity
    pub fn exact() -> Self {
        Self::new(EquivalenceRule::Exact)
    }

    /// Ignore rule
    pub fn ignore() -> Self {
        Self::new(EquivalenceRule::Ignore)
    }
}

impl From<EquivalenceRule> for RuleConfig {
    fn from(rule: EquivalenceRule) -> Self {
        RuleConfig::new(rule)
    }
}

/// Result of applying an equivalence rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleOutcome {
    /// Whether the candidate complies
    pub compliant: bool,
    /// Size of the deviation, when it can be measured
    pub magnitude: Option<f64>,
}

impl RuleOutcome {
    fn new(compliant: bool, magnitude: Option<f64>) -> Self {
        Self {
            compliant,
            magnitude,
        }
    }

    fn compliant() -> Self {
        Self::new(true, None)
    }

    fn violation() -> Self {
        Self::new(false, None)
    }
}
