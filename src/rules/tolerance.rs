use std::fmt;

use serde::{Deserialize, Serialize};

use super::RuleError;

/// How a tolerance bound is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToleranceMode {
    /// `|ref - cand| <= tolerance`
    #[default]
    Absolute,
    /// `|ref - cand| <= tolerance * |ref|`
    Relative,
}

impl ToleranceMode {
    /// Keyword used in definition files
    pub fn as_str(&self) -> &'static str {
        match self {
            ToleranceMode::Absolute => "absolute",
            ToleranceMode::Relative => "relative",
        }
    }
}

impl std::str::FromStr for ToleranceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" | "abs" => Ok(ToleranceMode::Absolute),
            "relative" | "rel" => Ok(ToleranceMode::Relative),
            other => Err(format!("unknown tolerance mode '{}'", other)),
        }
    }
}

/// A validated, non-negative numeric tolerance (inclusive bound)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ToleranceRepr")]
pub struct Tolerance {
    #[serde(rename = "tolerance")]
    amount: f64,
    #[serde(default)]
    mode: ToleranceMode,
}

#[derive(Deserialize)]
struct ToleranceRepr {
    tolerance: f64,
    #[serde(default)]
    mode: ToleranceMode,
}

impl TryFrom<ToleranceRepr> for Tolerance {
    type Error = RuleError;

    fn try_from(repr: ToleranceRepr) -> Result<Self, Self::Error> {
        Tolerance::new(repr.tolerance, repr.mode)
    }
}

impl Tolerance {
    /// Tolerance used for numeric parameters by the neuroimaging defaults
    pub(crate) const NUMERIC_DEFAULT: Tolerance = Tolerance {
        amount: 1e-3,
        mode: ToleranceMode::Absolute,
    };

    /// Create a tolerance; negative or non-finite amounts are rejected
    pub fn new(amount: f64, mode: ToleranceMode) -> Result<Self, RuleError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(RuleError::InvalidTolerance(amount));
        }
        Ok(Self { amount, mode })
    }

    /// Absolute tolerance
    pub fn absolute(amount: f64) -> Result<Self, RuleError> {
        Self::new(amount, ToleranceMode::Absolute)
    }

    /// Tolerance relative to the reference value
    pub fn relative(fraction: f64) -> Result<Self, RuleError> {
        Self::new(fraction, ToleranceMode::Relative)
    }

    /// Tolerance amount
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Tolerance mode
    pub fn mode(&self) -> ToleranceMode {
        self.mode
    }

    /// Check a single pair; the bound is inclusive
    pub fn within(&self, reference: f64, candidate: f64) -> bool {
        let diff = (reference - candidate).abs();
        let bound = match self.mode {
            ToleranceMode::Absolute => self.amount,
            ToleranceMode::Relative => self.amount * reference.abs(),
        };
        diff <= bound
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ToleranceMode::Absolute => write!(f, "±{}", self.amount),
            ToleranceMode::Relative => write!(f, "±{}%", self.amount * 100.0),
        }
    }
}
