//! # Compliance Reports
//!
//! A [`ComplianceReport`] is the immutable result of one comparison: the
//! identities of both protocols, the deviations in traversal order and the
//! verdict. The candidate is compliant iff no deviation has failing severity.
//!
//! Reports render as plain text ([`Display`](std::fmt::Display)), as colored
//! terminal output ([`ComplianceReport::format_colored`]), and export to JSON
//! or TSV through [`ReportExport`].

use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "colorized_output")]
use console::style;

use crate::comparator::{Deviation, Severity};
use crate::protocol::{Protocol, SessionInfo};

mod export;


pub use export::ReportExport;

/// Name, version and session of a compared protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolIdentity {
    /// Protocol name
    pub name: String,
    /// Protocol version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Session identifiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionInfo>,
}

impl From<&Protocol> for ProtocolIdentity {
    fn from(protocol: &Protocol) -> Self {
        Self {
            name: protocol.name().to_string(),
            version: protocol.version().map(str::to_string),
            session: protocol.session().cloned(),
        }
    }
}

impl fmt::Display for ProtocolIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, " v{}", version)?;
        }
        if let Some(session) = &self.session {
            write!(f, " ({})", session)?;
        }
        Ok(())
    }
}

/// Overall outcome of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No failing deviation
    Compliant,
    /// At least one failing deviation
    NonCompliant,
}

impl Verdict {
    /// Keyword used in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Compliant => "compliant",
            Verdict::NonCompliant => "non_compliant",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Compliant => "COMPLIANT",
            Verdict::NonCompliant => "NON-COMPLIANT",
        })
    }
}

/// Deviation counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    /// Failing deviations
    pub failing: usize,
    /// Warnings
    pub warning: usize,
    /// Informational deviations
    pub informational: usize,
}

impl SeverityCounts {
    /// Total number of deviations
    pub fn total(&self) -> usize {
        self.failing + self.warning + self.informational
    }
}

/// Result of comparing a candidate protocol against a reference
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceReport {
    reference: ProtocolIdentity,
    candidate: ProtocolIdentity,
    deviations: Vec<Deviation>,
    verdict: Verdict,
}

impl ComplianceReport {
    pub(crate) fn new(
        reference: ProtocolIdentity,
        candidate: ProtocolIdentity,
        deviations: Vec<Deviation>,
    ) -> Self {
        let verdict = if deviations.iter().any(Deviation::is_failing) {
            Verdict::NonCompliant
        } else {
            Verdict::Compliant
        };
        Self {
            reference,
            candidate,
            deviations,
            verdict,
        }
    }

    /// Reference protocol identity
    pub fn reference(&self) -> &ProtocolIdentity {
        &self.reference
    }

    /// Candidate protocol identity
    pub fn candidate(&self) -> &ProtocolIdentity {
        &self.candidate
    }

    /// Overall verdict
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// True if no deviation is failing
    pub fn is_compliant(&self) -> bool {
        self.verdict == Verdict::Compliant
    }

    /// All deviations in traversal order
    pub fn deviations(&self) -> &[Deviation] {
        &self.deviations
    }

    /// Iterate over deviations in traversal order
    pub fn iter(&self) -> std::slice::Iter<'_, Deviation> {
        self.deviations.iter()
    }

    /// Number of deviations
    pub fn len(&self) -> usize {
        self.deviations.len()
    }

    /// True if the protocols matched without any deviation
    pub fn is_empty(&self) -> bool {
        self.deviations.is_empty()
    }

    /// Deviations recorded for one sequence
    pub fn for_sequence<'a>(&'a self, sequence: &'a str) -> impl Iterator<Item = &'a Deviation> + 'a {
        self.deviations.iter().filter(move |d| d.sequence() == sequence)
    }

    /// Deviations of a given severity
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Deviation> + '_ {
        self.deviations.iter().filter(move |d| d.severity() == severity)
    }

    /// Number of deviations of a given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.with_severity(severity).count()
    }

    /// Counts per severity
    pub fn counts(&self) -> SeverityCounts {
        SeverityCounts {
            failing: self.count(Severity::Failing),
            warning: self.count(Severity::Warning),
            informational: self.count(Severity::Informational),
        }
    }

    /// Exportable view of the report
    pub fn export(&self) -> ReportExport<'_> {
        ReportExport::new(self)
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static INFO: Emoji<'_, '_> = Emoji("ℹ", "[INFO]");
            static WARN: Emoji<'_, '_> = Emoji("⚠", "[WARN]");
            static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");

            let mut output = String::new();

            output.push_str(&format!("{}\n", style("Protocol Compliance Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("==========================").cyan()));
            output.push_str(&format!("{}: {}\n", style("Reference").bold(), self.reference));
            output.push_str(&format!("{}: {}\n\n", style("Candidate").bold(), self.candidate));

            for deviation in &self.deviations {
                let line = deviation.to_string();
                let styled = match deviation.severity() {
                    Severity::Informational => format!("[{}] {}", INFO, style(line).dim()),
                    Severity::Warning => format!("[{}] {}", WARN, style(line).yellow()),
                    Severity::Failing => format!("[{}] {}", FAIL, style(line).red()),
                };
                output.push_str(&styled);
                output.push('\n');
            }

            let counts = self.counts();
            output.push('\n');
            output.push_str(&format!(
                "{}: {} failing, {} warnings, {} informational\n\n",
                style("Summary").bold(),
                style(counts.failing).red(),
                style(counts.warning).yellow(),
                style(counts.informational).dim()
            ));

            let verdict = match self.verdict {
                Verdict::Compliant => style(self.verdict.to_string()).green().bold(),
                Verdict::NonCompliant => style(self.verdict.to_string()).red().bold(),
            };
            output.push_str(&format!("{}\n", verdict));

            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl<'a> IntoIterator for &'a ComplianceReport {
    type Item = &'a Deviation;
    type IntoIter = std::slice::Iter<'a, Deviation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ComplianceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Protocol Compliance Report")?;
        writeln!(f, "==========================")?;
        writeln!(f, "Reference: {}", self.reference)?;
        writeln!(f, "Candidate: {}", self.candidate)?;
        writeln!(f)?;

        for deviation in &self.deviations {
            let symbol = match deviation.severity() {
                Severity::Informational => "ℹ",
                Severity::Warning => "⚠",
                Severity::Failing => "✗",
            };
            writeln!(f, "[{}] {}", symbol, deviation)?;
        }

        let counts = self.counts();
        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} failing, {} warnings, {} informational",
            counts.failing, counts.warning, counts.informational
        )?;
        writeln!(f)?;
        writeln!(f, "{}", self.verdict)
    }
}
