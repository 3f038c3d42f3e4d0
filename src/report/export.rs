//! JSON and TSV export of compliance reports
//!
//! The JSON form groups deviations by sequence, then by parameter (`*` for
//! sequence-level deviations), with keys in traversal order:
//!
//! ```json
//! {
//!   "reference": {"name": "ABCD", "version": "3.0"},
//!   "candidate": {"name": "ABCD"},
//!   "verdict": "non_compliant",
//!   "summary": {"failing": 1, "warning": 0, "informational": 0},
//!   "sequences": {
//!     "T1": {"RepetitionTime": [{"kind": "non_compliant", "severity": "failing", ...}]}
//!   }
//! }
//! ```
//!
//! Exports contain no timestamps, so identical reports export identically.

use std::io::Write;

use serde::ser::{SerializeMap, SerializeStruct, Serializer};
use serde::Serialize;

use crate::comparator::Deviation;

use super::ComplianceReport;

/// Key used for deviations that concern a whole sequence
const SEQUENCE_KEY: &str = "*";

/// TSV column header
const TSV_HEADER: [&str; 10] = [
    "sequence",
    "parameter",
    "kind",
    "severity",
    "reference",
    "candidate",
    "reference_unit",
    "candidate_unit",
    "rule",
    "magnitude",
];

/// Serializable view of a [`ComplianceReport`]
#[derive(Debug, Clone, Copy)]
pub struct ReportExport<'a> {
    report: &'a ComplianceReport,
}

impl<'a> ReportExport<'a> {
    pub(crate) fn new(report: &'a ComplianceReport) -> Self {
        Self { report }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write one tab-separated row per deviation, with a header row
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut tsv = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        tsv.write_record(TSV_HEADER)?;

        for d in self.report.iter() {
            let opt = |value: Option<String>| value.unwrap_or_default();
            tsv.write_record([
                d.sequence().to_string(),
                d.parameter().unwrap_or(SEQUENCE_KEY).to_string(),
                d.kind().to_string(),
                d.severity().to_string(),
                opt(d.reference().map(ToString::to_string)),
                opt(d.candidate().map(ToString::to_string)),
                opt(d.reference_unit().map(str::to_string)),
                opt(d.candidate_unit().map(str::to_string)),
                opt(d.rule().map(ToString::to_string)),
                opt(d.magnitude().map(|m| m.to_string())),
            ])?;
        }

        tsv.flush()?;
        Ok(())
    }

    /// TSV as a string
    pub fn to_tsv(&self) -> Result<String, csv::Error> {
        let mut buf = Vec::new();
        self.write_tsv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Deviations grouped by sequence then parameter, in traversal order
    fn grouped(&self) -> Vec<(&'a str, Vec<(&'a str, Vec<&'a Deviation>)>)> {
        let mut sequences: Vec<(&str, Vec<(&str, Vec<&Deviation>)>)> = Vec::new();

        for d in self.report.deviations() {
            let key = d.parameter().unwrap_or(SEQUENCE_KEY);
            let pos = match sequences.iter().position(|(name, _)| *name == d.sequence()) {
                Some(pos) => pos,
                None => {
                    sequences.push((d.sequence(), Vec::new()));
                    sequences.len() - 1
                }
            };
            let params = &mut sequences[pos].1;
            match params.iter_mut().find(|(name, _)| *name == key) {
                Some((_, list)) => list.push(d),
                None => params.push((key, vec![d])),
            }
        }
        sequences
    }
}

impl Serialize for ReportExport<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ComplianceReport", 5)?;
        state.serialize_field("reference", self.report.reference())?;
        state.serialize_field("candidate", self.report.candidate())?;
        state.serialize_field("verdict", &self.report.verdict())?;
        state.serialize_field("summary", &self.report.counts())?;
        state.serialize_field("sequences", &SequenceMap(self.grouped()))?;
        state.end()
    }
}

struct SequenceMap<'a>(Vec<(&'a str, Vec<(&'a str, Vec<&'a Deviation>)>)>);

impl Serialize for SequenceMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (sequence, params) in &self.0 {
            map.serialize_entry(sequence, &ParameterMap(params.as_slice()))?;
        }
        map.end()
    }
}

struct ParameterMap<'a, 'b>(&'b [(&'a str, Vec<&'a Deviation>)]);

impl Serialize for ParameterMap<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (parameter, deviations) in self.0 {
            let details: Vec<Detail<'_>> = deviations.iter().copied().map(Detail).collect();
            map.serialize_entry(parameter, &details)?;
        }
        map.end()
    }
}

/// A deviation without its location, which the surrounding keys carry
struct Detail<'a>(&'a Deviation);

impl Serialize for Detail<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let d = self.0;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("kind", &d.kind())?;
        map.serialize_entry("severity", &d.severity())?;
        if let Some(value) = d.reference() {
            map.serialize_entry("reference", value)?;
        }
        if let Some(value) = d.candidate() {
            map.serialize_entry("candidate", value)?;
        }
        if let Some(unit) = d.reference_unit() {
            map.serialize_entry("reference_unit", unit)?;
        }
        if let Some(unit) = d.candidate_unit() {
            map.serialize_entry("candidate_unit", unit)?;
        }
        if let Some(rule) = d.rule() {
            map.serialize_entry("rule", rule)?;
        }
        if let Some(magnitude) = d.magnitude() {
            map.serialize_entry("magnitude", &magnitude)?;
        }
        map.end()
    }
}
