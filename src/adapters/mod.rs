//! # Protocol Adapters
//!
//! Adapters turn already-extracted, modality-specific metadata into
//! [`Protocol`]s. They never read binary imaging formats: their input is a
//! [`RawHeader`], an ordered map from DICOM keyword, BIDS field or DICOM tag
//! to a loosely typed [`RawValue`], typically loaded from JSON.
//!
//! Values missing from the metadata are never imputed. Core parameters
//! (repetition time, echo time, flip angle, phase encoding direction,
//! scanning sequence) are always reported and marked
//! [`ParamValue::Unspecified`] when absent; other catalogue parameters are
//! reported only when present.
//!
//! ## Usage
//!
//! ```rust
//! use mrprotocol::adapters::{DicomAdapter, ProtocolAdapter, RawHeader};
//!
//! let header = RawHeader::from_json(r#"{
//!     "SeriesDescription": "t1_mprage",
//!     "RepetitionTime": 2300,
//!     "(0018,0081)": 2.98,
//!     "FlipAngle": 9
//! }"#)?;
//!
//! let protocol = DicomAdapter::new().protocol("acquired", &[header])?;
//! let tr = protocol.parameter("t1_mprage", "RepetitionTime").unwrap();
//! assert_eq!(tr.unit(), Some("ms"));
//! # Ok::<(), mrprotocol::adapters::AdapterError>(())
//! ```

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::protocol::{DataType, ParamValue, Parameter, Protocol, Sequence, SessionInfo};

pub mod catalog;
mod bids;
mod csa;
mod dicom;
mod error;

#[cfg(test)]
mod tests;

pub use bids::{session_from_path, BidsAdapter};
pub use catalog::{DicomTag, ParameterSource, ParameterSpec};
pub use csa::PhoenixProtocol;
pub use dicom::DicomAdapter;
pub use error::AdapterError;

/// A loosely typed metadata value
///
/// Deserializes from plain JSON values and from DICOM JSON model elements
/// (`{"vr": "DS", "Value": [2000]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Explicit null
    Null,
    /// Boolean flag
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    Text(String),
    /// Multi-valued attribute
    List(Vec<RawValue>),
    /// DICOM JSON model element
    Element {
        /// Value representation
        vr: String,
        /// Values, absent for empty elements
        #[serde(rename = "Value", default)]
        value: Vec<RawValue>,
    },
    /// Any other object
    Object(BTreeMap<String, RawValue>),
}

impl RawValue {
    /// Convert to a parameter value of the given type.
    ///
    /// Null, empty strings and empty lists are `Unspecified`. Lists become
    /// number lists, or backslash-joined strings for textual types.
    pub fn to_param(&self, data_type: DataType) -> Result<ParamValue, String> {
        match self {
            RawValue::Null => Ok(ParamValue::Unspecified),
            RawValue::Bool(b) => match data_type {
                DataType::Text => Ok(ParamValue::Text(b.to_string())),
                DataType::Token => Ok(ParamValue::Token(b.to_string())),
                DataType::Number => Ok(ParamValue::Number(f64::from(u8::from(*b)))),
                DataType::Numbers => Ok(ParamValue::Numbers(vec![f64::from(u8::from(*b))])),
            },
            RawValue::Number(n) => Ok(match data_type {
                DataType::Number => ParamValue::Number(*n),
                DataType::Numbers => ParamValue::Numbers(vec![*n]),
                DataType::Text => ParamValue::Text(n.to_string()),
                DataType::Token => ParamValue::Token(n.to_string()),
            }),
            RawValue::Text(s) if s.trim().is_empty() => Ok(ParamValue::Unspecified),
            RawValue::Text(s) => data_type
                .parse_value(s.trim())
                .ok_or_else(|| format!("'{}' is not a valid {}", s, data_type)),
            RawValue::List(items) | RawValue::Element { value: items, .. } => {
                list_to_param(items, data_type)
            }
            RawValue::Object(_) => Err("nested objects are not supported".to_string()),
        }
    }

    /// Numeric view of a scalar value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            RawValue::Text(s) => s.trim().parse().ok().filter(|v: &f64| v.is_finite()),
            RawValue::List(items) | RawValue::Element { value: items, .. } if items.len() == 1 => {
                items[0].as_f64()
            }
            _ => None,
        }
    }

    /// String view of a scalar value
    pub fn as_text(&self) -> Option<String> {
        match self.to_param(DataType::Text) {
            Ok(ParamValue::Text(s)) => Some(s),
            _ => None,
        }
    }
}

fn list_to_param(items: &[RawValue], data_type: DataType) -> Result<ParamValue, String> {
    match items {
        [] => Ok(ParamValue::Unspecified),
        [single] => single.to_param(data_type),
        many => match data_type {
            DataType::Numbers => many
                .iter()
                .map(|item| {
                    item.as_f64()
                        .ok_or_else(|| format!("list item {:?} is not a number", item))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(ParamValue::Numbers),
            DataType::Number => Err(format!("expected a single value, found {}", many.len())),
            DataType::Text | DataType::Token => {
                let parts = many
                    .iter()
                    .map(|item| {
                        item.as_text()
                            .ok_or_else(|| format!("list item {:?} is not a string", item))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                data_type
                    .parse_value(&parts.join("\\"))
                    .ok_or_else(|| format!("'{}' is not a valid {}", parts.join("\\"), data_type))
            }
        },
    }
}

/// Raw metadata of one image series: keyword, field or tag → value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawHeader {
    entries: BTreeMap<String, RawValue>,
}

impl RawHeader {
    /// Empty header
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object
    pub fn from_json(json: &str) -> Result<Self, AdapterError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Insert (or replace) an entry
    pub fn insert(&mut self, key: impl Into<String>, value: RawValue) -> Option<RawValue> {
        self.entries.insert(key.into(), value)
    }

    /// Chainable form of [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: RawValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Entry under an exact key
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.entries.get(key)
    }

    /// Entry stored under a DICOM tag, in any accepted tag spelling
    pub fn get_tag(&self, tag: DicomTag) -> Option<&RawValue> {
        self.entries
            .iter()
            .find(|(key, _)| key.parse::<DicomTag>().is_ok_and(|t| t == tag))
            .map(|(_, value)| value)
    }

    /// Entry for a catalogue parameter, by name first and then by tag
    pub fn find(&self, spec: &ParameterSpec) -> Option<&RawValue> {
        self.get(spec.name)
            .or_else(|| spec.tag().and_then(|tag| self.get_tag(tag)))
    }

    /// Non-empty string value under a key
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(RawValue::as_text)
            .filter(|s| !s.trim().is_empty())
    }

    /// True if the key is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the header has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for RawHeader {
    fn from_iter<I: IntoIterator<Item = (K, RawValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Maps modality-specific metadata to protocols
pub trait ProtocolAdapter {
    /// Short name of the metadata source, for logging
    fn source(&self) -> &'static str;

    /// Build one sequence from the headers of a series.
    ///
    /// Multi-echo series contribute one header per echo.
    fn sequence(&self, name: &str, headers: &[&RawHeader]) -> Result<Sequence, AdapterError>;

    /// Name of the sequence a header belongs to
    fn sequence_name(&self, header: &RawHeader) -> Option<String> {
        header
            .text("SeriesDescription")
            .or_else(|| header.text("ProtocolName"))
    }

    /// Session identifiers found in a header
    fn session(&self, _header: &RawHeader) -> Option<SessionInfo> {
        None
    }

    /// Build a protocol from series headers.
    ///
    /// Headers are grouped into sequences by [`sequence_name`](Self::sequence_name),
    /// in first-seen order.
    fn protocol(&self, name: &str, headers: &[RawHeader]) -> Result<Protocol, AdapterError> {
        let mut groups: Vec<(String, Vec<&RawHeader>)> = Vec::new();
        for (i, header) in headers.iter().enumerate() {
            let seq_name = self
                .sequence_name(header)
                .ok_or(AdapterError::MissingSequenceName(i))?;
            match groups.iter_mut().find(|(n, _)| *n == seq_name) {
                Some((_, members)) => members.push(header),
                None => groups.push((seq_name, vec![header])),
            }
        }

        let sequences = groups
            .iter()
            .map(|(seq_name, members)| {
                debug!("Adapting {} header(s) for sequence '{}'", members.len(), seq_name);
                self.sequence(seq_name, members)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut protocol = Protocol::new(name, None, sequences)?;
        if let Some(session) = headers.iter().find_map(|h| self.session(h)) {
            protocol = protocol.with_session(session);
        }
        info!(
            "Adapted {} {} header(s) into {} sequence(s)",
            headers.len(),
            self.source(),
            protocol.len()
        );
        Ok(protocol)
    }
}

/// Catalogue parameters found in a series.
///
/// Echo times are gathered from every header, sorted and deduplicated.
/// Core parameters missing from all headers are reported as unspecified.
/// `convert` adjusts each value after type conversion.
pub(crate) fn catalog_parameters(
    headers: &[&RawHeader],
    convert: impl Fn(&ParameterSpec, ParamValue) -> ParamValue,
) -> Result<Vec<Parameter>, AdapterError> {
    let mut parameters = Vec::new();

    for spec in catalog::CATALOG {
        let value = if spec.name == "EchoTime" {
            echo_times(headers, spec)?
        } else {
            match headers.iter().find_map(|h| h.find(spec)) {
                Some(raw) => Some(to_param(spec, raw)?),
                None => None,
            }
        };

        let value = match value {
            Some(value) => convert(spec, value),
            None if spec.core => ParamValue::Unspecified,
            None => continue,
        };

        check_allowed(spec, &value)?;
        let mut parameter = Parameter::new(spec.name, spec.data_type, value)?;
        if let Some(unit) = spec.unit {
            parameter = parameter.with_unit(unit);
        }
        parameters.push(parameter);
    }

    Ok(parameters)
}

/// Reject tokens outside the catalogue's allowed set
fn check_allowed(spec: &ParameterSpec, value: &ParamValue) -> Result<(), AdapterError> {
    let (Some(allowed), ParamValue::Token(token)) = (catalog::allowed_tokens(spec.name), value)
    else {
        return Ok(());
    };
    if allowed.contains(&token.as_str()) {
        return Ok(());
    }
    Err(AdapterError::InvalidValue {
        parameter: spec.name.to_string(),
        reason: format!("'{}' is not one of {}", token, allowed.join(", ")),
    })
}

fn to_param(spec: &ParameterSpec, raw: &RawValue) -> Result<ParamValue, AdapterError> {
    raw.to_param(spec.data_type)
        .map_err(|reason| AdapterError::InvalidValue {
            parameter: spec.name.to_string(),
            reason,
        })
}

fn echo_times(
    headers: &[&RawHeader],
    spec: &ParameterSpec,
) -> Result<Option<ParamValue>, AdapterError> {
    let mut values = Vec::new();
    for raw in headers.iter().filter_map(|h| h.find(spec)) {
        if let Some(numbers) = to_param(spec, raw)?.as_numbers() {
            values.extend_from_slice(numbers);
        }
    }
    if values.is_empty() {
        return Ok(None);
    }
    values.sort_by(f64::total_cmp);
    values.dedup();
    Ok(Some(ParamValue::Numbers(values)))
}
