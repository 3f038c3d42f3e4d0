//! DICOM header adapter
//!
//! Reads DICOM attributes, keyed either by keyword (`RepetitionTime`) or by
//! tag (`(0018,0080)`, `00180080`), as produced by DICOM JSON dumps.
//! Siemens series carry their vendor protocol in the CSA header; when the
//! `MrPhoenixProtocol` text is present its catalogued entries are decoded.

use log::{debug, warn};

use crate::protocol::{ParamValue, Parameter, Sequence, SessionInfo};

use super::catalog::{self, DicomTag, ParameterSource};
use super::csa::PhoenixProtocol;
use super::{catalog_parameters, AdapterError, ProtocolAdapter, RawHeader};

/// Key of the Phoenix protocol text in keyword-keyed headers
const PHOENIX_KEY: &str = "MrPhoenixProtocol";

/// Siemens CSA series header info
const PHOENIX_TAG: DicomTag = DicomTag::new(0x0029, 0x1020);

/// Adapter for DICOM header dumps
#[derive(Debug, Clone, Copy)]
pub struct DicomAdapter {
    decode_csa: bool,
}

impl Default for DicomAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl DicomAdapter {
    /// Adapter decoding the Siemens CSA header when present
    pub fn new() -> Self {
        Self { decode_csa: true }
    }

    /// Adapter ignoring vendor CSA headers
    pub fn without_csa() -> Self {
        Self { decode_csa: false }
    }

    fn phoenix(headers: &[&RawHeader]) -> Option<PhoenixProtocol> {
        headers.iter().find_map(|h| {
            h.get(PHOENIX_KEY)
                .or_else(|| h.get_tag(PHOENIX_TAG))
                .and_then(|raw| raw.as_text())
                .map(|text| PhoenixProtocol::parse(&text))
        })
    }

    fn csa_parameters(headers: &[&RawHeader]) -> Vec<Parameter> {
        let Some(phoenix) = Self::phoenix(headers) else {
            debug!("No Phoenix protocol in header, skipping CSA parameters");
            return Vec::new();
        };

        catalog::CATALOG
            .iter()
            .filter_map(|spec| match spec.source {
                ParameterSource::Csa(key) => Some((spec, key)),
                _ => None,
            })
            .map(|(spec, key)| match phoenix.label(key) {
                Some(label) => Parameter::token(spec.name, label),
                None => Parameter::unspecified(spec.name, spec.data_type),
            })
            .collect()
    }
}

/// `1 / (PixelBandwidth * PhaseEncodingSteps)`, in seconds
fn effective_echo_spacing(parameters: &[Parameter]) -> Option<f64> {
    let value_of = |name: &str| {
        parameters
            .iter()
            .find(|p| p.name() == name)
            .and_then(|p| match p.value() {
                ParamValue::Number(v) => Some(*v),
                _ => None,
            })
    };
    let denominator = value_of("PixelBandwidth")? * value_of("PhaseEncodingSteps")?;
    if denominator == 0.0 || !denominator.is_finite() {
        warn!("Cannot derive EffectiveEchoSpacing from a zero bandwidth-steps product");
        return None;
    }
    Some(1.0 / denominator)
}

impl ProtocolAdapter for DicomAdapter {
    fn source(&self) -> &'static str {
        "DICOM"
    }

    fn sequence(&self, name: &str, headers: &[&RawHeader]) -> Result<Sequence, AdapterError> {
        let mut parameters = catalog_parameters(headers, |_, value| value)?;

        if self.decode_csa {
            for csa in Self::csa_parameters(headers) {
                // Values already present under the parameter name win
                if !parameters.iter().any(|p| p.name() == csa.name()) {
                    parameters.push(csa);
                }
            }
        }

        let derived = "EffectiveEchoSpacing";
        if !parameters.iter().any(|p| p.name() == derived) {
            if let Some(spacing) = effective_echo_spacing(&parameters) {
                let unit = catalog::by_name(derived).and_then(|spec| spec.unit);
                let mut parameter = Parameter::number(derived, spacing);
                if let Some(unit) = unit {
                    parameter = parameter.with_unit(unit);
                }
                parameters.push(parameter);
            }
        }

        Ok(Sequence::new(name, parameters)?)
    }

    fn session(&self, header: &RawHeader) -> Option<SessionInfo> {
        let session = SessionInfo {
            subject_id: header.text("PatientID"),
            session_id: header.text("StudyID"),
            run_id: None,
        };
        (!session.is_empty()).then_some(session)
    }
}
