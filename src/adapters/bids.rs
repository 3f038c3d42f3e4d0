//! BIDS sidecar adapter
//!
//! BIDS JSON sidecars use the DICOM keywords as field names but store
//! timing in seconds. Timing values are converted to the catalogue's
//! milliseconds; every other field is taken as is.

use std::path::Path;

use log::debug;

use crate::protocol::{ParamValue, Protocol, Sequence, SessionInfo};

use super::{catalog_parameters, AdapterError, ParameterSpec, ProtocolAdapter, RawHeader, RawValue};

/// Sidecar fields stored in seconds
const SECONDS_FIELDS: [&str; 3] = ["RepetitionTime", "EchoTime", "InversionTime"];

/// Adapter for BIDS JSON sidecars
#[derive(Debug, Clone, Copy, Default)]
pub struct BidsAdapter;

impl BidsAdapter {
    /// Adapter instance
    pub fn new() -> Self {
        Self
    }

    /// Load a sidecar file.
    ///
    /// Sidecars naming neither `SeriesDescription` nor `ProtocolName` get
    /// their file suffix (`T1w`, `bold`, ...) as `ProtocolName`.
    pub fn load_sidecar(path: impl AsRef<Path>) -> Result<RawHeader, AdapterError> {
        let path = path.as_ref();
        let mut header = RawHeader::from_json(&std::fs::read_to_string(path)?)?;
        if header.text("SeriesDescription").is_none() && header.text("ProtocolName").is_none() {
            if let Some(suffix) = file_suffix(path) {
                debug!("Naming sidecar {} after its suffix '{}'", path.display(), suffix);
                header.insert("ProtocolName", RawValue::Text(suffix));
            }
        }
        Ok(header)
    }

    /// Build a protocol from sidecar files; session identifiers come from
    /// the entities of the first file name
    pub fn load_protocol<P: AsRef<Path>>(
        &self,
        name: &str,
        paths: &[P],
    ) -> Result<Protocol, AdapterError> {
        let headers = paths
            .iter()
            .map(Self::load_sidecar)
            .collect::<Result<Vec<_>, _>>()?;
        let mut protocol = self.protocol(name, &headers)?;
        if let Some(session) = paths.first().and_then(|p| session_from_path(p.as_ref())) {
            protocol = protocol.with_session(session);
        }
        Ok(protocol)
    }
}

/// Subject, session and run entities of a BIDS file name, e.g.
/// `sub-01_ses-pre_run-2_T1w.json`
pub fn session_from_path(path: &Path) -> Option<SessionInfo> {
    let stem = path.file_name()?.to_str()?.split('.').next()?;
    let mut session = SessionInfo::default();
    for entity in stem.split('_') {
        match entity.split_once('-') {
            Some(("sub", value)) => session.subject_id = Some(value.to_string()),
            Some(("ses", value)) => session.session_id = Some(value.to_string()),
            Some(("run", value)) => session.run_id = Some(value.to_string()),
            _ => {}
        }
    }
    (!session.is_empty()).then_some(session)
}

/// Last `_`-separated part of the file name without extensions
fn file_suffix(path: &Path) -> Option<String> {
    let stem = path.file_name()?.to_str()?.split('.').next()?;
    stem.rsplit('_')
        .next()
        .filter(|s| !s.is_empty() && !s.contains('-'))
        .map(str::to_string)
}

fn seconds_to_ms(spec: &ParameterSpec, value: ParamValue) -> ParamValue {
    if !SECONDS_FIELDS.contains(&spec.name) {
        return value;
    }
    match value {
        ParamValue::Number(v) => ParamValue::Number(v * 1000.0),
        ParamValue::Numbers(v) => ParamValue::Numbers(v.into_iter().map(|x| x * 1000.0).collect()),
        other => other,
    }
}

impl ProtocolAdapter for BidsAdapter {
    fn source(&self) -> &'static str {
        "BIDS"
    }

    fn sequence(&self, name: &str, headers: &[&RawHeader]) -> Result<Sequence, AdapterError> {
        let parameters = catalog_parameters(headers, seconds_to_ms)?;
        Ok(Sequence::new(name, parameters)?)
    }
}
