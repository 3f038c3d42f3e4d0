//! Loading protocols from the supported input kinds.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use log::{debug, info};
use std::path::{Path, PathBuf};

use mrprotocol::adapters::{BidsAdapter, DicomAdapter, ProtocolAdapter, RawHeader};
use mrprotocol::definition::ProtocolDefinition;
use mrprotocol::protocol::Protocol;
use mrprotocol::rules::RuleRegistry;

/// Kind of protocol input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Detect from the path and content
    #[default]
    Auto,
    /// Protocol serialized as JSON
    ProtocolJson,
    /// XML protocol definition
    DefinitionXml,
    /// JSON array of DICOM headers (keywords or tags as keys)
    DicomJson,
    /// BIDS sidecar file, or a directory of sidecars
    Bids,
}

/// A protocol together with rules declared alongside it.
pub struct LoadedProtocol {
    /// The protocol
    pub protocol: Protocol,
    /// Rules from a definition file's `<rules>` block
    pub rules: Option<RuleRegistry>,
}

impl LoadedProtocol {
    fn plain(protocol: Protocol) -> Self {
        Self {
            protocol,
            rules: None,
        }
    }

    /// Base registry, extended by the protocol's own rules
    pub fn registry(&self, mut base: RuleRegistry) -> RuleRegistry {
        if let Some(rules) = &self.rules {
            base.extend(rules.clone());
        }
        base
    }
}

/// Load a protocol. Adapted acquisitions are named after the input file.
pub fn load(path: &Path, format: InputFormat) -> Result<LoadedProtocol> {
    if !path.exists() {
        bail!("Input does not exist: {}", path.display());
    }

    debug!("Loading {} as {:?}", path.display(), format);

    let name = default_name(path);
    let loaded = match format {
        InputFormat::Auto => return load(path, detect(path)?),
        InputFormat::DefinitionXml => {
            let definition = ProtocolDefinition::from_path(path)
                .with_context(|| format!("Failed to read definition {}", path.display()))?;
            LoadedProtocol {
                protocol: definition.protocol,
                rules: Some(definition.rules),
            }
        }
        InputFormat::ProtocolJson => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let protocol = Protocol::from_json(&json)
                .with_context(|| format!("Invalid protocol JSON in {}", path.display()))?;
            LoadedProtocol::plain(protocol)
        }
        InputFormat::DicomJson => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let headers: Vec<RawHeader> = serde_json::from_str(&json)
                .with_context(|| format!("Expected a JSON array of headers in {}", path.display()))?;
            let protocol = DicomAdapter::new()
                .protocol(&name, &headers)
                .with_context(|| format!("Failed to adapt DICOM headers from {}", path.display()))?;
            LoadedProtocol::plain(protocol)
        }
        InputFormat::Bids => {
            let sidecars = bids_sidecars(path)?;
            let protocol = BidsAdapter::new()
                .load_protocol(&name, &sidecars)
                .with_context(|| format!("Failed to adapt BIDS sidecars from {}", path.display()))?;
            LoadedProtocol::plain(protocol)
        }
    };

    info!(
        "Loaded {} ({} sequences, {} parameters)",
        loaded.protocol.label(),
        loaded.protocol.len(),
        loaded.protocol.parameter_count()
    );
    Ok(loaded)
}

/// Input kind from the path: directories are BIDS, `.xml` files are
/// definitions, JSON files are told apart by their top-level shape.
fn detect(path: &Path) -> Result<InputFormat> {
    if path.is_dir() {
        return Ok(InputFormat::Bids);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("xml") => Ok(InputFormat::DefinitionXml),
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&json)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?;
            Ok(match value {
                serde_json::Value::Array(_) => InputFormat::DicomJson,
                serde_json::Value::Object(map) if map.contains_key("sequences") => {
                    InputFormat::ProtocolJson
                }
                _ => InputFormat::Bids,
            })
        }
        _ => bail!(
            "Cannot detect the input format of {}; pass --format",
            path.display()
        ),
    }
}

/// The file itself, or the `.json` files of a directory in name order
fn bids_sidecars(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut sidecars = Vec::new();
    for entry in std::fs::read_dir(path)
        .with_context(|| format!("Failed to list {}", path.display()))?
    {
        let entry_path = entry?.path();
        if entry_path.extension().is_some_and(|e| e == "json") {
            sidecars.push(entry_path);
        }
    }
    if sidecars.is_empty() {
        bail!("No BIDS sidecars found in {}", path.display());
    }
    sidecars.sort();
    Ok(sidecars)
}

fn default_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .and_then(|n| n.split('.').next().map(str::to_string))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "acquisition".to_string())
}
