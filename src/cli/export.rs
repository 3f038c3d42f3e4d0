use anyhow::{Context, Result};
use clap::ValueEnum;
use log::info;
use std::path::PathBuf;

use mrprotocol::definition::ProtocolDefinition;

use super::input::{self, InputFormat};
use super::write_output;

/// Target form of an exported protocol
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// XML protocol definition
    #[default]
    Xml,
    /// Protocol JSON
    Json,
}

/// Write a protocol as a reference definition, e.g. to promote an
/// acquisition to the reference for later sessions
pub fn run(
    input: PathBuf,
    output: Option<PathBuf>,
    from: InputFormat,
    to: ExportFormat,
    name: Option<String>,
    version: Option<String>,
) -> Result<()> {
    let loaded = input::load(&input, from).context("Failed to load protocol")?;

    let mut protocol = loaded.protocol;
    if name.is_some() || version.is_some() {
        let sequences = protocol.sequences().to_vec();
        let session = protocol.session().cloned();
        let renamed = mrprotocol::protocol::Protocol::new(
            name.unwrap_or_else(|| protocol.name().to_string()),
            version.or_else(|| protocol.version().map(str::to_string)),
            sequences,
        )?;
        protocol = match session {
            Some(session) => renamed.with_session(session),
            None => renamed,
        };
    }

    let rendered = match to {
        ExportFormat::Xml => {
            let mut definition = ProtocolDefinition::new(protocol);
            if let Some(rules) = loaded.rules {
                definition = definition.with_rules(rules);
            }
            definition.to_xml().context("Failed to write XML definition")?
        }
        ExportFormat::Json => protocol.to_json().context("Failed to write protocol JSON")?,
    };
    write_output(&rendered, output.as_deref())?;

    info!("Exported {} ({} bytes)", input.display(), rendered.len());
    Ok(())
}
