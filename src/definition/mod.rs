//! # Protocol Definition Files
//!
//! Reference protocols are authored as XML documents:
//!
//! ```xml
//! <protocol name="ABCD" version="3.0">
//!   <rules>
//!     <rule type="number" kind="tolerance" tolerance="0.001"/>
//!     <rule parameter="FlipAngle" kind="tolerance" tolerance="5" severity="warning"/>
//!   </rules>
//!   <sequence name="T1">
//!     <parameter name="RepetitionTime" type="number" unit="ms" value="2000">
//!       <rule kind="tolerance" tolerance="50"/>
//!     </parameter>
//!     <parameter name="EchoTime" type="numbers" unit="ms" value="2.5 5.0"/>
//!     <parameter name="PhaseEncodingDirection" type="token" value="j-">
//!       <rule kind="set"><allowed value="j"/><allowed value="j-"/></rule>
//!     </parameter>
//!     <parameter name="SeriesDescription" type="text" value="t1_mprage" required="false">
//!       <rule kind="pattern" pattern="t1_.*"/>
//!     </parameter>
//!   </sequence>
//! </protocol>
//! ```
//!
//! A parameter without `value` is unspecified. Rule kinds are `exact`,
//! `tolerance` (with `tolerance` and optional `mode="relative"`), `set`
//! (with `<allowed>` children), `pattern`, `ignore` and `coil`; every rule
//! takes an optional `severity`. An optional `<session subject=".."
//! session=".." run=".."/>` element identifies an acquired protocol.
//!
//! Rules under `<rules>` are returned as a [`RuleRegistry`] without a global
//! default, meant to be layered over a base registry with
//! [`ProtocolDefinition::registry`].
//!
//! ## Usage
//!
//! ```rust
//! use mrprotocol::definition::ProtocolDefinition;
//!
//! let xml = r#"<protocol name="ABCD">
//!   <sequence name="T1">
//!     <parameter name="FlipAngle" type="number" unit="deg" value="8"/>
//!   </sequence>
//! </protocol>"#;
//!
//! let definition = ProtocolDefinition::from_str(xml)?;
//! assert_eq!(definition.protocol.parameter_count(), 1);
//! # Ok::<(), mrprotocol::definition::DefinitionError>(())
//! ```

use std::io::BufRead;
use std::path::Path;

use crate::protocol::Protocol;
use crate::rules::RuleRegistry;

mod error;
mod helpers;
mod reader;
mod writer;


pub use error::DefinitionError;

/// A protocol loaded from a definition file together with its rules
#[derive(Debug, Clone)]
pub struct ProtocolDefinition {
    /// The protocol
    pub protocol: Protocol,
    /// Rules declared under `<rules>`; no global default
    pub rules: RuleRegistry,
}

impl ProtocolDefinition {
    /// Definition without extra rules
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            rules: RuleRegistry::strict(),
        }
    }

    /// Attach registry rules
    pub fn with_rules(mut self, rules: RuleRegistry) -> Self {
        self.rules = rules;
        self
    }

    /// Parse a definition from an XML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(xml: &str) -> Result<Self, DefinitionError> {
        reader::from_str(xml)
    }

    /// Parse a definition from a buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, DefinitionError> {
        reader::from_reader(reader)
    }

    /// Load a definition file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DefinitionError> {
        reader::from_path(path)
    }

    /// Serialize to indented XML
    pub fn to_xml(&self) -> Result<String, DefinitionError> {
        writer::to_string(self)
    }

    /// Write to a file
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), DefinitionError> {
        writer::to_path(self, path)
    }

    /// `base` with this definition's rules layered on top
    pub fn registry(&self, mut base: RuleRegistry) -> RuleRegistry {
        base.extend(self.rules.clone());
        base
    }
}
