use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Parameter, ProtocolError, Sequence};

/// Subject/session/run identifiers of an acquired protocol
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Subject identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    /// Session identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Run identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl SessionInfo {
    /// Session info for a subject
    pub fn subject(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: Some(subject_id.into()),
            ..Default::default()
        }
    }

    /// True when no identifier is set
    pub fn is_empty(&self) -> bool {
        self.subject_id.is_none() && self.session_id.is_none() && self.run_id.is_none()
    }
}

impl fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            ("sub", &self.subject_id),
            ("ses", &self.session_id),
            ("run", &self.run_id),
        ]
        .iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| format!("{}-{}", key, v)))
        .collect();
        f.write_str(&parts.join("_"))
    }
}

/// An imaging protocol: an ordered collection of uniquely named sequences
///
/// The protocol owns its sequences. Lookups by sequence name go through a
/// name index built once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ProtocolRepr")]
pub struct Protocol {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<SessionInfo>,
    sequences: Vec<Sequence>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct ProtocolRepr {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    session: Option<SessionInfo>,
    #[serde(default)]
    sequences: Vec<Sequence>,
}

impl TryFrom<ProtocolRepr> for Protocol {
    type Error = ProtocolError;

    fn try_from(repr: ProtocolRepr) -> Result<Self, Self::Error> {
        let protocol = Protocol::new(repr.name, repr.version, repr.sequences)?;
        Ok(match repr.session {
            Some(session) => protocol.with_session(session),
            None => protocol,
        })
    }
}

impl PartialEq for Protocol {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.session == other.session
            && self.sequences == other.sequences
    }
}

impl Protocol {
    /// Create a protocol; sequence names must be unique
    pub fn new(
        name: impl Into<String>,
        version: Option<String>,
        sequences: Vec<Sequence>,
    ) -> Result<Self, ProtocolError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProtocolError::EmptyName("protocol"));
        }

        let mut index = HashMap::with_capacity(sequences.len());
        for (i, seq) in sequences.iter().enumerate() {
            if index.insert(seq.name().to_string(), i).is_some() {
                return Err(ProtocolError::DuplicateName {
                    kind: "sequence",
                    name: seq.name().to_string(),
                    container: name,
                });
            }
        }

        Ok(Self {
            name,
            version,
            session: None,
            sequences,
            index,
        })
    }

    /// Attach session identifiers
    pub fn with_session(mut self, session: SessionInfo) -> Self {
        self.session = if session.is_empty() { None } else { Some(session) };
        self
    }

    /// Protocol name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Protocol version
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Session identifiers, if known
    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    /// Look up a sequence by name
    pub fn sequence(&self, name: &str) -> Option<&Sequence> {
        self.index.get(name).map(|&i| &self.sequences[i])
    }

    /// Look up a parameter by sequence and parameter name
    pub fn parameter(&self, sequence: &str, parameter: &str) -> Option<&Parameter> {
        self.sequence(sequence)?.parameter(parameter)
    }

    /// True if a sequence with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Sequences in declaration order
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Number of sequences
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// True if the protocol has no sequences
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Total number of parameters over all sequences
    pub fn parameter_count(&self) -> usize {
        self.sequences.iter().map(Sequence::len).sum()
    }

    /// `name` or `name vversion`
    pub fn label(&self) -> String {
        match &self.version {
            Some(v) => format!("{} v{}", self.name, v),
            None => self.name.clone(),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON, revalidating names and types
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label())?;
        for seq in &self.sequences {
            writeln!(f, "  {}", seq)?;
        }
        Ok(())
    }
}

/// Builder for [`Protocol`]
#[derive(Debug, Clone)]
pub struct ProtocolBuilder {
    name: String,
    version: Option<String>,
    session: Option<SessionInfo>,
    sequences: Vec<Sequence>,
}

impl ProtocolBuilder {
    /// Start a protocol with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            session: None,
            sequences: Vec::new(),
        }
    }

    /// Set the version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set session identifiers
    pub fn session(mut self, session: SessionInfo) -> Self {
        self.session = Some(session);
        self
    }

    /// Append a sequence
    pub fn sequence(mut self, sequence: Sequence) -> Self {
        self.sequences.push(sequence);
        self
    }

    /// Validate names and build the protocol
    pub fn build(self) -> Result<Protocol, ProtocolError> {
        let protocol = Protocol::new(self.name, self.version, self.sequences)?;
        Ok(match self.session {
            Some(session) => protocol.with_session(session),
            None => protocol,
        })
    }
}
