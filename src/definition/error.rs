use crate::protocol::ProtocolError;
use crate::rules::RuleError;

/// Errors that can occur while reading or writing protocol definitions
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// Error parsing or writing XML
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// Attribute value with a malformed entity reference
    #[error("XML escape error: {0}")]
    EscapeError(#[from] quick_xml::escape::EscapeError),

    /// Attribute or text that is not valid UTF-8
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid document structure
    #[error("Invalid definition structure: {0}")]
    InvalidStructure(String),

    /// Required XML attribute is missing
    #[error("Missing required attribute: {0}")]
    MissingAttribute(String),

    /// Invalid value for an XML attribute
    #[error("Invalid attribute value: {0}")]
    InvalidAttributeValue(String),

    /// Written XML is not valid UTF-8
    #[error("UTF-8 encoding error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// The protocol described by the document is invalid
    #[error("Invalid protocol: {0}")]
    Protocol(#[from] ProtocolError),

    /// A rule described by the document is invalid
    #[error("Invalid rule: {0}")]
    Rule(#[from] RuleError),
}
