use crate::protocol::ProtocolError;

/// Errors raised while turning raw metadata into protocols
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A header value cannot be converted to the parameter's data type
    #[error("Invalid value for {parameter}: {reason}")]
    InvalidValue {
        /// Parameter name
        parameter: String,
        /// Why conversion failed
        reason: String,
    },

    /// A header has no name to group it into a sequence
    #[error("Cannot determine the sequence name of header #{0}")]
    MissingSequenceName(usize),

    /// Malformed DICOM tag
    #[error("Invalid DICOM tag: {0}")]
    InvalidTag(String),

    /// The metadata document is not the expected JSON shape
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The adapted protocol is invalid
    #[error("Invalid protocol: {0}")]
    Protocol(#[from] ProtocolError),
}
