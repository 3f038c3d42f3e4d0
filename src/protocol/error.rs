use super::DataType;

/// Errors raised while constructing the protocol data model
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    /// A value does not match the data type declared for its parameter
    #[error("Type mismatch for parameter '{parameter}': declared {expected}, got {found}")]
    TypeMismatch {
        /// Parameter name
        parameter: String,
        /// Declared data type
        expected: DataType,
        /// Data type of the supplied value
        found: DataType,
    },

    /// A value a parameter cannot hold (non-finite number, blank token)
    #[error("Invalid value for parameter '{parameter}': {reason}")]
    InvalidValue {
        /// Parameter name
        parameter: String,
        /// What is wrong with the value
        reason: String,
    },

    /// Two children of the same container share a name
    #[error("Duplicate {kind} name '{name}' in '{container}'")]
    DuplicateName {
        /// What was duplicated ("parameter" or "sequence")
        kind: &'static str,
        /// The duplicated name
        name: String,
        /// Name of the enclosing sequence or protocol
        container: String,
    },

    /// A name is empty or whitespace only
    #[error("Empty {0} name")]
    EmptyName(&'static str),
}
