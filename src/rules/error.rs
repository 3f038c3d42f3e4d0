use crate::protocol::DataType;

/// Errors raised by rule configuration and rule resolution
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    /// No applicable rule governs the parameter
    #[error("No applicable rule for parameter '{parameter}' ({data_type}): {reason}")]
    NoRule {
        /// Parameter name
        parameter: String,
        /// Data type of the parameter
        data_type: DataType,
        /// Why resolution failed
        reason: String,
    },

    /// Tolerance is negative or not a finite number
    #[error("Invalid tolerance {0}: must be a finite, non-negative number")]
    InvalidTolerance(f64),

    /// Pattern is not a valid regular expression
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Regex compiler message
        message: String,
    },

    /// A rule cannot govern parameters of the given type
    #[error("Rule '{rule}' cannot be applied to {data_type} parameters")]
    Inapplicable {
        /// Rule kind
        rule: &'static str,
        /// Data type it was registered for
        data_type: DataType,
    },
}
