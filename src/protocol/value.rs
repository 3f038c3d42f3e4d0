use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared data type of a protocol parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// A single real number (e.g. RepetitionTime)
    Number,
    /// Free text (e.g. SeriesDescription)
    Text,
    /// An ordered list of real numbers (e.g. multi-echo EchoTime)
    Numbers,
    /// An enumerated token (e.g. PhaseEncodingDirection)
    Token,
}

impl DataType {
    /// All data types, in declaration order
    pub const ALL: [DataType; 4] = [
        DataType::Number,
        DataType::Text,
        DataType::Numbers,
        DataType::Token,
    ];

    /// Keyword used in definition files and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Number => "number",
            DataType::Text => "text",
            DataType::Numbers => "numbers",
            DataType::Token => "token",
        }
    }

    /// True for the numeric data types
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Number | DataType::Numbers)
    }

    /// True for the string-like data types
    pub fn is_textual(&self) -> bool {
        matches!(self, DataType::Text | DataType::Token)
    }

    /// Parse a raw string into a value of this data type.
    ///
    /// Number lists accept whitespace, comma or backslash separators
    /// (the latter is the DICOM multi-value delimiter). Numbers must be
    /// finite. Text and tokens are kept exactly as written; a blank token
    /// is rejected.
    pub fn parse_value(&self, raw: &str) -> Option<ParamValue> {
        let value = match self {
            DataType::Number => ParamValue::Number(parse_finite(raw)?),
            DataType::Text => ParamValue::Text(raw.to_string()),
            DataType::Token => ParamValue::Token(raw.to_string()),
            DataType::Numbers => raw
                .split(|c: char| c.is_whitespace() || c == ',' || c == '\\')
                .filter(|s| !s.is_empty())
                .map(parse_finite)
                .collect::<Option<Vec<_>>>()
                .map(ParamValue::Numbers)?,
        };
        value.invalid_reason().is_none().then_some(value)
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" | "numeric" | "float" => Ok(DataType::Number),
            "text" | "string" => Ok(DataType::Text),
            "numbers" | "list" | "multi" => Ok(DataType::Numbers),
            "token" | "categorical" | "enum" => Ok(DataType::Token),
            other => Err(format!("unknown data type '{}'", other)),
        }
    }
}

/// A protocol parameter value
///
/// `Unspecified` marks a value that the source metadata did not provide.
/// It is never imputed and conforms to every [`DataType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamValue {
    /// A single real number
    Number(f64),
    /// Free text
    Text(String),
    /// An ordered list of real numbers
    Numbers(Vec<f64>),
    /// An enumerated token
    Token(String),
    /// Value not present in the source metadata
    Unspecified,
}

impl ParamValue {
    /// Data type of this value, `None` for `Unspecified`
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            ParamValue::Number(_) => Some(DataType::Number),
            ParamValue::Text(_) => Some(DataType::Text),
            ParamValue::Numbers(_) => Some(DataType::Numbers),
            ParamValue::Token(_) => Some(DataType::Token),
            ParamValue::Unspecified => None,
        }
    }

    /// True if the value conforms to the given data type
    pub fn conforms_to(&self, data_type: DataType) -> bool {
        self.data_type().map_or(true, |t| t == data_type)
    }

    /// True for `Unspecified`
    pub fn is_unspecified(&self) -> bool {
        matches!(self, ParamValue::Unspecified)
    }

    /// Why the value cannot be held by a parameter: a non-finite number or
    /// a blank token. `None` for valid values.
    pub fn invalid_reason(&self) -> Option<String> {
        match self {
            ParamValue::Number(v) if !v.is_finite() => {
                Some(format!("{} is not a finite number", v))
            }
            ParamValue::Numbers(values) => values
                .iter()
                .find(|v| !v.is_finite())
                .map(|v| format!("{} is not a finite number", v)),
            ParamValue::Token(s) if s.trim().is_empty() => Some("token is blank".to_string()),
            _ => None,
        }
    }

    /// Numeric view of the value (a single number is a one-element slice)
    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            ParamValue::Number(v) => Some(std::slice::from_ref(v)),
            ParamValue::Numbers(v) => Some(v),
            _ => None,
        }
    }

    /// String view of text and token values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) | ParamValue::Token(s) => Some(s),
            _ => None,
        }
    }

    /// Equality after type normalization.
    ///
    /// Tokens compare trimmed and case-insensitively, text compares trimmed,
    /// numbers compare numerically. Values of different types are never equal
    /// and `Unspecified` equals nothing, not even itself.
    pub fn normalized_eq(&self, other: &ParamValue) -> bool {
        match (self, other) {
            (ParamValue::Number(a), ParamValue::Number(b)) => a == b,
            (ParamValue::Numbers(a), ParamValue::Numbers(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
            }
            (ParamValue::Text(a), ParamValue::Text(b)) => a.trim() == b.trim(),
            (ParamValue::Token(a), ParamValue::Token(b)) => {
                a.trim().eq_ignore_ascii_case(b.trim())
            }
            _ => false,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(v) => write!(f, "{}", v),
            ParamValue::Text(s) => write!(f, "\"{}\"", s),
            ParamValue::Token(s) => write!(f, "{}", s),
            ParamValue::Numbers(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", x)?;
                }
                write!(f, "]")
            }
            ParamValue::Unspecified => write!(f, "Unspecified"),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        ParamValue::Numbers(v)
    }
}
