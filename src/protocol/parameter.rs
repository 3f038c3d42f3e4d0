use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rules::RuleConfig;

use super::{DataType, ParamValue, ProtocolError};

/// A single named, typed, unit-aware protocol value
///
/// Parameters are immutable once built: the `with_*` methods consume the
/// parameter and return a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParameterRepr")]
pub struct Parameter {
    name: String,
    data_type: DataType,
    value: ParamValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<RuleConfig>,
    required: bool,
}

#[derive(Deserialize)]
struct ParameterRepr {
    name: String,
    data_type: DataType,
    value: ParamValue,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    rule: Option<RuleConfig>,
    #[serde(default = "default_required")]
    required: bool,
}

fn default_required() -> bool {
    true
}

impl TryFrom<ParameterRepr> for Parameter {
    type Error = ProtocolError;

    fn try_from(repr: ParameterRepr) -> Result<Self, Self::Error> {
        let mut param = Parameter::new(repr.name, repr.data_type, repr.value)?;
        param.unit = repr.unit;
        param.rule = repr.rule;
        param.required = repr.required;
        Ok(param)
    }
}

impl Parameter {
    /// Create a parameter, checking the value against the declared data type
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        value: ParamValue,
    ) -> Result<Self, ProtocolError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProtocolError::EmptyName("parameter"));
        }
        if let Some(found) = value.data_type() {
            if found != data_type {
                return Err(ProtocolError::TypeMismatch {
                    parameter: name,
                    expected: data_type,
                    found,
                });
            }
        }
        let param = Self::of(name, data_type, value);
        param.check_value()?;
        Ok(param)
    }

    /// Fails if the value is not finite or is a blank token
    pub(crate) fn check_value(&self) -> Result<(), ProtocolError> {
        match self.value.invalid_reason() {
            Some(reason) => Err(ProtocolError::InvalidValue {
                parameter: self.name.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    fn of(name: impl Into<String>, data_type: DataType, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            data_type,
            value,
            unit: None,
            rule: None,
            required: true,
        }
    }

    /// Numeric parameter.
    ///
    /// The typed constructors do not validate; a non-finite number or blank
    /// token is rejected when the parameter is added to a [`Sequence`](super::Sequence).
    pub fn number(name: impl Into<String>, value: f64) -> Self {
        Self::of(name, DataType::Number, ParamValue::Number(value))
    }

    /// Number-list parameter
    pub fn numbers(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::of(name, DataType::Numbers, ParamValue::Numbers(values))
    }

    /// Free-text parameter
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::of(name, DataType::Text, ParamValue::Text(value.into()))
    }

    /// Enumerated-token parameter
    pub fn token(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::of(name, DataType::Token, ParamValue::Token(value.into()))
    }

    /// Parameter whose value the source did not provide
    pub fn unspecified(name: impl Into<String>, data_type: DataType) -> Self {
        Self::of(name, data_type, ParamValue::Unspecified)
    }

    /// Attach a unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attach an explicit equivalence rule
    pub fn with_rule(mut self, rule: RuleConfig) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Mark the parameter as optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set the required flag
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared data type
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Parameter value
    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    /// Unit, if any
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Explicit rule embedded in the parameter, if any
    pub fn rule(&self) -> Option<&RuleConfig> {
        self.rule.as_ref()
    }

    /// Whether the parameter must be present in a compliant candidate
    pub fn is_required(&self) -> bool {
        self.required
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) if !self.value.is_unspecified() => {
                write!(f, "{}={} {}", self.name, self.value, unit)
            }
            _ => write!(f, "{}={}", self.name, self.value),
        }
    }
}
