use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Parameter, ProtocolError};

/// A named, ordered group of parameters describing one acquisition run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SequenceRepr")]
pub struct Sequence {
    name: String,
    parameters: Vec<Parameter>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct SequenceRepr {
    name: String,
    #[serde(default)]
    parameters: Vec<Parameter>,
}

impl TryFrom<SequenceRepr> for Sequence {
    type Error = ProtocolError;

    fn try_from(repr: SequenceRepr) -> Result<Self, Self::Error> {
        Sequence::new(repr.name, repr.parameters)
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.parameters == other.parameters
    }
}

impl Sequence {
    /// Create a sequence; parameter names must be unique and values valid
    pub fn new(name: impl Into<String>, parameters: Vec<Parameter>) -> Result<Self, ProtocolError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProtocolError::EmptyName("sequence"));
        }

        let mut index = HashMap::with_capacity(parameters.len());
        for (i, param) in parameters.iter().enumerate() {
            param.check_value()?;
            if index.insert(param.name().to_string(), i).is_some() {
                return Err(ProtocolError::DuplicateName {
                    kind: "parameter",
                    name: param.name().to_string(),
                    container: name,
                });
            }
        }

        Ok(Self {
            name,
            parameters,
            index,
        })
    }

    /// Sequence name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.index.get(name).map(|&i| &self.parameters[i])
    }

    /// True if a parameter with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Iterate over parameters in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.parameters.iter()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// True if the sequence holds no parameters
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}

/// Builder for [`Sequence`]
#[derive(Debug, Clone)]
pub struct SequenceBuilder {
    name: String,
    parameters: Vec<Parameter>,
}

impl SequenceBuilder {
    /// Start a sequence with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Append several parameters
    pub fn parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// Validate names and build the sequence
    pub fn build(self) -> Result<Sequence, ProtocolError> {
        Sequence::new(self.name, self.parameters)
    }
}
