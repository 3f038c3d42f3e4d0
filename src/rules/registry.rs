use std::collections::HashMap;
use std::fmt;

use crate::protocol::{DataType, Parameter};

use super::{EquivalenceRule, RuleConfig, RuleError, Tolerance};

/// Where a resolved rule came from, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleSource {
    /// Embedded in the reference parameter
    Parameter,
    /// Registered for the parameter name
    Name,
    /// Registered for the parameter's data type
    Type,
    /// Registry-wide default
    Global,
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleSource::Parameter => "parameter",
            RuleSource::Name => "name",
            RuleSource::Type => "type",
            RuleSource::Global => "global",
        })
    }
}

/// A rule picked by [`RuleRegistry::resolve`]
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRule<'a> {
    /// The rule configuration
    pub config: &'a RuleConfig,
    /// Which lookup level supplied it
    pub source: RuleSource,
}

/// Prioritized rule lookup table
///
/// Resolution order: rule embedded in the reference parameter, then the
/// rule registered for the parameter name, then the default for the
/// parameter's data type, then the global default. A registry is built once
/// and then shared read-only between comparisons.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    by_name: HashMap<String, RuleConfig>,
    by_type: HashMap<DataType, RuleConfig>,
    global: Option<RuleConfig>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistry {
    /// Registry whose global default is an exact match
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            by_type: HashMap::new(),
            global: Some(RuleConfig::exact()),
        }
    }

    /// Registry without a global default: parameters must be covered by a
    /// parameter, name or type rule
    pub fn strict() -> Self {
        Self {
            global: None,
            ..Self::new()
        }
    }

    /// Defaults for MR neuroimaging protocols
    ///
    /// Numeric values agree within 1e-3 (flip angle must match exactly).
    /// Receive-coil elements are compared per coil group and volatile
    /// identifiers are ignored. Tokens such as the phase encoding direction
    /// fall through to the exact global default.
    pub fn neuroimaging() -> Self {
        let mut registry = Self::new();

        let numeric = RuleConfig::new(EquivalenceRule::Tolerance(Tolerance::NUMERIC_DEFAULT));
        registry.by_type.insert(DataType::Number, numeric.clone());
        registry.by_type.insert(DataType::Numbers, numeric);

        for name in [
            "SeriesInstanceUID",
            "ContentDate",
            "ContentTime",
            "AcquisitionTime",
            "SliceLocation",
            "ImagePositionPatient",
        ] {
            registry.set_parameter_rule(name, RuleConfig::ignore());
        }

        registry.set_parameter_rule(
            "ReceiveCoilActiveElements",
            RuleConfig::new(EquivalenceRule::CoilElements),
        );

        registry.set_parameter_rule("FlipAngle", RuleConfig::exact());

        registry
    }

    /// Register (or replace) the rule for a parameter name
    pub fn set_parameter_rule(
        &mut self,
        name: impl Into<String>,
        config: RuleConfig,
    ) -> Option<RuleConfig> {
        self.by_name.insert(name.into(), config)
    }

    /// Chainable form of [`set_parameter_rule`](Self::set_parameter_rule)
    pub fn with_parameter_rule(mut self, name: impl Into<String>, config: RuleConfig) -> Self {
        self.set_parameter_rule(name, config);
        self
    }

    /// Register (or replace) the default rule for a data type
    pub fn set_type_rule(&mut self, data_type: DataType, config: RuleConfig) -> Result<(), RuleError> {
        if !config.rule.applies_to(data_type) {
            return Err(RuleError::Inapplicable {
                rule: config.rule.kind(),
                data_type,
            });
        }
        self.by_type.insert(data_type, config);
        Ok(())
    }

    /// Chainable form of [`set_type_rule`](Self::set_type_rule)
    pub fn with_type_rule(mut self, data_type: DataType, config: RuleConfig) -> Result<Self, RuleError> {
        self.set_type_rule(data_type, config)?;
        Ok(self)
    }

    /// Replace the global default; `None` makes the registry strict
    pub fn set_global_default(&mut self, config: Option<RuleConfig>) {
        self.global = config;
    }

    /// Merge another registry; its entries take precedence.
    ///
    /// The global default is only replaced when `other` has one.
    pub fn extend(&mut self, other: RuleRegistry) {
        self.by_name.extend(other.by_name);
        self.by_type.extend(other.by_type);
        if other.global.is_some() {
            self.global = other.global;
        }
    }

    /// Rule registered for a parameter name
    pub fn parameter_rule(&self, name: &str) -> Option<&RuleConfig> {
        self.by_name.get(name)
    }

    /// Default rule for a data type
    pub fn type_rule(&self, data_type: DataType) -> Option<&RuleConfig> {
        self.by_type.get(&data_type)
    }

    /// Global default rule
    pub fn global_default(&self) -> Option<&RuleConfig> {
        self.global.as_ref()
    }

    /// Parameter names with a registered rule, sorted
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve the rule governing a reference parameter.
    ///
    /// The first rule found wins. If it cannot govern the parameter's data
    /// type, or no rule is found at all, resolution fails with
    /// [`RuleError::NoRule`] instead of falling back silently.
    pub fn resolve<'a>(&'a self, parameter: &'a Parameter) -> Result<ResolvedRule<'a>, RuleError> {
        let data_type = parameter.data_type();

        let found = parameter
            .rule()
            .map(|config| (config, RuleSource::Parameter))
            .or_else(|| {
                self.by_name
                    .get(parameter.name())
                    .map(|config| (config, RuleSource::Name))
            })
            .or_else(|| self.by_type.get(&data_type).map(|config| (config, RuleSource::Type)))
            .or_else(|| self.global.as_ref().map(|config| (config, RuleSource::Global)));

        match found {
            Some((config, source)) if config.rule.applies_to(data_type) => {
                Ok(ResolvedRule { config, source })
            }
            Some((config, source)) => Err(RuleError::NoRule {
                parameter: parameter.name().to_string(),
                data_type,
                reason: format!(
                    "{} rule '{}' cannot compare {} values",
                    source,
                    config.rule.kind(),
                    data_type
                ),
            }),
            None => Err(RuleError::NoRule {
                parameter: parameter.name().to_string(),
                data_type,
                reason: "no parameter, name, type or global rule registered".to_string(),
            }),
        }
    }
}
