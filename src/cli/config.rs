//! TOML configuration file support.
//!
//! Comparison switches and rule overrides can be kept in a config file
//! instead of being repeated on the command line:
//!
//! ```toml
//! # mrprotocol.toml
//! [compare]
//! report_extra_parameters = true
//! neuroimaging_defaults = true
//!
//! [rules.types.number]
//! kind = "tolerance"
//! tolerance = 0.001
//!
//! [rules.parameters.FlipAngle]
//! kind = "tolerance"
//! tolerance = 5.0
//! severity = "warning"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use mrprotocol::comparator::CompareOptions;
use mrprotocol::protocol::DataType;
use mrprotocol::rules::{RuleConfig, RuleRegistry};

/// Root configuration structure for mrprotocol.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Comparison settings.
    #[serde(default)]
    pub compare: CompareConfig,

    /// Rule overrides applied on top of the base registry.
    #[serde(default)]
    pub rules: RulesConfig,
}

/// Configuration for the compare and batch commands.
#[derive(Debug, Default, Deserialize)]
pub struct CompareConfig {
    /// Report candidate parameters the reference does not list.
    pub report_extra_parameters: Option<bool>,

    /// Start from the neuroimaging default rules (default: true).
    pub neuroimaging_defaults: Option<bool>,
}

/// Rule overrides, by data type and by parameter name.
#[derive(Debug, Default, Deserialize)]
pub struct RulesConfig {
    /// Rules keyed by data type name (`number`, `numbers`, `text`, `token`).
    #[serde(default)]
    pub types: BTreeMap<String, RuleConfig>,

    /// Rules keyed by parameter name.
    #[serde(default)]
    pub parameters: BTreeMap<String, RuleConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load the file if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Comparison options, with command-line flags taking precedence.
    pub fn options(&self, extra_parameters_flag: bool) -> CompareOptions {
        let from_file = self.compare.report_extra_parameters.unwrap_or(false);
        CompareOptions::default().with_extra_parameters(extra_parameters_flag || from_file)
    }

    /// Base registry with the configured overrides applied.
    pub fn registry(&self) -> Result<RuleRegistry> {
        let mut registry = if self.compare.neuroimaging_defaults.unwrap_or(true) {
            RuleRegistry::neuroimaging()
        } else {
            RuleRegistry::new()
        };

        for (name, config) in &self.rules.types {
            let data_type: DataType = name
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .with_context(|| format!("Invalid [rules.types.{}] section", name))?;
            registry
                .set_type_rule(data_type, config.clone())
                .with_context(|| format!("Invalid [rules.types.{}] section", name))?;
        }
        for (name, config) in &self.rules.parameters {
            registry.set_parameter_rule(name.clone(), config.clone());
        }

        Ok(registry)
    }
}
