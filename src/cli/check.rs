use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use mrprotocol::protocol::Parameter;
use mrprotocol::rules::RuleRegistry;

use super::config::Config;
use super::input::{self, InputFormat};

/// Load a protocol, print its structure and verify every parameter has a rule
pub fn run(file: PathBuf, format: InputFormat, config: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config.as_deref())?;
    let loaded = input::load(&file, format).context("Failed to load protocol")?;
    let registry = loaded.registry(config.registry()?);
    let protocol = &loaded.protocol;

    println!("Protocol: {}", protocol.label());
    if let Some(version) = protocol.version() {
        println!("Version: {}", version);
    }
    println!(
        "Sequences: {}, parameters: {}",
        protocol.len(),
        protocol.parameter_count()
    );
    println!();

    let mut unresolved = 0;
    let mut unspecified = 0;
    for sequence in protocol.sequences() {
        println!("{} ({} parameters)", sequence.name(), sequence.len());
        for parameter in sequence {
            if parameter.value().is_unspecified() {
                unspecified += 1;
            }
            let rule = describe_rule(&registry, parameter);
            if rule.is_none() {
                unresolved += 1;
            }
            println!(
                "  {:<32} {:<8} {:<24} {}",
                parameter.name(),
                parameter.data_type().to_string(),
                parameter.value().to_string(),
                rule.as_deref().unwrap_or("<no rule>")
            );
        }
    }
    println!();
    println!("Unspecified values: {}", unspecified);

    info!("Checked {} parameter(s)", protocol.parameter_count());
    if unresolved > 0 {
        eprintln!("{} parameter(s) have no applicable rule", unresolved);
        std::process::exit(1);
    }
    Ok(())
}

/// `rule [source]`, or `None` when the parameter cannot be resolved
fn describe_rule(registry: &RuleRegistry, parameter: &Parameter) -> Option<String> {
    registry
        .resolve(parameter)
        .ok()
        .map(|resolved| format!("{} [{}]", resolved.config.rule, resolved.source))
}
