use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::comparator::Severity;
use crate::protocol::{DataType, ParamValue, Parameter, Protocol};
use crate::rules::{EquivalenceRule, RuleConfig, RuleRegistry, ToleranceMode};

use super::{DefinitionError, ProtocolDefinition};

/// Serialize a definition to indented XML
pub fn to_string(definition: &ProtocolDefinition) -> Result<String, DefinitionError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_protocol(&mut writer, &definition.protocol, &definition.rules)?;
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Write a definition to a file
pub fn to_path(definition: &ProtocolDefinition, path: impl AsRef<Path>) -> Result<(), DefinitionError> {
    std::fs::write(path, to_string(definition)?)?;
    Ok(())
}

type XmlWriter = Writer<Vec<u8>>;

fn write_protocol(
    writer: &mut XmlWriter,
    protocol: &Protocol,
    rules: &RuleRegistry,
) -> Result<(), DefinitionError> {
    let mut start = BytesStart::new("protocol");
    start.push_attribute(("name", protocol.name()));
    if let Some(version) = protocol.version() {
        start.push_attribute(("version", version));
    }
    writer.write_event(Event::Start(start))?;

    if let Some(session) = protocol.session() {
        let mut elem = BytesStart::new("session");
        for (key, value) in [
            ("subject", &session.subject_id),
            ("session", &session.session_id),
            ("run", &session.run_id),
        ] {
            if let Some(value) = value {
                elem.push_attribute((key, value.as_str()));
            }
        }
        writer.write_event(Event::Empty(elem))?;
    }

    write_registry(writer, rules)?;

    for sequence in protocol.sequences() {
        let mut start = BytesStart::new("sequence");
        start.push_attribute(("name", sequence.name()));
        if sequence.is_empty() {
            writer.write_event(Event::Empty(start))?;
            continue;
        }
        writer.write_event(Event::Start(start))?;
        for parameter in sequence {
            write_parameter(writer, parameter)?;
        }
        writer.write_event(Event::End(BytesEnd::new("sequence")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("protocol")))?;
    Ok(())
}

fn write_registry(writer: &mut XmlWriter, rules: &RuleRegistry) -> Result<(), DefinitionError> {
    let typed: Vec<(DataType, &RuleConfig)> = DataType::ALL
        .into_iter()
        .filter_map(|t| rules.type_rule(t).map(|config| (t, config)))
        .collect();
    let named = rules.parameter_names();
    if typed.is_empty() && named.is_empty() {
        return Ok(());
    }

    writer.write_event(Event::Start(BytesStart::new("rules")))?;
    for (data_type, config) in typed {
        write_rule(writer, config, Some(("type", data_type.as_str())), Some(data_type))?;
    }
    for name in named {
        if let Some(config) = rules.parameter_rule(name) {
            write_rule(writer, config, Some(("parameter", name)), None)?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new("rules")))?;
    Ok(())
}

fn write_parameter(writer: &mut XmlWriter, parameter: &Parameter) -> Result<(), DefinitionError> {
    let mut start = BytesStart::new("parameter");
    start.push_attribute(("name", parameter.name()));
    start.push_attribute(("type", parameter.data_type().as_str()));
    if let Some(unit) = parameter.unit() {
        start.push_attribute(("unit", unit));
    }
    if let Some(value) = format_value(parameter.value()) {
        start.push_attribute(("value", value.as_str()));
    }
    if !parameter.is_required() {
        start.push_attribute(("required", "false"));
    }

    match parameter.rule() {
        Some(config) => {
            writer.write_event(Event::Start(start))?;
            write_rule(writer, config, None, Some(parameter.data_type()))?;
            writer.write_event(Event::End(BytesEnd::new("parameter")))?;
        }
        None => writer.write_event(Event::Empty(start))?,
    }
    Ok(())
}

/// Write a `<rule>`; `context` is the data type untyped `<allowed>` values
/// are read back as
fn write_rule(
    writer: &mut XmlWriter,
    config: &RuleConfig,
    target: Option<(&str, &str)>,
    context: Option<DataType>,
) -> Result<(), DefinitionError> {
    let mut start = BytesStart::new("rule");
    if let Some(target) = target {
        start.push_attribute(target);
    }
    start.push_attribute(("kind", config.rule.kind()));

    match &config.rule {
        EquivalenceRule::Tolerance(tolerance) => {
            start.push_attribute(("tolerance", tolerance.amount().to_string().as_str()));
            if tolerance.mode() == ToleranceMode::Relative {
                start.push_attribute(("mode", tolerance.mode().as_str()));
            }
        }
        EquivalenceRule::Pattern { pattern } => start.push_attribute(("pattern", pattern.as_str())),
        _ => {}
    }
    if config.severity != Severity::Failing {
        start.push_attribute(("severity", config.severity.as_str()));
    }

    let allowed = match &config.rule {
        EquivalenceRule::OneOf { allowed } if !allowed.is_empty() => allowed,
        _ => {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
    };

    writer.write_event(Event::Start(start))?;
    let implied = context.unwrap_or(DataType::Token);
    for value in allowed {
        let mut elem = BytesStart::new("allowed");
        if let Some(data_type) = value.data_type().filter(|t| *t != implied) {
            elem.push_attribute(("type", data_type.as_str()));
        }
        if let Some(raw) = format_value(value) {
            elem.push_attribute(("value", raw.as_str()));
        }
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("rule")))?;
    Ok(())
}

/// Attribute form of a value, `None` for `Unspecified`
fn format_value(value: &ParamValue) -> Option<String> {
    match value {
        ParamValue::Number(v) => Some(v.to_string()),
        ParamValue::Numbers(v) => Some(
            v.iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        ParamValue::Text(s) | ParamValue::Token(s) => Some(s.clone()),
        ParamValue::Unspecified => None,
    }
}
