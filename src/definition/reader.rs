use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::comparator::Severity;
use crate::protocol::{DataType, ParamValue, Parameter, Protocol, Sequence, SessionInfo};
use crate::rules::{
    EquivalenceRule, RuleConfig, RuleError, RuleRegistry, Tolerance, ToleranceMode,
};

use super::helpers::{get_attribute, parse_attribute, parse_flag, required_attribute};
use super::{DefinitionError, ProtocolDefinition};

/// Read a definition from a file
pub fn from_path(path: impl AsRef<Path>) -> Result<ProtocolDefinition, DefinitionError> {
    let path = path.as_ref();
    debug!("Reading protocol definition {}", path.display());
    let file = File::open(path)?;
    from_reader(BufReader::new(file))
}

/// Read a definition from an XML string
pub fn from_str(xml: &str) -> Result<ProtocolDefinition, DefinitionError> {
    from_reader(xml.as_bytes())
}

/// Read a definition from any buffered reader
pub fn from_reader<R: BufRead>(reader: R) -> Result<ProtocolDefinition, DefinitionError> {
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(true);

    let mut parser = DefinitionParser::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => parser.open(e)?,
            Ok(Event::Empty(ref e)) => {
                parser.open(e)?;
                parser.close(e.name().as_ref())?;
            }
            Ok(Event::End(ref e)) => parser.close(e.name().as_ref())?,
            Ok(Event::Text(ref t)) => {
                let text = std::str::from_utf8(t)?;
                if !text.trim().is_empty() {
                    return Err(DefinitionError::InvalidStructure(format!(
                        "unexpected text '{}'",
                        text.trim()
                    )));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DefinitionError::XmlError(e)),
            _ => {}
        }
        buf.clear();
    }

    parser.finish()
}

/// Header of the `<protocol>` element
struct Header {
    name: String,
    version: Option<String>,
}

/// Parameter being read, waiting for an optional `<rule>` child
struct PendingParameter {
    name: String,
    data_type: DataType,
    value: ParamValue,
    unit: Option<String>,
    required: bool,
    rule: Option<RuleConfig>,
}

/// What a `<rule>` element applies to
enum RuleTarget {
    /// Child of a `<parameter>`
    Embedded,
    /// `<rules><rule type="..."/>`
    Type(DataType),
    /// `<rules><rule parameter="..."/>`
    Name(String),
}

/// Rule being read, waiting for `<allowed>` children
struct PendingRule {
    target: RuleTarget,
    kind: String,
    tolerance: Option<f64>,
    mode: ToleranceMode,
    pattern: Option<String>,
    severity: Severity,
    allowed: Vec<ParamValue>,
}

struct DefinitionParser {
    header: Option<Header>,
    closed: bool,
    session: Option<SessionInfo>,
    in_rules: bool,
    rules: RuleRegistry,
    sequences: Vec<Sequence>,
    sequence: Option<(String, Vec<Parameter>)>,
    parameter: Option<PendingParameter>,
    rule: Option<PendingRule>,
}

impl DefinitionParser {
    fn new() -> Self {
        Self {
            header: None,
            closed: false,
            session: None,
            in_rules: false,
            rules: RuleRegistry::strict(),
            sequences: Vec::new(),
            sequence: None,
            parameter: None,
            rule: None,
        }
    }

    fn open(&mut self, e: &BytesStart) -> Result<(), DefinitionError> {
        match e.name().as_ref() {
            b"protocol" => {
                if self.header.is_some() {
                    return Err(structure("only one <protocol> element is allowed"));
                }
                self.header = Some(Header {
                    name: required_attribute(e, "protocol", "name")?,
                    version: get_attribute(e, "version")?,
                });
            }
            b"session" => {
                self.require_protocol("session")?;
                self.session = Some(SessionInfo {
                    subject_id: get_attribute(e, "subject")?,
                    session_id: get_attribute(e, "session")?,
                    run_id: get_attribute(e, "run")?,
                });
            }
            b"rules" => {
                self.require_protocol("rules")?;
                self.in_rules = true;
            }
            b"sequence" => {
                self.require_protocol("sequence")?;
                if self.sequence.is_some() {
                    return Err(structure("<sequence> elements cannot be nested"));
                }
                self.sequence = Some((required_attribute(e, "sequence", "name")?, Vec::new()));
            }
            b"parameter" => {
                if self.sequence.is_none() {
                    return Err(structure("<parameter> must be inside a <sequence>"));
                }
                self.parameter = Some(read_parameter(e)?);
            }
            b"rule" => {
                if self.rule.is_some() {
                    return Err(structure("<rule> elements cannot be nested"));
                }
                let target = if self.parameter.is_some() {
                    RuleTarget::Embedded
                } else if self.in_rules {
                    read_rule_target(e)?
                } else {
                    return Err(structure("<rule> must be inside <rules> or a <parameter>"));
                };
                self.rule = Some(read_rule(e, target)?);
            }
            b"allowed" => {
                let context = self.rule_context_type();
                let rule = self
                    .rule
                    .as_mut()
                    .ok_or_else(|| structure("<allowed> must be inside a <rule>"))?;
                rule.allowed.push(read_allowed(e, context)?);
            }
            other => {
                warn!(
                    "Ignoring unknown element <{}>",
                    String::from_utf8_lossy(other)
                );
            }
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<(), DefinitionError> {
        match name {
            b"protocol" => self.closed = true,
            b"rules" => self.in_rules = false,
            b"sequence" => {
                if let Some((name, parameters)) = self.sequence.take() {
                    self.sequences.push(Sequence::new(name, parameters)?);
                }
            }
            b"parameter" => {
                if let Some(pending) = self.parameter.take() {
                    let mut parameter =
                        Parameter::new(pending.name, pending.data_type, pending.value)?
                            .with_required(pending.required);
                    if let Some(unit) = pending.unit {
                        parameter = parameter.with_unit(unit);
                    }
                    if let Some(rule) = pending.rule {
                        if !rule.rule.applies_to(pending.data_type) {
                            return Err(RuleError::Inapplicable {
                                rule: rule.rule.kind(),
                                data_type: pending.data_type,
                            }
                            .into());
                        }
                        parameter = parameter.with_rule(rule);
                    }
                    if let Some((_, parameters)) = self.sequence.as_mut() {
                        parameters.push(parameter);
                    }
                }
            }
            b"rule" => {
                if let Some(pending) = self.rule.take() {
                    self.finish_rule(pending)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish_rule(&mut self, pending: PendingRule) -> Result<(), DefinitionError> {
        let PendingRule {
            target,
            kind,
            tolerance,
            mode,
            pattern,
            severity,
            allowed,
        } = pending;

        let rule = match kind.as_str() {
            "exact" => EquivalenceRule::Exact,
            "ignore" => EquivalenceRule::Ignore,
            "coil" => EquivalenceRule::CoilElements,
            "tolerance" => {
                let amount = tolerance
                    .ok_or_else(|| DefinitionError::MissingAttribute("<rule> tolerance".to_string()))?;
                EquivalenceRule::Tolerance(Tolerance::new(amount, mode)?)
            }
            "set" => EquivalenceRule::one_of(allowed),
            "pattern" => {
                let source = pattern
                    .ok_or_else(|| DefinitionError::MissingAttribute("<rule> pattern".to_string()))?;
                EquivalenceRule::pattern(&source)?
            }
            other => {
                return Err(DefinitionError::InvalidAttributeValue(format!(
                    "<rule> kind=\"{}\"",
                    other
                )))
            }
        };
        let config = RuleConfig::new(rule).with_severity(severity);

        match target {
            RuleTarget::Embedded => {
                if let Some(parameter) = self.parameter.as_mut() {
                    parameter.rule = Some(config);
                }
            }
            RuleTarget::Type(data_type) => self.rules.set_type_rule(data_type, config)?,
            RuleTarget::Name(name) => {
                self.rules.set_parameter_rule(name, config);
            }
        }
        Ok(())
    }

    /// Data type `<allowed>` values default to
    fn rule_context_type(&self) -> Option<DataType> {
        match (&self.parameter, self.rule.as_ref().map(|r| &r.target)) {
            (Some(parameter), _) => Some(parameter.data_type),
            (None, Some(RuleTarget::Type(data_type))) => Some(*data_type),
            _ => None,
        }
    }

    fn require_protocol(&self, element: &str) -> Result<(), DefinitionError> {
        if self.header.is_none() || self.closed {
            return Err(structure(&format!("<{}> must be inside <protocol>", element)));
        }
        Ok(())
    }

    fn finish(self) -> Result<ProtocolDefinition, DefinitionError> {
        let header = self
            .header
            .ok_or_else(|| structure("missing <protocol> element"))?;
        if !self.closed || self.sequence.is_some() {
            return Err(structure("unexpected end of document"));
        }

        let mut protocol = Protocol::new(header.name, header.version, self.sequences)?;
        if let Some(session) = self.session {
            protocol = protocol.with_session(session);
        }
        debug!(
            "Loaded definition {} ({} sequences, {} parameters)",
            protocol.label(),
            protocol.len(),
            protocol.parameter_count()
        );

        Ok(ProtocolDefinition {
            protocol,
            rules: self.rules,
        })
    }
}

fn structure(message: &str) -> DefinitionError {
    DefinitionError::InvalidStructure(message.to_string())
}

fn read_parameter(e: &BytesStart) -> Result<PendingParameter, DefinitionError> {
    let name = required_attribute(e, "parameter", "name")?;
    let data_type: DataType = parse_attribute(e, "parameter", "type")?
        .ok_or_else(|| DefinitionError::MissingAttribute(format!("<parameter name=\"{}\"> type", name)))?;

    let value = match get_attribute(e, "value")? {
        Some(raw) => data_type.parse_value(&raw).ok_or_else(|| {
            DefinitionError::InvalidAttributeValue(format!(
                "<parameter name=\"{}\"> value \"{}\" is not a valid {}",
                name, raw, data_type
            ))
        })?,
        None => ParamValue::Unspecified,
    };

    let required = match get_attribute(e, "required")? {
        Some(raw) => parse_flag(&raw).ok_or_else(|| {
            DefinitionError::InvalidAttributeValue(format!("<parameter> required=\"{}\"", raw))
        })?,
        None => true,
    };

    Ok(PendingParameter {
        name,
        data_type,
        value,
        unit: get_attribute(e, "unit")?,
        required,
        rule: None,
    })
}

fn read_rule_target(e: &BytesStart) -> Result<RuleTarget, DefinitionError> {
    let data_type: Option<DataType> = parse_attribute(e, "rule", "type")?;
    let parameter = get_attribute(e, "parameter")?;

    match (data_type, parameter) {
        (Some(data_type), None) => Ok(RuleTarget::Type(data_type)),
        (None, Some(parameter)) => Ok(RuleTarget::Name(parameter)),
        _ => Err(structure(
            "<rule> inside <rules> needs exactly one of 'type' or 'parameter'",
        )),
    }
}

fn read_rule(e: &BytesStart, target: RuleTarget) -> Result<PendingRule, DefinitionError> {
    Ok(PendingRule {
        target,
        kind: required_attribute(e, "rule", "kind")?.trim().to_ascii_lowercase(),
        tolerance: parse_attribute(e, "rule", "tolerance")?,
        mode: parse_attribute(e, "rule", "mode")?.unwrap_or_default(),
        pattern: get_attribute(e, "pattern")?,
        severity: parse_attribute(e, "rule", "severity")?.unwrap_or_default(),
        allowed: Vec::new(),
    })
}

/// `<allowed value=".." [type=".."]/>`; untyped values take the type of the
/// enclosing parameter or type rule, and are tokens otherwise
fn read_allowed(e: &BytesStart, context: Option<DataType>) -> Result<ParamValue, DefinitionError> {
    let raw = required_attribute(e, "allowed", "value")?;
    let data_type = parse_attribute(e, "allowed", "type")?
        .or(context)
        .unwrap_or(DataType::Token);

    data_type.parse_value(&raw).ok_or_else(|| {
        DefinitionError::InvalidAttributeValue(format!(
            "<allowed> value \"{}\" is not a valid {}",
            raw, data_type
        ))
    })
}
