use std::str::FromStr;

use quick_xml::escape::unescape;
use quick_xml::events::BytesStart;

use super::DefinitionError;

/// Unescaped value of an attribute
pub(super) fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>, DefinitionError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == name.as_bytes() {
            let raw = std::str::from_utf8(&attr.value)?;
            return Ok(Some(unescape(raw)?.into_owned()));
        }
    }
    Ok(None)
}

/// Attribute that must be present
pub(super) fn required_attribute(
    e: &BytesStart,
    element: &str,
    name: &str,
) -> Result<String, DefinitionError> {
    get_attribute(e, name)?
        .ok_or_else(|| DefinitionError::MissingAttribute(format!("<{}> {}", element, name)))
}

/// Attribute parsed with `FromStr`, if present
pub(super) fn parse_attribute<T>(
    e: &BytesStart,
    element: &str,
    name: &str,
) -> Result<Option<T>, DefinitionError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_attribute(e, name)? {
        Some(raw) => raw.trim().parse().map(Some).map_err(|err: T::Err| {
            DefinitionError::InvalidAttributeValue(format!("<{}> {}=\"{}\": {}", element, name, raw, err))
        }),
        None => Ok(None),
    }
}

/// Parse `true`/`false` (also `yes`/`no`, `1`/`0`)
pub(super) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
