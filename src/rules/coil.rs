//! Receive-coil active elements (DICOM (0051,100F))
//!
//! Siemens scanners report the active receive-coil elements as strings like
//! `HEA;HEP`, `BO1,2;BO1-3;SP2-5` or `C:HEA;HEP`. Each `;`-separated item is a
//! coil group name followed by an optional element list with ranges.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Largest element range expanded; wider ranges are kept as opaque names
const MAX_RANGE_SPAN: u32 = 256;

/// Parsed receive-coil active elements: group name → element numbers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoilElements {
    groups: BTreeMap<String, BTreeSet<u32>>,
}

impl CoilElements {
    /// Parse a coil string. Repeated groups are merged.
    pub fn parse(raw: &str) -> Self {
        let mut groups: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        let body = strip_prefix(raw.trim());

        for item in body.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, elements) = parse_item(item);
            groups.entry(name).or_default().extend(elements);
        }

        Self { groups }
    }

    /// Group names in sorted order
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Elements of a group
    pub fn elements(&self, group: &str) -> Option<&BTreeSet<u32>> {
        self.groups.get(group)
    }

    /// Number of groups shared with `other` whose element sets differ.
    ///
    /// `None` when the two values have no group in common.
    pub fn differing_groups(&self, other: &CoilElements) -> Option<usize> {
        let mut shared = 0;
        let mut differing = 0;
        for (name, elements) in &self.groups {
            if let Some(other_elements) = other.groups.get(name) {
                shared += 1;
                if elements != other_elements {
                    differing += 1;
                }
            }
        }
        (shared > 0).then_some(differing)
    }

    /// Compliant iff at least one group is shared and all shared groups agree
    pub fn compliant_with(&self, other: &CoilElements) -> bool {
        self.differing_groups(other) == Some(0)
    }
}

impl fmt::Display for CoilElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .groups
            .iter()
            .map(|(name, elements)| {
                let list: Vec<String> = elements.iter().map(u32::to_string).collect();
                format!("{}{}", name, list.join(","))
            })
            .collect();
        f.write_str(&items.join(";"))
    }
}

/// Drop a leading `X:` qualifier such as `C:` or `T:`
fn strip_prefix(raw: &str) -> &str {
    match raw.split_once(':') {
        Some((prefix, rest)) if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest
        }
        _ => raw,
    }
}

fn parse_item(item: &str) -> (String, Vec<u32>) {
    let split = item
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(item.len());
    let (name, spec) = item.split_at(split);

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return (item.to_string(), Vec::new());
    }
    match parse_element_spec(spec) {
        Some(elements) => (name.to_string(), elements),
        None => (item.to_string(), Vec::new()),
    }
}

/// Parse `1,3-7` into element numbers
fn parse_element_spec(spec: &str) -> Option<Vec<u32>> {
    let mut elements = Vec::new();
    if spec.is_empty() {
        return Some(elements);
    }

    for part in spec.split(',') {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: u32 = lo.trim().parse().ok()?;
                let hi: u32 = hi.trim().parse().ok()?;
                if hi < lo || hi - lo > MAX_RANGE_SPAN {
                    return None;
                }
                elements.extend(lo..=hi);
            }
            None => elements.push(part.trim().parse().ok()?),
        }
    }
    Some(elements)
}
