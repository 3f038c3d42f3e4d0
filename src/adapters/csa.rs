//! Siemens CSA series header (`MrPhoenixProtocol`)
//!
//! The Phoenix protocol is an ASCII block of `key = value` lines between
//! `### ASCCONV BEGIN ###` and `### ASCCONV END ###`:
//!
//! ```text
//! ### ASCCONV BEGIN ###
//! sKSpace.ucMultiSliceMode                 = 0x2
//! sPat.ucPATMode                           = 0x2
//! sAdjData.uiAdjShimMode                   = 0x4
//! ### ASCCONV END ###
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use log::warn;
use regex::Regex;

/// `MultiSliceMode` codes
const SLICE_MODE: &[(u32, &str)] = &[(1, "sequential"), (2, "interleaved"), (4, "singleshot")];

/// `PATMode` (iPAT) codes
const PAT_MODE: &[(u32, &str)] = &[(1, "Not Selected"), (2, "Grappa"), (3, "Sense")];

/// `ShimMode` codes
const SHIM_MODE: &[(u32, &str)] = &[(1, "tune_up"), (2, "standard"), (4, "advanced")];

const ASCCONV_BEGIN: &str = "### ASCCONV BEGIN";
const ASCCONV_END: &str = "### ASCCONV END";

static RE_PHOENIX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*([A-Za-z_][\w.\[\]]*)\s*=\s*(.*?)\s*$").expect("valid Phoenix line regex")
});

/// Parsed `key = value` entries of a Phoenix protocol
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoenixProtocol {
    entries: HashMap<String, String>,
}

impl PhoenixProtocol {
    /// Parse the text; only the ASCCONV block is read when markers exist
    pub fn parse(text: &str) -> Self {
        let body = match (text.find(ASCCONV_BEGIN), text.find(ASCCONV_END)) {
            (Some(begin), Some(end)) if begin + ASCCONV_BEGIN.len() <= end => {
                let header = &text[begin + ASCCONV_BEGIN.len()..end];
                &header[marker_line_end(header)..]
            }
            _ => text,
        };

        let entries = RE_PHOENIX_LINE
            .captures_iter(body)
            .map(|caps| (caps[1].to_string(), caps[2].trim_matches('"').to_string()))
            .collect();
        Self { entries }
    }

    /// Raw value of a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Integer value of a key; hexadecimal `0x..` is accepted
    pub fn code(&self, key: &str) -> Option<u32> {
        let raw = self.get(key)?.trim();
        match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse().ok(),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was parsed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decoded label for a catalogue CSA key, e.g. `interleaved` for
    /// `sKSpace.ucMultiSliceMode = 0x2`
    pub fn label(&self, key: &str) -> Option<&'static str> {
        let table = match key {
            "sKSpace.ucMultiSliceMode" => SLICE_MODE,
            "sPat.ucPATMode" => PAT_MODE,
            "sAdjData.uiAdjShimMode" => SHIM_MODE,
            _ => return None,
        };
        let code = self.code(key)?;
        let label = table.iter().find(|(c, _)| *c == code).map(|(_, label)| *label);
        if label.is_none() {
            warn!("Unknown code {} for CSA key {}", code, key);
        }
        label
    }
}

/// Offset just past the BEGIN marker's line: its closing `###` when that
/// comes first, else the end of the line
fn marker_line_end(header: &str) -> usize {
    let newline = header.find('\n');
    match header.find("###") {
        Some(i) if newline.map_or(true, |n| i < n) => i + 3,
        _ => newline.map_or(0, |n| n + 1),
    }
}
