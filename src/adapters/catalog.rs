//! Catalogue of MR acquisition parameters
//!
//! Every parameter the adapters know about, with its acronym, where it is
//! read from, its data type and its canonical unit. Timing parameters use
//! milliseconds, as DICOM does.

use std::fmt;
use std::str::FromStr;

use crate::protocol::DataType::{self, Number, Numbers, Text, Token};

use super::AdapterError;

/// A DICOM attribute tag `(gggg,eeee)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DicomTag {
    /// Group number
    pub group: u16,
    /// Element number
    pub element: u16,
}

impl DicomTag {
    /// Tag from group and element numbers
    pub const fn new(group: u16, element: u16) -> Self {
        Self { group, element }
    }

    /// True for odd (vendor private) groups
    pub fn is_private(&self) -> bool {
        self.group % 2 == 1
    }
}

impl fmt::Display for DicomTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.group, self.element)
    }
}

impl FromStr for DicomTag {
    type Err = AdapterError;

    /// Accepts `(0018,0080)`, `0018,0080` and `00180080`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AdapterError::InvalidTag(s.to_string());
        let trimmed = s
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')');

        let (group, element) = match trimmed.split_once(',') {
            Some((g, e)) => (g.trim(), e.trim()),
            None if trimmed.len() == 8 && trimmed.is_ascii() => trimmed.split_at(4),
            None => return Err(invalid()),
        };
        if group.len() != 4 || element.len() != 4 {
            return Err(invalid());
        }

        Ok(Self {
            group: u16::from_str_radix(group, 16).map_err(|_| invalid())?,
            element: u16::from_str_radix(element, 16).map_err(|_| invalid())?,
        })
    }
}

/// Where a catalogue parameter is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSource {
    /// A standard or private DICOM attribute
    Tag(DicomTag),
    /// A key of the Siemens `MrPhoenixProtocol` text
    Csa(&'static str),
    /// Computed from other parameters
    Derived,
}

/// Catalogue entry for one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Parameter name (DICOM keyword or BIDS field)
    pub name: &'static str,
    /// Short acronym
    pub acronym: &'static str,
    /// Where the value comes from
    pub source: ParameterSource,
    /// Data type of the value
    pub data_type: DataType,
    /// Canonical unit
    pub unit: Option<&'static str>,
    /// Always reported; marked unspecified when the metadata lacks it
    pub core: bool,
}

impl ParameterSpec {
    /// DICOM tag, for tag-sourced parameters
    pub fn tag(&self) -> Option<DicomTag> {
        match self.source {
            ParameterSource::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

const fn tag(
    name: &'static str,
    acronym: &'static str,
    group: u16,
    element: u16,
    data_type: DataType,
    unit: Option<&'static str>,
) -> ParameterSpec {
    ParameterSpec {
        name,
        acronym,
        source: ParameterSource::Tag(DicomTag::new(group, element)),
        data_type,
        unit,
        core: false,
    }
}

const fn core(spec: ParameterSpec) -> ParameterSpec {
    ParameterSpec { core: true, ..spec }
}

const fn csa(name: &'static str, acronym: &'static str, key: &'static str) -> ParameterSpec {
    ParameterSpec {
        name,
        acronym,
        source: ParameterSource::Csa(key),
        data_type: DataType::Token,
        unit: None,
        core: false,
    }
}

/// All known parameters
pub static CATALOG: &[ParameterSpec] = &[
    // Hardware
    tag("Manufacturer", "MFR", 0x0008, 0x0070, Token, None),
    tag("ManufacturersModelName", "MMN", 0x0008, 0x1090, Text, None),
    tag("SoftwareVersions", "SV", 0x0018, 0x1020, Text, None),
    tag("MagneticFieldStrength", "MFS", 0x0018, 0x0087, Number, Some("T")),
    tag("ReceiveCoilName", "RCN", 0x0018, 0x1250, Text, None),
    tag("ReceiveCoilActiveElements", "RCAE", 0x0051, 0x100F, Text, None),
    tag("TransmitCoilName", "TCN", 0x0018, 0x1251, Text, None),
    // Sequence
    core(tag("ScanningSequence", "SSEQ", 0x0018, 0x0020, Token, None)),
    tag("SequenceVariant", "SEQV", 0x0018, 0x0021, Token, None),
    tag("ScanOptions", "SCOP", 0x0018, 0x0022, Token, None),
    tag("MRAcquisitionType", "MRAT", 0x0018, 0x0023, Token, None),
    tag("SequenceName", "SQNM", 0x0018, 0x0024, Text, None),
    tag("AngioFlag", "AF", 0x0018, 0x0025, Token, None),
    // Spatial encoding
    tag("ParallelReductionFactorInPlane", "PRFIP", 0x0018, 0x9069, Number, None),
    core(tag("PhaseEncodingDirection", "PED", 0x0018, 0x1312, Token, None)),
    tag("PercentSampling", "PSMP", 0x0018, 0x0093, Number, Some("%")),
    tag("PercentPhaseFOV", "PPFOV", 0x0018, 0x0094, Number, Some("%")),
    tag("AcquisitionMatrix", "ACQM", 0x0018, 0x1310, Numbers, None),
    tag("SliceThickness", "ST", 0x0018, 0x0050, Number, Some("mm")),
    tag("SpacingBetweenSlices", "SBS", 0x0018, 0x0088, Number, Some("mm")),
    tag("PixelSpacing", "PS", 0x0028, 0x0030, Numbers, Some("mm")),
    tag("Rows", "R", 0x0028, 0x0010, Number, None),
    tag("Columns", "C", 0x0028, 0x0011, Number, None),
    tag("ImageOrientationPatient", "IOP", 0x0020, 0x0037, Numbers, None),
    tag("ImagePositionPatient", "IPP", 0x0020, 0x0032, Numbers, Some("mm")),
    tag("SliceLocation", "SL", 0x0020, 0x1041, Number, Some("mm")),
    // Timing
    core(tag("RepetitionTime", "TR", 0x0018, 0x0080, Number, Some("ms"))),
    core(tag("EchoTime", "TE", 0x0018, 0x0081, Numbers, Some("ms"))),
    tag("InversionTime", "TI", 0x0018, 0x0082, Number, Some("ms")),
    tag("EchoTrainLength", "ETL", 0x0018, 0x0091, Number, None),
    tag("EchoNumber", "EN", 0x0018, 0x0086, Number, None),
    tag("PixelBandwidth", "PBW", 0x0018, 0x0095, Number, Some("Hz")),
    tag("PhaseEncodingSteps", "PES", 0x0018, 0x0089, Number, None),
    tag("NumberOfAverages", "NAV", 0x0018, 0x0083, Number, None),
    // RF and contrast
    core(tag("FlipAngle", "FA", 0x0018, 0x1314, Number, Some("deg"))),
    tag("ImagingFrequency", "IF", 0x0018, 0x0084, Number, Some("MHz")),
    tag("ImagedNucleus", "IN", 0x0018, 0x0085, Token, None),
    tag("SAR", "SAR", 0x0018, 0x1316, Number, Some("W/kg")),
    // Misc
    tag("BodyPartExamined", "BPE", 0x0018, 0x0015, Token, None),
    tag("PatientPosition", "PP", 0x0018, 0x5100, Token, None),
    tag("SeriesDescription", "SD", 0x0008, 0x103E, Text, None),
    tag("ProtocolName", "PRN", 0x0018, 0x1030, Text, None),
    tag("SeriesInstanceUID", "SIUID", 0x0020, 0x000E, Text, None),
    tag("ContentDate", "CD", 0x0008, 0x0023, Text, None),
    tag("ContentTime", "CT", 0x0008, 0x0033, Text, None),
    // Siemens CSA header
    csa("MultiSliceMode", "MSM", "sKSpace.ucMultiSliceMode"),
    csa("PATMode", "PATM", "sPat.ucPATMode"),
    csa("ShimMode", "SHM", "sAdjData.uiAdjShimMode"),
    // Derived
    ParameterSpec {
        name: "EffectiveEchoSpacing",
        acronym: "EES",
        source: ParameterSource::Derived,
        data_type: Number,
        unit: Some("s"),
        core: false,
    },
];

/// Look up a parameter by name
pub fn by_name(name: &str) -> Option<&'static ParameterSpec> {
    CATALOG.iter().find(|spec| spec.name == name)
}

/// Look up a parameter by DICOM tag
pub fn by_tag(tag: DicomTag) -> Option<&'static ParameterSpec> {
    CATALOG.iter().find(|spec| spec.tag() == Some(tag))
}

/// Look up a parameter by acronym (case-insensitive)
pub fn by_acronym(acronym: &str) -> Option<&'static ParameterSpec> {
    CATALOG
        .iter()
        .find(|spec| spec.acronym.eq_ignore_ascii_case(acronym.trim()))
}

/// Look up a parameter by name, acronym or tag
pub fn lookup(key: &str) -> Option<&'static ParameterSpec> {
    by_name(key)
        .or_else(|| by_acronym(key))
        .or_else(|| key.parse().ok().and_then(by_tag))
}

/// Phase encoding directions: BIDS axes (`-` for reversed) and DICOM in-plane directions
pub const PHASE_ENCODING_DIRECTIONS: &[&str] = &["i", "j", "k", "i-", "j-", "k-", "ROW", "COL"];

/// Tokens a parameter is restricted to, if the catalogue restricts it
pub fn allowed_tokens(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "PhaseEncodingDirection" => Some(PHASE_ENCODING_DIRECTIONS),
        _ => None,
    }
}
