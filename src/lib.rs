//! # mrprotocol - MR Imaging Protocol Compliance
//!
//! `mrprotocol` checks whether acquired MR imaging sessions follow a
//! reference protocol. A protocol is an ordered set of named sequences
//! (T1, T2, FLAIR, ...), each holding typed acquisition parameters
//! (repetition time, echo time, flip angle, phase encoding direction, ...).
//! Comparing a candidate against a reference yields a deterministic
//! [`ComplianceReport`](report::ComplianceReport) listing every deviation.
//!
//! ## Key Features
//!
//! - **Typed parameters**: numbers, number lists, free text and tokens, with
//!   an explicit `Unspecified` marker for values the metadata lacks.
//!
//! - **Pluggable equivalence rules**: exact match, absolute or relative
//!   tolerance, allowed sets, regular expressions, receive-coil element
//!   comparison, or ignore. Rules are resolved per parameter, per name, per
//!   data type, then globally.
//!
//! - **Deterministic reports**: deviations follow reference traversal order
//!   and export byte-identically to JSON and TSV.
//!
//! - **Metadata adapters**: DICOM header dumps (including the Siemens CSA
//!   protocol) and BIDS sidecars map onto the same model.
//!
//! - **Batch checking**: one reference against many sessions on a rayon
//!   worker pool, with cancellation.
//!
//! ## Quick Start
//!
//! ```rust
//! use mrprotocol::prelude::*;
//!
//! let reference = ProtocolBuilder::new("ABCD")
//!     .version("3.0")
//!     .sequence(
//!         SequenceBuilder::new("T1")
//!             .parameter(Parameter::number("RepetitionTime", 2000.0).with_unit("ms"))
//!             .parameter(Parameter::token("PhaseEncodingDirection", "j-"))
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let candidate = ProtocolBuilder::new("sub-01")
//!     .sequence(
//!         SequenceBuilder::new("T1")
//!             .parameter(Parameter::number("RepetitionTime", 2100.0).with_unit("ms"))
//!             .parameter(Parameter::token("PhaseEncodingDirection", "j-"))
//!             .build()?,
//!     )
//!     .build()?;
//!
//! let registry = RuleRegistry::new()
//!     .with_parameter_rule("RepetitionTime", EquivalenceRule::tolerance(50.0)?.into());
//! let report = Comparator::new(&registry).compare(&reference, &candidate)?;
//!
//! assert!(!report.is_compliant());
//! assert_eq!(report.deviations()[0].location(), "T1.RepetitionTime");
//! println!("{}", report);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`protocol`]: Parameter, Sequence and Protocol model
//! - [`rules`]: Equivalence rules and the rule registry
//! - [`comparator`]: Protocol comparison and batch execution
//! - [`report`]: Compliance reports and their JSON/TSV export
//! - [`definition`]: XML protocol definition reader and writer
//! - [`adapters`]: DICOM and BIDS metadata adapters

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod adapters;
pub mod comparator;
pub mod definition;
pub mod protocol;
pub mod report;
pub mod rules;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::adapters::{
        AdapterError, BidsAdapter, DicomAdapter, ProtocolAdapter, RawHeader, RawValue,
    };
    pub use crate::comparator::{
        compare, BatchOutcome, BatchSummary, CancellationToken, CompareOptions, Comparator,
        Deviation, DeviationKind, Severity,
    };
    pub use crate::definition::{DefinitionError, ProtocolDefinition};
    pub use crate::protocol::{
        DataType, ParamValue, Parameter, Protocol, ProtocolBuilder, ProtocolError, Sequence,
        SequenceBuilder, SessionInfo,
    };
    pub use crate::report::{ComplianceReport, ReportExport, Verdict};
    pub use crate::rules::{
        EquivalenceRule, RuleConfig, RuleError, RuleRegistry, Tolerance, ToleranceMode,
    };
}
