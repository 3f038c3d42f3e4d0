//! # Protocol Data Model
//!
//! An imaging protocol is represented as a [`Protocol`] holding uniquely named
//! [`Sequence`]s (one per acquisition run), each holding uniquely named
//! [`Parameter`]s.
//!
//! ## Invariants
//!
//! - A parameter's value always matches its declared [`DataType`]
//!   (`Unspecified` matches every type).
//! - Names are unique within their container; lookups are O(1) through a
//!   private index built at construction.
//! - Everything is immutable after construction. A protocol owns its
//!   sequences; nothing is shared between protocols.
//!
//! ## Example
//!
//! ```rust
//! use mrprotocol::protocol::{Parameter, ProtocolBuilder, SequenceBuilder};
//!
//! let t1 = SequenceBuilder::new("T1")
//!     .parameter(Parameter::number("RepetitionTime", 2000.0).with_unit("ms"))
//!     .parameter(Parameter::token("PhaseEncodingDirection", "j-"))
//!     .build()?;
//!
//! let protocol = ProtocolBuilder::new("ABCD").version("3.0").sequence(t1).build()?;
//! assert!(protocol.parameter("T1", "RepetitionTime").is_some());
//! # Ok::<(), mrprotocol::protocol::ProtocolError>(())
//! ```

mod error;
mod model;
mod parameter;
mod sequence;
mod value;


pub use error::ProtocolError;
pub use model::{Protocol, ProtocolBuilder, SessionInfo};
pub use parameter::Parameter;
pub use sequence::{Sequence, SequenceBuilder};
pub use value::{DataType, ParamValue};
