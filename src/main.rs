//! # mrprotocol
//!
//! A command-line tool for checking MR imaging acquisitions against
//! reference protocols.
//!
//! ## Supported Inputs
//!
//! - **Definition XML**: reference protocols with embedded rules
//! - **Protocol JSON**: the serialized protocol model
//! - **DICOM JSON**: arrays of DICOM headers keyed by keyword or tag
//! - **BIDS**: JSON sidecars, or a directory of them
//!
//! ## Usage
//!
//! ```bash
//! # Check one session against the reference
//! mrprotocol compare abcd.xml sub-01_headers.json
//!
//! # Check many sessions in parallel, JSON output
//! mrprotocol batch abcd.xml sessions/*.json --format json
//!
//! # Promote an acquisition to a reference definition
//! mrprotocol export sub-01_headers.json reference.xml --name ABCD --version 3.0
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
