// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! DPI DAC Display-Mode Library for Rust
//!
//! Mode resolution and EDID synthesis for DPI-to-VGA bridges (resistor-ladder
//! DACs hanging off a parallel RGB bus). Such outputs have no DDC line, so the
//! display pipeline has to be told which timings the output supports and has
//! to be handed an EDID that it can trust as ground truth.
//!
//! The library turns a handful of loosely specified inputs into exactly that:
//!
//! 1. Timing descriptors (a 13-field timings document, a forced mode string,
//!    a preferred mode string) are parsed into [`timing::VideoTiming`] records.
//! 2. A [`catalog::ModeCatalog`] is assembled from the prioritized sources,
//!    deduplicated by resolution and refresh rate.
//! 3. Exactly one catalog entry is flagged preferred by
//!    [`catalog::select_preferred`].
//! 4. A two-block EDID (base block + CTA-861 extension) is synthesized by
//!    [`edid::synthesize_edid`], signalling the preferred mode as native.
//!
//! # Quick Start
//!
//! ```
//! use dpidac::catalog::{build_catalog, select_preferred, OrderedSources};
//! use dpidac::edid::{synthesize_edid, DisplayIdentity};
//! use dpidac::mode::DesiredModeSpec;
//!
//! let mut catalog = build_catalog(&OrderedSources::default());
//! let want = DesiredModeSpec::parse("720p60").ok();
//! select_preferred(&mut catalog, want.as_ref());
//!
//! let preferred = catalog.preferred().expect("catalog is never empty here");
//! assert_eq!(preferred.display_name(), "1280x720@60");
//!
//! let edid = synthesize_edid(&DisplayIdentity::default(), "720p60")?;
//! assert_eq!(edid.native_vic(), Some(4));
//! # Ok::<(), dpidac::Error>(())
//! ```
//!
//! # Bridge Lifecycle
//!
//! [`bridge::Bridge`] wraps the pipeline behind a create/attach/detach/destroy
//! handle that owns the currently published EDID blob.
//!
//! ```
//! use dpidac::bridge::{Bridge, BridgeConfig};
//!
//! let mut bridge = Bridge::create(BridgeConfig::default());
//! let published = bridge.attach()?;
//! assert_eq!(published.edid.as_bytes().len(), 256);
//! let retired = bridge.detach();
//! assert!(retired.is_some());
//! bridge.destroy();
//! # Ok::<(), dpidac::Error>(())
//! ```

use std::{error, fmt, io};

/// Error type for mode resolution and EDID synthesis
#[derive(Debug)]
pub enum Error {
    /// A timing line or mode descriptor could not be parsed or is
    /// structurally invalid (zero-length porch, unsupported shorthand, ...)
    MalformedLine(String),

    /// A pixel bus format name is not one of the supported encodings
    UnrecognizedBusFormat(String),

    /// The EDID buffer could not be allocated
    AllocationFailure,

    /// Display identity fields cannot be encoded into an EDID
    InvalidIdentity(String),

    /// I/O error while reading a timings document
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MalformedLine(line) => write!(f, "malformed mode descriptor: {}", line),
            Error::UnrecognizedBusFormat(name) => {
                write!(f, "unrecognized bus format: {}", name)
            }
            Error::AllocationFailure => write!(f, "failed to allocate EDID buffer"),
            Error::InvalidIdentity(msg) => write!(f, "invalid display identity: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::MalformedLine(_)
            | Error::UnrecognizedBusFormat(_)
            | Error::AllocationFailure
            | Error::InvalidIdentity(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// The timing module provides the normalized timing record and the
/// timings-document parser.
pub mod timing;

/// The mode module provides the desired/forced mode descriptor grammars.
pub mod mode;

/// The cvt module generates VESA CVT timings for modes with no known timing.
pub mod cvt;

/// The catalog module assembles and ranks candidate modes.
pub mod catalog;

/// The edid module synthesizes the two-block EDID binary.
pub mod edid;

/// The bus_format module provides the DPI pixel bus encodings.
pub mod bus_format;

/// The bridge module ties the pipeline to an attach/detach lifecycle.
pub mod bridge;
