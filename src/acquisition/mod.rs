// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! I/Q record acquisition module
//!
//! This module turns recorded capture files into an [`IqRecord`]: a complex
//! sample array plus sample rate, center frequency and descriptive metadata.
//!
//! Each container format has its own decoder behind the [`IqDecoder`] trait:
//!
//! - [`IqtDecoder`]: framed IQT containers (text header + fixed size binary
//!   frames with interleaved quadrature/in-phase integers)
//! - [`GrDecoder`]: flat GNU Radio complex64 dumps, where sample rate and
//!   center frequency come from the caller
//!
//! ```no_run
//! use rust_iqtools::acquisition::{create_decoder, FlatParams, IqFormat};
//!
//! let decoder = create_decoder("capture.iqt", IqFormat::Iqt, FlatParams::default()).unwrap();
//! let record = decoder.decode(10, 1024, 0).unwrap();
//! println!("{} samples at {} S/s", record.samples.len(), record.sample_rate_hz);
//! ```

pub mod gnuradio;
pub mod header;
pub mod iqt;
pub mod record;

pub use gnuradio::GrDecoder;
pub use header::HeaderDictionary;
pub use iqt::{IqtDecoder, IqtFrameMetadata, IqtHeader, IqtWriter};
pub use record::{IqRecord, RecordSummary};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while decoding a container
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source ended before the requested frame range was read.
    ///
    /// Both counts are in frames of the caller's `frame_length`; raw sample
    /// reads use one-sample frames. `partial` holds the frames that were
    /// fully decoded, it is never zero filled. Whether it is usable is the
    /// caller's decision.
    #[error("Source ended after {decoded_frames} of {requested_frames} requested frames")]
    Truncated {
        requested_frames: usize,
        decoded_frames: usize,
        partial: Box<IqRecord>,
    },

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Malformed header: required key '{0}' is missing")]
    MissingKey(String),

    #[error("Malformed header: value '{value}' of key '{key}' is not valid")]
    InvalidValue { key: String, value: String },

    #[error("Invalid read request: {0}")]
    InvalidRequest(String),
}

impl DecodeError {
    /// True for all header related failures
    pub fn is_malformed_header(&self) -> bool {
        matches!(
            self,
            DecodeError::MalformedHeader(_)
                | DecodeError::MissingKey(_)
                | DecodeError::InvalidValue { .. }
        )
    }

    /// Take the partially decoded record out of a truncation error
    pub fn into_partial(self) -> Option<IqRecord> {
        match self {
            DecodeError::Truncated { partial, .. } => Some(*partial),
            _ => None,
        }
    }
}

/// Common contract of all container decoders
pub trait IqDecoder {
    /// Decode `frames × frame_length` samples starting at `start_frame`.
    ///
    /// `start_frame` is zero based and counted in the container's own frame
    /// unit: binary frames of 1024 points for IQT, frames of `frame_length`
    /// samples for flat captures. A request whose sample or byte offsets do
    /// not fit in the address space is an [`DecodeError::InvalidRequest`].
    fn decode(
        &self,
        frames: usize,
        frame_length: usize,
        start_frame: usize,
    ) -> Result<IqRecord, DecodeError>;

    /// Decode `nsamples` samples starting at sample `offset`.
    ///
    /// The returned record is framed as one frame of `nsamples`.
    fn read_samples(&self, nsamples: usize, offset: usize) -> Result<IqRecord, DecodeError>;

    /// Format handled by this decoder
    fn format(&self) -> IqFormat;
}

/// Supported container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IqFormat {
    /// Framed IQT container
    Iqt,
    /// Raw complex64 samples as written by GNU Radio file sinks
    Gnuradio,
}

impl IqFormat {
    /// Guess the format from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "iqt" => Some(IqFormat::Iqt),
            "bin" | "cfile" | "raw" | "dat" => Some(IqFormat::Gnuradio),
            _ => None,
        }
    }
}

impl FromStr for IqFormat {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iqt" => Ok(IqFormat::Iqt),
            "gnuradio" | "gr" => Ok(IqFormat::Gnuradio),
            other => Err(DecodeError::InvalidRequest(format!(
                "unsupported container format '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for IqFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IqFormat::Iqt => write!(f, "iqt"),
            IqFormat::Gnuradio => write!(f, "gnuradio"),
        }
    }
}

/// Acquisition parameters flat formats can't store themselves
#[derive(Debug, Clone, Default)]
pub struct FlatParams {
    pub sample_rate_hz: f64,
    pub center_frequency_hz: f64,
    pub timestamp: Option<String>,
}

/// Create a decoder for the given file and format
pub fn create_decoder<P: AsRef<Path>>(
    path: P,
    format: IqFormat,
    params: FlatParams,
) -> Result<Box<dyn IqDecoder>, DecodeError> {
    match format {
        IqFormat::Iqt => Ok(Box::new(IqtDecoder::new(path))),
        IqFormat::Gnuradio => Ok(Box::new(GrDecoder::new(
            path,
            params.sample_rate_hz,
            params.center_frequency_hz,
            params.timestamp,
        )?)),
    }
}
