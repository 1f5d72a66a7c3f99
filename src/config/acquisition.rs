// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Acquisition configuration
//!
//! How much of a capture to read and how to interpret containers that don't
//! describe themselves.

use serde::{Deserialize, Serialize};

use crate::acquisition::{FlatParams, IqFormat};

/// Settings for reading a capture file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Container format of the input.
    ///
    /// When absent the format is guessed from the file extension.
    pub format: Option<IqFormat>,

    /// Number of frames to read.
    pub frames: usize,

    /// Samples per frame. Must be greater than zero.
    pub frame_length: usize,

    /// First frame to read, counted from zero.
    pub start_frame: usize,

    /// Sample rate in samples per second, used only by flat formats.
    pub sample_rate: Option<f64>,

    /// Center frequency in Hz, used only by flat formats.
    pub center_frequency: Option<f64>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            format: None,
            frames: 10,
            frame_length: 1024,
            start_frame: 0,
            sample_rate: None,
            center_frequency: None,
        }
    }
}

impl AcquisitionConfig {
    /// Parameters handed to flat format decoders
    pub fn flat_params(&self) -> FlatParams {
        FlatParams {
            sample_rate_hz: self.sample_rate.unwrap_or(0.0),
            center_frequency_hz: self.center_frequency.unwrap_or(0.0),
            timestamp: None,
        }
    }
}
