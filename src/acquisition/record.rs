// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! I/Q record model
//!
//! [`IqRecord`] is what every decoder fills in and what the spectral engine
//! reads. It is created empty with a file name, populated by exactly one
//! decode call, and afterwards only its framing view (`frames` ×
//! `frame_length`) may be changed with [`IqRecord::reframe`].

use chrono::NaiveDateTime;
use rustfft::num_complex::Complex32;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use super::DecodeError;

/// Timestamp layouts written by the IQT recorders
const TIMESTAMP_FORMATS: [&str; 3] = ["%m/%d/%Y %I:%M:%S %p", "%m/%d/%Y %H:%M:%S", "%d.%m.%Y %H:%M:%S"];

/// Decoded complex sample stream plus its acquisition metadata
#[derive(Debug, Clone, Default)]
pub struct IqRecord {
    /// Source file
    pub filename: PathBuf,
    /// Samples in chronological order, already scaled
    pub samples: Vec<Complex32>,
    /// Sampling rate in samples per second
    pub sample_rate_hz: f64,
    /// Center frequency of the capture in Hz
    pub center_frequency_hz: f64,
    /// Amplitude calibration applied to the raw integers
    pub scale_factor: f64,
    /// Number of frames in the current framing view
    pub frames: usize,
    /// Samples per frame in the current framing view
    pub frame_length: usize,
    /// Number of valid frames stored in the source
    pub frames_total: usize,
    /// Number of samples stored in the source (not only those read)
    pub nsamples_total: usize,
    pub span_hz: Option<f64>,
    pub acquisition_bandwidth_hz: Option<f64>,
    pub resolution_bandwidth_hz: Option<f64>,
    pub rf_attenuation_db: Option<f64>,
    /// Vendor formatted timestamp, kept verbatim
    pub timestamp: Option<String>,
}

impl IqRecord {
    /// Create an empty record bound to `filename`
    pub fn new<P: AsRef<Path>>(filename: P) -> Self {
        Self {
            filename: filename.as_ref().to_path_buf(),
            scale_factor: 1.0,
            ..Default::default()
        }
    }

    /// File name without its directory
    pub fn file_basename(&self) -> String {
        self.filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Duration of the complete source record in seconds
    pub fn record_length_s(&self) -> f64 {
        if self.sample_rate_hz > 0.0 {
            self.nsamples_total as f64 / self.sample_rate_hz
        } else {
            0.0
        }
    }

    /// Interpret the vendor timestamp, `None` if it is absent or unknown
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.as_deref()?.trim();
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }

    /// Reinterpret the same samples with a different framing.
    ///
    /// `frames × frame_length` must not exceed the number of loaded samples.
    pub fn reframe(&mut self, frames: usize, frame_length: usize) -> Result<(), DecodeError> {
        let needed = frames.checked_mul(frame_length).ok_or_else(|| {
            DecodeError::InvalidRequest(format!("{} x {} overflows", frames, frame_length))
        })?;
        if frame_length == 0 || needed > self.samples.len() {
            return Err(DecodeError::InvalidRequest(format!(
                "cannot view {} samples as {} frames of {}",
                self.samples.len(),
                frames,
                frame_length
            )));
        }
        self.frames = frames;
        self.frame_length = frame_length;
        Ok(())
    }

    /// Flat view of the descriptive fields, without the samples
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            file_name: self.filename.to_string_lossy().into_owned(),
            center: self.center_frequency_hz,
            number_samples: self.nsamples_total,
            fs: self.sample_rate_hz,
            nframes: self.frames,
            lframes: self.frame_length,
            nframes_tot: self.frames_total,
            record_length: self.record_length_s(),
            date_time: self.timestamp.clone(),
            rf_att: self.rf_attenuation_db,
            span: self.span_hz,
            acq_bw: self.acquisition_bandwidth_hz,
            rbw: self.resolution_bandwidth_hz,
            data: None,
        }
    }

    /// Same as [`IqRecord::summary`] with the sample array attached as
    /// `[re, im]` pairs
    pub fn summary_with_samples(&self) -> RecordSummary {
        RecordSummary {
            data: Some(self.samples.iter().map(|c| [c.re, c.im]).collect()),
            ..self.summary()
        }
    }
}

/// Flat mapping of a record's descriptive fields for presentation layers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecordSummary {
    pub file_name: String,
    pub center: f64,
    pub number_samples: usize,
    pub fs: f64,
    pub nframes: usize,
    pub lframes: usize,
    pub nframes_tot: usize,
    /// Seconds
    pub record_length: f64,
    #[serde(rename = "DateTime")]
    pub date_time: Option<String>,
    pub rf_att: Option<f64>,
    pub span: Option<f64>,
    pub acq_bw: Option<f64>,
    pub rbw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<[f32; 2]>>,
}

fn fmt_opt(value: &Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "n/a".to_string())
}

impl fmt::Display for RecordSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File name:      {}", self.file_name)?;
        writeln!(f, "Record length:  {:.2e} [s]", self.record_length)?;
        writeln!(f, "No. Samples:    {}", self.number_samples)?;
        writeln!(f, "Sampling rate:  {} [sps]", self.fs)?;
        writeln!(f, "Center freq.:   {} [Hz]", self.center)?;
        writeln!(f, "Span:           {} [Hz]", fmt_opt(&self.span))?;
        writeln!(f, "Acq. BW.:       {}", fmt_opt(&self.acq_bw))?;
        writeln!(f, "RBW:            {}", fmt_opt(&self.rbw))?;
        writeln!(f, "RF Att.:        {}", fmt_opt(&self.rf_att))?;
        write!(
            f,
            "Date and Time:  {}",
            self.date_time.as_deref().unwrap_or("n/a")
        )
    }
}
