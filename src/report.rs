// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! One-shot analysis of a decoded record
//!
//! [`analyze_record`] chains the spectral engine the way the command line
//! tool uses it: averaged spectrum, peak and bandwidth, channel power and
//! the power of every (optionally folded) spectrogram row.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::acquisition::IqRecord;
use crate::config::AnalysisConfig;
use crate::spectral::{
    average_spectrogram, channel_power, frame_power_vs_time, get_broad_peak_dbm, get_fwhm,
    get_narrow_peaks_dbm, SpectralAnalyzer, SpectrogramMethod, WindowFunction,
};
use crate::utility::watt_to_dbm;

/// Result of an analysis run over one capture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub file_name: String,
    /// Center frequency of the capture in Hz
    pub center_frequency: f64,
    pub sample_rate: f64,
    pub frames: usize,
    pub frame_length: usize,
    pub window: WindowFunction,
    pub method: SpectrogramMethod,
    /// Strongest bin, offset from the center in Hz
    pub peak_frequency: f64,
    pub peak_dbm: f64,
    /// Full width at half maximum in Hz
    pub fwhm: f64,
    pub channel_power_dbm: f64,
    /// Narrow peak offsets from the center in Hz
    pub narrow_peaks: Vec<f64>,
    /// Time stamp of every spectrogram row in seconds
    pub time: Vec<f64>,
    /// Channel power of every spectrogram row in dBm
    pub power_vs_time: Vec<f64>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Analyse the current framing view of `record` with `config`.
///
/// The channel power RBW defaults to the FFT bin width
/// `sample_rate / frame_length`.
pub fn analyze_record(record: &IqRecord, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let analyzer = SpectralAnalyzer::for_record(record)
        .context("Record has no usable sample rate")?
        .with_window(config.window)
        .with_method(config.method);
    let fs = analyzer.sample_rate();
    let (frames, frame_length) = (record.frames, record.frame_length);

    info!(
        "Analysing {} frames of {} samples with {} window and {} spectrogram",
        frames, frame_length, config.window, config.method
    );

    let spectrum = analyzer
        .fft(&record.samples, Some((frames, frame_length)))
        .context("Averaged FFT failed")?;

    let fwhm = get_fwhm(&spectrum.freqs, &spectrum.power, config.fwhm_skip)?;
    let (peak_f, _) = get_broad_peak_dbm(&spectrum.freqs, &spectrum.power)?;
    let (narrow_peaks, _) =
        get_narrow_peaks_dbm(&spectrum.freqs, &spectrum.power, config.peak_accuracy)?;
    debug!("{} narrow peaks found", narrow_peaks.len());

    let rbw = config.rbw.unwrap_or(fs / frame_length as f64);
    let power = channel_power(&spectrum.freqs, &spectrum.power, rbw, config.span)?;

    let mut sgram = analyzer
        .record_spectrogram(record)
        .context("Spectrogram failed")?;
    if let Some(every) = config.average_every {
        sgram = average_spectrogram(&sgram, every)?;
    }
    let (time, row_power) = frame_power_vs_time(&sgram, rbw, config.span)?;

    Ok(AnalysisReport {
        file_name: record.file_basename(),
        center_frequency: record.center_frequency_hz,
        sample_rate: fs,
        frames,
        frame_length,
        window: config.window,
        method: config.method,
        peak_frequency: peak_f[0],
        peak_dbm: fwhm.peak_dbm,
        fwhm: fwhm.fwhm,
        channel_power_dbm: watt_to_dbm(power),
        narrow_peaks,
        time,
        power_vs_time: row_power.into_iter().map(watt_to_dbm).collect(),
        timestamp: chrono::Utc::now(),
    })
}
