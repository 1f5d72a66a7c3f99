// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).
//!
//! Spectral analysis module
//!
//! This module turns complex sample arrays into frequency-domain products:
//! averaged FFT spectra, Welch and multitaper densities, spectrograms and
//! their time folding, peak and bandwidth estimates and channel power.
//!
//! The free functions are pure transforms. [`SpectralAnalyzer`] bundles the
//! selected window, spectrogram method and sample rate so that a sequence
//! of analyses on one record doesn't repeat them.
//!
//! ## Usage
//!
//! ```
//! use rust_iqtools::spectral::{create_spectral_analyzer, get_fwhm};
//! use rust_iqtools::acquisition::IqRecord;
//! use rust_iqtools::utility::IqNoiseGenerator;
//!
//! let mut record = IqRecord::new("synthetic");
//! record.sample_rate_hz = 1.0e6;
//! record.samples = IqNoiseGenerator::new(1).generate_tone_with_noise(4096, 50e3, 1.0e6, 1.0, 0.01);
//!
//! let analyzer = create_spectral_analyzer(&record, "hanning", "fft").unwrap();
//! let spectrum = analyzer.fft(&record.samples, Some((4, 1024))).unwrap();
//! let fwhm = get_fwhm(&spectrum.freqs, &spectrum.power, None).unwrap();
//! assert!(fwhm.fwhm > 0.0);
//! ```

pub mod fft;
pub mod multitaper;
pub mod peaks;
pub mod power;
pub mod spectrogram;
pub mod window;

pub use fft::{fft_freqs, fftshift, get_fft, get_pwelch, FftSpectrum};
pub use multitaper::{dpss, Multitaper};
pub use peaks::{
    find_peaks_cwt, get_broad_peak_dbm, get_fwhm, get_narrow_peaks_dbm, get_sigma_estimate, Fwhm,
    SigmaEstimate,
};
pub use power::{channel_power, shift_cut_data_time, shift_to_center_frequency, zoom_in_freq};
pub use spectrogram::{
    average_spectrogram, dp_p_vs_time, frame_power_vs_time, frame_sum_vs_time, get_spectrogram,
    FrameEstimator, Spectrogram, SpectrogramMethod,
};
pub use window::{get_window, WindowFunction};

use rustfft::num_complex::Complex32;
use thiserror::Error;

use crate::acquisition::IqRecord;

/// Errors raised by the spectral engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectralError {
    #[error("Unsupported window '{0}', expected rectangular, bartlett, blackman, hamming or hanning")]
    UnsupportedWindow(String),

    #[error("Unsupported spectrogram method '{0}', expected fft, welch or multitaper")]
    UnsupportedMethod(String),

    #[error("Shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Cannot fold {rows} spectrogram rows in groups of {every}")]
    InvalidFold { every: usize, rows: usize },

    #[error("Empty input")]
    EmptyInput,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Spectral engine bound to one sample rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralAnalyzer {
    window: WindowFunction,
    method: SpectrogramMethod,
    sample_rate: f64,
}

impl SpectralAnalyzer {
    /// Rectangular window, FFT spectrograms
    pub fn new(sample_rate: f64) -> Result<Self, SpectralError> {
        fft::check_sample_rate(sample_rate)?;
        Ok(Self {
            window: WindowFunction::default(),
            method: SpectrogramMethod::default(),
            sample_rate,
        })
    }

    /// Engine using the sample rate of `record`
    pub fn for_record(record: &IqRecord) -> Result<Self, SpectralError> {
        Self::new(record.sample_rate_hz)
    }

    pub fn with_window(mut self, window: WindowFunction) -> Self {
        self.window = window;
        self
    }

    pub fn with_method(mut self, method: SpectrogramMethod) -> Self {
        self.method = method;
        self
    }

    pub fn window_function(&self) -> WindowFunction {
        self.window
    }

    pub fn method(&self) -> SpectrogramMethod {
        self.method
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Coefficients of the selected window
    pub fn window(&self, n: usize) -> Vec<f64> {
        self.window.coefficients(n)
    }

    pub fn fft_freqs(&self, n: usize) -> Vec<f64> {
        fft_freqs(n, self.sample_rate)
    }

    pub fn fft(
        &self,
        samples: &[Complex32],
        framing: Option<(usize, usize)>,
    ) -> Result<FftSpectrum, SpectralError> {
        get_fft(samples, self.sample_rate, self.window, framing)
    }

    pub fn pwelch(&self, samples: &[Complex32]) -> Result<(Vec<f64>, Vec<f64>), SpectralError> {
        get_pwelch(samples, self.sample_rate, self.window)
    }

    pub fn spectrogram(
        &self,
        samples: &[Complex32],
        frames: usize,
        frame_length: usize,
    ) -> Result<Spectrogram, SpectralError> {
        get_spectrogram(
            samples,
            self.sample_rate,
            frames,
            frame_length,
            self.method,
            self.window,
        )
    }

    /// Spectrogram over the record's current framing view
    pub fn record_spectrogram(&self, record: &IqRecord) -> Result<Spectrogram, SpectralError> {
        self.spectrogram(&record.samples, record.frames, record.frame_length)
    }
}

/// Create a spectral engine for `record` from window and method names
pub fn create_spectral_analyzer(
    record: &IqRecord,
    window: &str,
    method: &str,
) -> Result<SpectralAnalyzer, SpectralError> {
    Ok(SpectralAnalyzer::for_record(record)?
        .with_window(window.parse()?)
        .with_method(method.parse()?))
}
