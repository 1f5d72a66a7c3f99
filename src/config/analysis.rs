// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Spectral analysis configuration

use serde::{Deserialize, Serialize};

use crate::spectral::{SpectrogramMethod, WindowFunction};

/// Settings of the spectral engine and its estimators.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Taper applied before FFT and Welch estimates.
    pub window: WindowFunction,

    /// Per-frame estimate used for spectrograms.
    pub method: SpectrogramMethod,

    /// Fold the spectrogram time axis in groups of this many frames.
    ///
    /// No folding when absent.
    pub average_every: Option<usize>,

    /// Bins ignored next to the peak when measuring the FWHM.
    pub fwhm_skip: Option<usize>,

    /// Span in Hz of the channel power integration, the whole spectrum
    /// when absent.
    pub span: Option<f64>,

    /// Resolution bandwidth in Hz for channel power, defaults to the FFT
    /// bin width.
    pub rbw: Option<f64>,

    /// Largest wavelet width + 1 of the narrow peak finder.
    pub peak_accuracy: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: WindowFunction::Rectangular,
            method: SpectrogramMethod::Fft,
            average_every: None,
            fwhm_skip: None,
            span: None,
            rbw: None,
            peak_accuracy: 50,
        }
    }
}
