// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Spectrograms
//!
//! A [`Spectrogram`] holds three grids of shape `(frames, frame_length)`:
//! the frequency and time meshes and the power estimate. Row `r` is frame
//! `r`, column `c` is frequency bin `c` in the centered layout.
//!
//! ```
//! use rust_iqtools::spectral::{get_spectrogram, SpectrogramMethod, WindowFunction};
//! use rust_iqtools::utility::IqNoiseGenerator;
//!
//! let tone = IqNoiseGenerator::generate_tone(8 * 64, 100.0, 1000.0, 1.0);
//! let sgram = get_spectrogram(&tone, 1000.0, 8, 64, SpectrogramMethod::Fft, WindowFunction::Rectangular).unwrap();
//! assert_eq!(sgram.shape(), (8, 64));
//! ```

use log::debug;
use ndarray::{s, Array2, Axis};
use rustfft::num_complex::{Complex32, Complex64};
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::fft::{check_sample_rate, fftshift, get_pwelch};
use super::multitaper::Multitaper;
use super::peaks::get_fwhm;
use super::power::channel_power;
use super::window::WindowFunction;
use super::SpectralError;

/// Bins ignored next to the peak when measuring the momentum spread
pub const DP_P_FWHM_SKIP: usize = 20;

/// Per-frame spectral estimate used to fill the power grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectrogramMethod {
    /// Magnitude of the plain FFT of each frame
    #[default]
    Fft,
    /// Welch density of each frame
    Welch,
    /// Multitaper density of each frame (NW = 4, 6 tapers)
    #[serde(alias = "mtm")]
    Multitaper,
}

impl FromStr for SpectrogramMethod {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fft" => Ok(SpectrogramMethod::Fft),
            "welch" => Ok(SpectrogramMethod::Welch),
            "multitaper" | "mtm" => Ok(SpectrogramMethod::Multitaper),
            _ => Err(SpectralError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for SpectrogramMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectrogramMethod::Fft => write!(f, "fft"),
            SpectrogramMethod::Welch => write!(f, "welch"),
            SpectrogramMethod::Multitaper => write!(f, "multitaper"),
        }
    }
}

/// Spectral estimate of a single frame, centered
pub trait FrameEstimator {
    fn frame_spectrum(
        &self,
        planner: &mut FftPlanner<f64>,
        frame: &[Complex32],
        sample_rate: f64,
    ) -> Result<Vec<f64>, SpectralError>;
}

/// `|FFT(x)|`, no taper
struct FftMagnitude;

impl FrameEstimator for FftMagnitude {
    fn frame_spectrum(
        &self,
        planner: &mut FftPlanner<f64>,
        frame: &[Complex32],
        _sample_rate: f64,
    ) -> Result<Vec<f64>, SpectralError> {
        let mut buf: Vec<Complex64> = frame
            .iter()
            .map(|x| Complex64::new(x.re as f64, x.im as f64))
            .collect();
        planner.plan_fft_forward(buf.len()).process(&mut buf);
        let mut magnitude: Vec<f64> = buf.iter().map(|v| v.norm()).collect();
        fftshift(&mut magnitude);
        Ok(magnitude)
    }
}

struct WelchDensity {
    window: WindowFunction,
}

impl FrameEstimator for WelchDensity {
    fn frame_spectrum(
        &self,
        _planner: &mut FftPlanner<f64>,
        frame: &[Complex32],
        sample_rate: f64,
    ) -> Result<Vec<f64>, SpectralError> {
        get_pwelch(frame, sample_rate, self.window).map(|(_, p)| p)
    }
}

impl FrameEstimator for Multitaper {
    fn frame_spectrum(
        &self,
        planner: &mut FftPlanner<f64>,
        frame: &[Complex32],
        sample_rate: f64,
    ) -> Result<Vec<f64>, SpectralError> {
        self.estimate(planner, frame, sample_rate)
    }
}

/// Create the estimator for `method`; multitaper tapers are built once for
/// `frame_length`.
pub fn create_frame_estimator(
    method: SpectrogramMethod,
    window: WindowFunction,
    frame_length: usize,
) -> Result<Box<dyn FrameEstimator>, SpectralError> {
    Ok(match method {
        SpectrogramMethod::Fft => Box::new(FftMagnitude),
        SpectrogramMethod::Welch => Box::new(WelchDensity { window }),
        SpectrogramMethod::Multitaper => Box::new(Multitaper::with_defaults(frame_length)?),
    })
}

/// Frequency, time and power grids of identical shape
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// Frequency of every cell in Hz, constant along axis 0
    pub freq: Array2<f64>,
    /// Start time of every cell's frame in seconds, constant along axis 1
    pub time: Array2<f64>,
    pub power: Array2<f64>,
}

impl Spectrogram {
    /// Build a spectrogram from a power grid, deriving both meshes.
    ///
    /// Time is `row × cols / fs`, frequency `(col - (cols - 1) / 2) × fs / cols`.
    pub fn from_power(power: Array2<f64>, sample_rate: f64) -> Self {
        let (rows, cols) = power.dim();
        let half = (cols as f64 - 1.0) / 2.0;
        let bin = sample_rate / cols as f64;
        let frame_time = cols as f64 / sample_rate;
        Self {
            freq: Array2::from_shape_fn((rows, cols), |(_, c)| (c as f64 - half) * bin),
            time: Array2::from_shape_fn((rows, cols), |(r, _)| r as f64 * frame_time),
            power,
        }
    }

    /// `(frames, bins)`
    pub fn shape(&self) -> (usize, usize) {
        self.power.dim()
    }

    /// Time stamp of every row
    pub fn time_axis(&self) -> Vec<f64> {
        self.time.column(0).to_vec()
    }

    /// Frequency and power slice of one row
    pub fn slice(&self, row: usize) -> (Vec<f64>, Vec<f64>) {
        (self.freq.row(row).to_vec(), self.power.row(row).to_vec())
    }
}

/// Frame by frame spectrogram of the first `frames × frame_length` samples
pub fn get_spectrogram(
    samples: &[Complex32],
    sample_rate: f64,
    frames: usize,
    frame_length: usize,
    method: SpectrogramMethod,
    window: WindowFunction,
) -> Result<Spectrogram, SpectralError> {
    check_sample_rate(sample_rate)?;
    if frames == 0 || frame_length == 0 {
        return Err(SpectralError::EmptyInput);
    }
    let needed = frames.checked_mul(frame_length).ok_or_else(|| {
        SpectralError::InvalidParameter(format!(
            "{} frames of {} points overflows",
            frames, frame_length
        ))
    })?;
    if needed > samples.len() {
        return Err(SpectralError::ShapeMismatch {
            expected: needed,
            actual: samples.len(),
        });
    }

    debug!(
        "{} spectrogram of {} frames x {} bins",
        method, frames, frame_length
    );
    let estimator = create_frame_estimator(method, window, frame_length)?;
    let mut planner = FftPlanner::new();
    let mut power = Array2::zeros((frames, frame_length));
    for (mut row, frame) in power
        .axis_iter_mut(Axis(0))
        .zip(samples[..needed].chunks_exact(frame_length))
    {
        let spectrum = estimator.frame_spectrum(&mut planner, frame, sample_rate)?;
        for (dst, v) in row.iter_mut().zip(spectrum) {
            *dst = v;
        }
    }
    Ok(Spectrogram::from_power(power, sample_rate))
}

/// Fold the time axis in groups of `every` rows.
///
/// Power is averaged within each group and the group takes the time of its
/// last row. Trailing rows that do not fill a group are dropped.
pub fn average_spectrogram(sgram: &Spectrogram, every: usize) -> Result<Spectrogram, SpectralError> {
    let (rows, cols) = sgram.shape();
    if every == 0 || every > rows {
        return Err(SpectralError::InvalidFold { every, rows });
    }
    let groups = rows / every;
    if rows % every != 0 {
        debug!(
            "Folding {} rows by {} drops the last {} rows",
            rows,
            every,
            rows % every
        );
    }

    let mut power = Array2::zeros((groups, cols));
    let mut time = Array2::zeros((groups, cols));
    for g in 0..groups {
        let block = sgram.power.slice(s![g * every..(g + 1) * every, ..]);
        let mean = block.mean_axis(Axis(0)).ok_or(SpectralError::EmptyInput)?;
        power.row_mut(g).assign(&mean);
        time.row_mut(g).assign(&sgram.time.row(g * every + every - 1));
    }

    Ok(Spectrogram {
        freq: sgram.freq.slice(s![..groups, ..]).to_owned(),
        time,
        power,
    })
}

/// Channel power of every row against the row's time stamp
pub fn frame_power_vs_time(
    sgram: &Spectrogram,
    rbw: f64,
    span: Option<f64>,
) -> Result<(Vec<f64>, Vec<f64>), SpectralError> {
    let power = (0..sgram.shape().0)
        .map(|r| {
            let (f, p) = sgram.slice(r);
            channel_power(&f, &p, rbw, span)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((sgram.time_axis(), power))
}

/// Plain sum of every row against the row's time stamp
pub fn frame_sum_vs_time(sgram: &Spectrogram) -> (Vec<f64>, Vec<f64>) {
    let sums = sgram.power.sum_axis(Axis(1)).to_vec();
    (sgram.time_axis(), sums)
}

/// Relative momentum spread of every row, `fwhm / (peak + center) / eta`.
///
/// The FWHM is measured with [`DP_P_FWHM_SKIP`] bins skipped around the
/// peak. `peak` is the peak level in dBm reported by [`get_fwhm`].
pub fn dp_p_vs_time(
    sgram: &Spectrogram,
    center: f64,
    eta: f64,
) -> Result<(Vec<f64>, Vec<f64>), SpectralError> {
    if eta == 0.0 || !eta.is_finite() {
        return Err(SpectralError::InvalidParameter(format!(
            "slip factor must be finite and non-zero, got {}",
            eta
        )));
    }
    let dp_p = (0..sgram.shape().0)
        .map(|r| {
            let (f, p) = sgram.slice(r);
            let fwhm = get_fwhm(&f, &p, Some(DP_P_FWHM_SKIP))?;
            Ok(fwhm.fwhm / (fwhm.peak_dbm + center) / eta)
        })
        .collect::<Result<Vec<_>, SpectralError>>()?;
    Ok((sgram.time_axis(), dp_p))
}
