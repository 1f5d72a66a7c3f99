// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! FFT spectra and Welch density
//!
//! Every spectrum returned here uses the centered layout: index 0 holds the
//! most negative frequency and the DC bin sits at index `n / 2`.

use log::debug;
use rustfft::num_complex::{Complex32, Complex64};
use rustfft::FftPlanner;

use super::window::{periodic_hann, WindowFunction};
use super::SpectralError;

/// Reference impedance for power computations, in Ohm
pub const TERMINATION_OHM: f64 = 50.0;

/// Move the zero frequency bin to the center of the slice
pub fn fftshift<T>(values: &mut [T]) {
    let half = values.len() / 2;
    values.rotate_right(half);
}

/// Centered FFT bin frequencies for `n` points sampled at `sample_rate`.
///
/// # Example
///
/// ```
/// use rust_iqtools::spectral::fft_freqs;
///
/// assert_eq!(fft_freqs(4, 4.0), vec![-2.0, -1.0, 0.0, 1.0]);
/// assert_eq!(fft_freqs(5, 5.0), vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
/// ```
pub fn fft_freqs(n: usize, sample_rate: f64) -> Vec<f64> {
    let half = (n / 2) as f64;
    (0..n)
        .map(|i| (i as f64 - half) * sample_rate / n as f64)
        .collect()
}

pub(crate) fn check_sample_rate(sample_rate: f64) -> Result<(), SpectralError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(SpectralError::InvalidParameter(format!(
            "sample rate must be positive, got {}",
            sample_rate
        )))
    }
}

/// Result of a framed FFT average
#[derive(Debug, Clone)]
pub struct FftSpectrum {
    /// Centered frequency axis in Hz
    pub freqs: Vec<f64>,
    /// Average power into 50 Ohm, Watt
    pub power: Vec<f64>,
    /// Complex peak voltage per bin
    pub voltage: Vec<Complex64>,
}

/// Framed FFT average.
///
/// The first `frames × frame_length` samples are cut into rows, each row is
/// tapered and transformed, the rows are averaged and the result normalized
/// by `frames / frame_length` into a peak voltage. Power is
/// `(|V| / sqrt(2))² / 50`. `framing == None` treats the whole slice as one
/// frame.
pub fn get_fft(
    samples: &[Complex32],
    sample_rate: f64,
    window: WindowFunction,
    framing: Option<(usize, usize)>,
) -> Result<FftSpectrum, SpectralError> {
    check_sample_rate(sample_rate)?;
    let (frames, frame_length) = framing.unwrap_or((1, samples.len()));
    if frames == 0 || frame_length == 0 || samples.is_empty() {
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
        "FFT average over {} frames of {} points, {} window",
        frames, frame_length, window
    );
    let taper = window.coefficients(frame_length);
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(frame_length);

    let mut sum = vec![Complex64::new(0.0, 0.0); frame_length];
    let mut row = vec![Complex64::new(0.0, 0.0); frame_length];
    for frame in samples[..needed].chunks_exact(frame_length) {
        for ((dst, src), w) in row.iter_mut().zip(frame).zip(&taper) {
            *dst = Complex64::new(src.re as f64 * w, src.im as f64 * w);
        }
        fft.process(&mut row);
        for (acc, v) in sum.iter_mut().zip(&row) {
            *acc += *v;
        }
    }

    let norm = frames as f64 / frame_length as f64;
    let mut voltage: Vec<Complex64> = sum.iter().map(|v| *v / frames as f64 * norm).collect();
    let mut power: Vec<f64> = voltage
        .iter()
        .map(|v| {
            let v_rms = v.norm() / std::f64::consts::SQRT_2;
            v_rms * v_rms / TERMINATION_OHM
        })
        .collect();

    fftshift(&mut voltage);
    fftshift(&mut power);
    Ok(FftSpectrum {
        freqs: fft_freqs(frame_length, sample_rate),
        power,
        voltage,
    })
}

/// Welch power spectral density over the whole slice as a single segment.
///
/// The selected window is applied first, then the periodic Hann taper of
/// the density estimator; the segment mean is removed and the result is
/// scaled by `1 / (fs · Σw²)` where `w` is the Hann taper. Output is two
/// sided and centered.
pub fn get_pwelch(
    samples: &[Complex32],
    sample_rate: f64,
    window: WindowFunction,
) -> Result<(Vec<f64>, Vec<f64>), SpectralError> {
    check_sample_rate(sample_rate)?;
    let n = samples.len();
    if n == 0 {
        return Err(SpectralError::EmptyInput);
    }

    let taper = window.coefficients(n);
    let tapered: Vec<Complex64> = samples
        .iter()
        .zip(&taper)
        .map(|(s, w)| Complex64::new(s.re as f64 * w, s.im as f64 * w))
        .collect();
    let mean = tapered.iter().sum::<Complex64>() / n as f64;

    let hann = periodic_hann(n);
    let mut buf: Vec<Complex64> = tapered
        .iter()
        .zip(&hann)
        .map(|(x, h)| (*x - mean) * *h)
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut buf);

    let energy: f64 = hann.iter().map(|h| h * h).sum();
    let scale = 1.0 / (sample_rate * energy);
    let mut density: Vec<f64> = buf.iter().map(|v| v.norm_sqr() * scale).collect();
    fftshift(&mut density);

    Ok((fft_freqs(n, sample_rate), density))
}
