// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Synthetic I/Q Signal Generator
//!
//! Reproducible complex test signals for exercising the decoders and the
//! spectral engine without a recorded capture:
//!
//! - circular complex Gaussian white noise
//! - complex exponentials (single tones) at a chosen offset from the center
//! - tone plus noise mixtures
//!
//! ## Examples
//!
//! ```rust
//! use rust_iqtools::utility::noise_generator::IqNoiseGenerator;
//!
//! let mut generator = IqNoiseGenerator::new(12345);
//!
//! // 4096 samples of a 10 kHz tone sampled at 1 MS/s, buried in noise
//! let samples = generator.generate_tone_with_noise(4096, 10_000.0, 1.0e6, 0.5, 0.01);
//! assert_eq!(samples.len(), 4096);
//! ```

use rustfft::num_complex::Complex32;
use std::time::SystemTime;

/// Pseudo-random complex noise source built on an XORShift generator.
///
/// Not suitable for cryptographic use. Two generators created with the same
/// seed produce the same sample sequence.
pub struct IqNoiseGenerator {
    rng_state: u32,
}

impl IqNoiseGenerator {
    /// Creates a new generator with a given seed.
    ///
    /// XORShift never leaves the all-zero state, so a zero seed is replaced
    /// by a fixed non-zero constant.
    pub fn new(seed: u32) -> Self {
        let rng_state = if seed == 0 { 0x9E37_79B9 } else { seed };
        Self { rng_state }
    }

    /// Creates a new generator seeded from the system clock.
    pub fn new_from_system_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u32)
            .unwrap_or(1);
        Self::new(seed)
    }

    /// Uniform value in `[-1.0, 1.0]`
    pub fn random_float(&mut self) -> f32 {
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 17;
        self.rng_state ^= self.rng_state << 5;

        (self.rng_state as f32 / u32::MAX as f32) * 2.0 - 1.0
    }

    /// Standard normal value (Box-Muller transform)
    ///
    /// ```text
    /// z = sqrt(-2 * ln(u1)) * cos(2 * π * u2)
    /// ```
    pub fn random_gaussian(&mut self) -> f32 {
        let u1 = (self.random_float() + 1.0) / 2.0;
        let u2 = (self.random_float() + 1.0) / 2.0;

        // Avoid ln(0)
        let u1 = if u1 < 0.0001 { 0.0001 } else { u1 };

        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
    }

    /// Circular complex Gaussian noise with standard deviation `amplitude`
    /// on each of the I and Q components.
    pub fn generate_complex_noise(&mut self, num_samples: usize, amplitude: f32) -> Vec<Complex32> {
        (0..num_samples)
            .map(|_| {
                Complex32::new(
                    self.random_gaussian() * amplitude,
                    self.random_gaussian() * amplitude,
                )
            })
            .collect()
    }

    /// Complex exponential `amplitude · exp(j·2π·f·n/fs)`.
    ///
    /// `frequency` is the offset from the capture center and may be negative.
    pub fn generate_tone(
        num_samples: usize,
        frequency: f64,
        sample_rate: f64,
        amplitude: f32,
    ) -> Vec<Complex32> {
        (0..num_samples)
            .map(|n| {
                let phase = 2.0 * std::f64::consts::PI * frequency * n as f64 / sample_rate;
                Complex32::new(
                    amplitude * phase.cos() as f32,
                    amplitude * phase.sin() as f32,
                )
            })
            .collect()
    }

    /// Single tone plus complex Gaussian noise
    pub fn generate_tone_with_noise(
        &mut self,
        num_samples: usize,
        frequency: f64,
        sample_rate: f64,
        tone_amplitude: f32,
        noise_amplitude: f32,
    ) -> Vec<Complex32> {
        let tone = Self::generate_tone(num_samples, frequency, sample_rate, tone_amplitude);
        let noise = self.generate_complex_noise(num_samples, noise_amplitude);
        tone.into_iter().zip(noise).map(|(t, n)| t + n).collect()
    }
}

/// Quantize a complex value to a pair of saturating 16-bit integers `(i, q)`
/// with `full_scale` mapped to 32767.
pub fn quantize_i16(sample: Complex32, full_scale: f32) -> (i16, i16) {
    let scale = 32767.0 / full_scale;
    let i = (sample.re * scale).round().clamp(-32768.0, 32767.0) as i16;
    let q = (sample.im * scale).round().clamp(-32768.0, 32767.0) as i16;
    (i, q)
}
