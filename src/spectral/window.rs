// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Taper windows
//!
//! All windows are the symmetric variants (first and last coefficient
//! mirror each other), as used for spectral display rather than for
//! filter design.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use super::SpectralError;

/// Available window functions for spectral analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    #[default]
    Rectangular,
    Bartlett,
    Blackman,
    Hamming,
    Hanning,
}

impl WindowFunction {
    pub const ALL: [WindowFunction; 5] = [
        WindowFunction::Rectangular,
        WindowFunction::Bartlett,
        WindowFunction::Blackman,
        WindowFunction::Hamming,
        WindowFunction::Hanning,
    ];

    /// Window coefficients of length `n`.
    ///
    /// `n == 0` gives an empty vector and `n == 1` gives `[1.0]` for every
    /// window.
    pub fn coefficients(&self, n: usize) -> Vec<f64> {
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![1.0];
        }
        let m = (n - 1) as f64;
        (0..n)
            .map(|i| {
                let x = i as f64;
                match self {
                    WindowFunction::Rectangular => 1.0,
                    WindowFunction::Bartlett => 1.0 - (2.0 * x - m).abs() / m,
                    WindowFunction::Blackman => {
                        0.42 - 0.5 * (2.0 * PI * x / m).cos() + 0.08 * (4.0 * PI * x / m).cos()
                    }
                    WindowFunction::Hamming => 0.54 - 0.46 * (2.0 * PI * x / m).cos(),
                    WindowFunction::Hanning => 0.5 - 0.5 * (2.0 * PI * x / m).cos(),
                }
            })
            .collect()
    }
}

impl FromStr for WindowFunction {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rectangular" => Ok(WindowFunction::Rectangular),
            "bartlett" => Ok(WindowFunction::Bartlett),
            "blackman" => Ok(WindowFunction::Blackman),
            "hamming" => Ok(WindowFunction::Hamming),
            "hanning" | "hann" => Ok(WindowFunction::Hanning),
            _ => Err(SpectralError::UnsupportedWindow(s.to_string())),
        }
    }
}

impl fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowFunction::Rectangular => "rectangular",
            WindowFunction::Bartlett => "bartlett",
            WindowFunction::Blackman => "blackman",
            WindowFunction::Hamming => "hamming",
            WindowFunction::Hanning => "hanning",
        };
        f.write_str(name)
    }
}

/// Look a window up by name and build it
pub fn get_window(name: &str, n: usize) -> Result<Vec<f64>, SpectralError> {
    Ok(name.parse::<WindowFunction>()?.coefficients(n))
}

/// Periodic Hann window, the default taper of the Welch density estimate
pub(crate) fn periodic_hann(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rectangular_is_all_ones() {
        assert_eq!(WindowFunction::Rectangular.coefficients(4), vec![1.0; 4]);
    }

    #[test]
    fn test_known_coefficients() {
        let w = WindowFunction::Bartlett.coefficients(5);
        for (a, b) in w.iter().zip([0.0, 0.5, 1.0, 0.5, 0.0]) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }

        let w = WindowFunction::Hanning.coefficients(5);
        for (a, b) in w.iter().zip([0.0, 0.5, 1.0, 0.5, 0.0]) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }

        let w = WindowFunction::Hamming.coefficients(3);
        for (a, b) in w.iter().zip([0.08, 1.0, 0.08]) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }

        let w = WindowFunction::Blackman.coefficients(3);
        assert_abs_diff_eq!(w[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(w[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_windows_are_symmetric() {
        for window in WindowFunction::ALL {
            let w = window.coefficients(64);
            for i in 0..32 {
                assert_abs_diff_eq!(w[i], w[63 - i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_degenerate_lengths() {
        for window in WindowFunction::ALL {
            assert!(window.coefficients(0).is_empty());
            assert_eq!(window.coefficients(1), vec![1.0]);
        }
    }

    #[test]
    fn test_names() {
        for window in WindowFunction::ALL {
            assert_eq!(window.to_string().parse::<WindowFunction>().unwrap(), window);
        }
        assert!(matches!(
            get_window("kaiser", 8),
            Err(SpectralError::UnsupportedWindow(name)) if name == "kaiser"
        ));
    }

    #[test]
    fn test_periodic_hann() {
        let w = periodic_hann(4);
        for (a, b) in w.iter().zip([0.0, 0.5, 1.0, 0.5]) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
    }
}
