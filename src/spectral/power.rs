// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Channel power and frequency/time helpers

use super::peaks::check_pair;
use super::SpectralError;

/// Equivalent noise bandwidth of FFT analyzers relative to their RBW
pub const ENBW_FACTOR: f64 = 1.056;

/// Total power in a channel, Watt.
///
/// Sums `p` over `|f| <= span / 2` (the whole slice when `span` is `None`
/// or zero) and divides by the equivalent noise bandwidth
/// `rbw × 1.056`.
pub fn channel_power(f: &[f64], p: &[f64], rbw: f64, span: Option<f64>) -> Result<f64, SpectralError> {
    if f.len() != p.len() {
        return Err(SpectralError::ShapeMismatch {
            expected: f.len(),
            actual: p.len(),
        });
    }
    if !(rbw.is_finite() && rbw > 0.0) {
        return Err(SpectralError::InvalidParameter(format!(
            "resolution bandwidth must be positive, got {}",
            rbw
        )));
    }
    let total: f64 = match span.filter(|s| *s != 0.0) {
        Some(span) => f
            .iter()
            .zip(p)
            .filter(|(freq, _)| freq.abs() <= span / 2.0)
            .map(|(_, power)| power)
            .sum(),
        None => p.iter().sum(),
    };
    Ok(total / (rbw * ENBW_FACTOR))
}

/// Keep the bins strictly inside `(center - span/2, center + span/2)`
pub fn zoom_in_freq(
    f: &[f64],
    p: &[f64],
    center: f64,
    span: f64,
) -> Result<(Vec<f64>, Vec<f64>), SpectralError> {
    check_pair(f, p)?;
    let low = center - span / 2.0;
    let high = center + span / 2.0;
    Ok(f
        .iter()
        .zip(p)
        .filter(|(freq, _)| **freq > low && **freq < high)
        .map(|(freq, power)| (*freq, *power))
        .unzip())
}

/// Two views of `x` offset by `val` samples: `(x[..n - val], x[val..])`
pub fn shift_cut_data_time<T>(x: &[T], val: usize) -> Result<(&[T], &[T]), SpectralError> {
    if val > x.len() {
        return Err(SpectralError::InvalidParameter(format!(
            "cannot shift {} samples by {}",
            x.len(),
            val
        )));
    }
    Ok((&x[..x.len() - val], &x[val..]))
}

/// Baseband axis to absolute frequencies
pub fn shift_to_center_frequency(f: &[f64], center: f64) -> Vec<f64> {
    f.iter().map(|v| center + v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_channel_power_reference_cases() {
        let f = vec![-2.0, -1.0, 0.0, 1.0, 2.0];
        assert_eq!(channel_power(&f, &[0.0; 5], 100.0, None).unwrap(), 0.0);

        let p = vec![0.0, 0.0, 1.0, 0.0, 0.0];
        assert_relative_eq!(
            channel_power(&f, &p, 100.0, None).unwrap(),
            1.0 / (100.0 * 1.056)
        );
    }

    #[test]
    fn test_channel_power_span_mask() {
        let f = vec![-2.0, -1.0, 0.0, 1.0, 2.0];
        let p = vec![1.0; 5];
        // |f| <= 1 keeps three bins, edges included
        assert_relative_eq!(channel_power(&f, &p, 1.0, Some(2.0)).unwrap(), 3.0 / 1.056);
        // zero span means no mask
        assert_relative_eq!(channel_power(&f, &p, 1.0, Some(0.0)).unwrap(), 5.0 / 1.056);
        assert!(channel_power(&f, &p, 0.0, None).is_err());
    }

    #[test]
    fn test_zoom_is_strict() {
        let f = vec![-2.0, -1.0, 0.0, 1.0, 2.0];
        let p = vec![5.0, 4.0, 3.0, 2.0, 1.0];
        let (zf, zp) = zoom_in_freq(&f, &p, 0.0, 2.0).unwrap();
        assert_eq!(zf, vec![0.0]);
        assert_eq!(zp, vec![3.0]);

        let (zf, _) = zoom_in_freq(&f, &p, 1.0, 3.0).unwrap();
        assert_eq!(zf, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_shift_cut() {
        let x = [1, 2, 3, 4, 5];
        let (a, b) = shift_cut_data_time(&x, 2).unwrap();
        assert_eq!(a, &[1, 2, 3]);
        assert_eq!(b, &[3, 4, 5]);
        assert!(shift_cut_data_time(&x, 6).is_err());
    }

    #[test]
    fn test_shift_to_center() {
        assert_eq!(shift_to_center_frequency(&[-1.0, 0.0, 1.0], 1e6), vec![999999.0, 1e6, 1000001.0]);
    }
}
