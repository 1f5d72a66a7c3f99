// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Peak and bandwidth estimators
//!
//! All estimators take one frequency slice `(f, p)` with `p` in Watt. They
//! never modify `p`: the dBm conversion works on a clamped copy.

use log::{debug, trace};
use serde::Serialize;

use super::SpectralError;
use crate::utility::units::get_dbm;

pub(crate) fn check_pair(f: &[f64], p: &[f64]) -> Result<(), SpectralError> {
    if f.len() != p.len() {
        return Err(SpectralError::ShapeMismatch {
            expected: f.len(),
            actual: p.len(),
        });
    }
    if p.is_empty() {
        return Err(SpectralError::EmptyInput);
    }
    Ok(())
}

/// Index of the first maximum
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Result of [`get_fwhm`].
///
/// A crossing that was not found before the array boundary is reported as
/// index 0 with frequency and power 0. Index 0 therefore means "not found",
/// never a crossing at the first bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fwhm {
    /// Upper minus lower crossing frequency
    pub fwhm: f64,
    /// Peak level in dBm
    pub peak_dbm: f64,
    /// Lower and upper crossing indices
    pub indices: [usize; 2],
    /// Lower and upper crossing frequencies
    pub freqs: [f64; 2],
    /// Lower and upper crossing powers, Watt
    pub powers: [f64; 2],
}

/// Full width at half maximum (-3 dB).
///
/// From the global peak, walk outward in both directions to the first bin
/// at or below `peak - 3 dB`. With `skip`, bins closer than `skip` to the
/// peak are ignored on both sides, which steps over dips at the top of
/// split peaks.
pub fn get_fwhm(f: &[f64], p: &[f64], skip: Option<usize>) -> Result<Fwhm, SpectralError> {
    check_pair(f, p)?;
    let p_dbm = get_dbm(p);
    let peak_index = argmax(&p_dbm);
    let peak_dbm = p_dbm[peak_index];
    let threshold = peak_dbm - 3.0;

    let upper = (peak_index..p_dbm.len())
        .filter(|&i| skip.map_or(true, |s| i - peak_index >= s))
        .find(|&i| p_dbm[i] <= threshold);
    let lower = (0..=peak_index)
        .rev()
        .filter(|&i| skip.map_or(true, |s| peak_index - i >= s))
        .find(|&i| p_dbm[i] <= threshold);

    let crossing = |found: Option<usize>| match found {
        Some(i) => (i, f[i], p[i]),
        None => (0, 0.0, 0.0),
    };
    let (index_m, f_m, p_m) = crossing(lower);
    let (index_p, f_p, p_p) = crossing(upper);
    trace!(
        "FWHM: peak {:.2} dBm at bin {}, crossings {:?} / {:?}",
        peak_dbm,
        peak_index,
        lower,
        upper
    );

    Ok(Fwhm {
        fwhm: f_p - f_m,
        peak_dbm,
        indices: [index_m, index_p],
        freqs: [f_m, f_p],
        powers: [p_m, p_p],
    })
}

/// Result of [`get_sigma_estimate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SigmaEstimate {
    pub peak_index: usize,
    /// `upper_index - lower_index`, in bins
    pub width: i64,
    pub lower_index: usize,
    pub upper_index: usize,
}

/// Half-maximum width restricted to the middle half of the slice.
///
/// Scans from the upper edge of the window downward and from the lower edge
/// upward for the first bin at or above half the peak power. Indices stay 0
/// when no such bin exists.
pub fn get_sigma_estimate(f: &[f64], p: &[f64]) -> Result<SigmaEstimate, SpectralError> {
    check_pair(f, p)?;
    let n = p.len() as f64;
    let peak_index = argmax(p);
    let half = p[peak_index] / 2.0;
    let rng_max = (n - n / 4.0) as usize;
    let rng_min = (n - 3.0 * n / 4.0) as usize;

    let upper_index = ((rng_min + 1)..=rng_max)
        .rev()
        .find(|&i| p[i] >= half)
        .unwrap_or(0);
    let lower_index = (rng_min..rng_max).find(|&i| p[i] >= half).unwrap_or(0);

    Ok(SigmaEstimate {
        peak_index,
        width: upper_index as i64 - lower_index as i64,
        lower_index,
        upper_index,
    })
}

/// Ricker ("Mexican hat") wavelet of `points` samples and width `a`
pub fn ricker(points: usize, a: f64) -> Vec<f64> {
    let amplitude = 2.0 / ((3.0 * a).sqrt() * std::f64::consts::PI.powf(0.25));
    let wsq = a * a;
    let center = (points as f64 - 1.0) / 2.0;
    (0..points)
        .map(|i| {
            let x = i as f64 - center;
            let xsq = x * x;
            amplitude * (1.0 - xsq / wsq) * (-xsq / (2.0 * wsq)).exp()
        })
        .collect()
}

/// Continuous wavelet transform with Ricker wavelets, one row per width
pub fn cwt(data: &[f64], widths: &[f64]) -> Vec<Vec<f64>> {
    let n = data.len();
    widths
        .iter()
        .map(|&width| {
            let points = ((10.0 * width) as usize).min(n);
            let wavelet = ricker(points, width);
            let offset = points.saturating_sub(1) / 2;
            (0..n)
                .map(|i| {
                    // "same" sized convolution
                    let k = i + offset;
                    let lo = (k + 1).saturating_sub(points);
                    let hi = k.min(n - 1);
                    (lo..=hi).map(|j| data[j] * wavelet[k - j]).sum()
                })
                .collect()
        })
        .collect()
}

/// Strict local maxima along a row, edges excluded
fn relative_maxima(row: &[f64]) -> Vec<usize> {
    (1..row.len().saturating_sub(1))
        .filter(|&i| row[i] > row[i - 1] && row[i] > row[i + 1])
        .collect()
}

struct RidgeLine {
    rows: Vec<usize>,
    cols: Vec<usize>,
    gap: usize,
}

/// Chain relative maxima of neighbouring CWT rows into ridge lines,
/// starting from the largest width
fn identify_ridge_lines(
    matrix: &[Vec<f64>],
    max_distances: &[f64],
    gap_thresh: usize,
) -> Vec<RidgeLine> {
    let maxima: Vec<Vec<usize>> = matrix.iter().map(|row| relative_maxima(row)).collect();
    let Some(start_row) = maxima.iter().rposition(|m| !m.is_empty()) else {
        return Vec::new();
    };

    let mut ridge_lines: Vec<RidgeLine> = maxima[start_row]
        .iter()
        .map(|&col| RidgeLine {
            rows: vec![start_row],
            cols: vec![col],
            gap: 0,
        })
        .collect();
    let mut final_lines = Vec::new();

    for row in (0..start_row).rev() {
        for line in ridge_lines.iter_mut() {
            line.gap += 1;
        }

        let previous_cols: Vec<usize> = ridge_lines
            .iter()
            .filter_map(|line| line.cols.last().copied())
            .collect();
        for &col in &maxima[row] {
            let closest = previous_cols
                .iter()
                .enumerate()
                .map(|(i, &c)| (i, col.abs_diff(c)))
                .min_by_key(|&(_, d)| d);
            match closest {
                Some((i, d)) if d as f64 <= max_distances[row] => {
                    let line = &mut ridge_lines[i];
                    line.rows.push(row);
                    line.cols.push(col);
                    line.gap = 0;
                }
                _ => ridge_lines.push(RidgeLine {
                    rows: vec![row],
                    cols: vec![col],
                    gap: 0,
                }),
            }
        }

        for i in (0..ridge_lines.len()).rev() {
            if ridge_lines[i].gap > gap_thresh {
                final_lines.push(ridge_lines.remove(i));
            }
        }
    }

    final_lines.extend(ridge_lines);
    final_lines
}

/// Linear interpolation percentile of an unsorted slice
fn percentile(values: &[f64], per: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let idx = per / 100.0 * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let frac = idx - lo as f64;
    if lo + 1 < sorted.len() {
        sorted[lo] + (sorted[lo + 1] - sorted[lo]) * frac
    } else {
        sorted[lo]
    }
}

/// Wavelet based peak finder.
///
/// The vector is transformed with Ricker wavelets of the given widths;
/// relative maxima are chained across widths into ridge lines, and a
/// ridge line is a peak when it spans at least a quarter of the widths
/// and its smallest-width coefficient stands at least 1× above the 10th
/// percentile noise floor around it. Returns sorted peak indices.
pub fn find_peaks_cwt(vector: &[f64], widths: &[f64]) -> Vec<usize> {
    if vector.is_empty() || widths.is_empty() {
        return Vec::new();
    }
    let gap_thresh = widths[0].ceil() as usize;
    let max_distances: Vec<f64> = widths.iter().map(|w| w / 4.0).collect();
    let matrix = cwt(vector, widths);
    let ridge_lines = identify_ridge_lines(&matrix, &max_distances, gap_thresh);

    let num_points = vector.len();
    let min_length = (matrix.len() as f64 / 4.0).ceil() as usize;
    let window_size = (num_points as f64 / 20.0).ceil() as usize;
    let (hf_window, odd) = (window_size / 2, window_size % 2);
    let row_one = &matrix[0];
    let noises: Vec<f64> = (0..num_points)
        .map(|i| {
            let start = i.saturating_sub(hf_window);
            let end = (i + hf_window + odd).min(num_points);
            if start < end {
                percentile(&row_one[start..end], 10.0)
            } else {
                f64::NAN
            }
        })
        .collect();

    let mut peaks: Vec<usize> = ridge_lines
        .iter()
        .filter(|line| line.rows.len() >= min_length)
        .filter_map(|line| {
            // the point at the smallest width is the last one appended
            let (row, col) = (*line.rows.last()?, *line.cols.last()?);
            let snr = (matrix[row][col] / noises[col]).abs();
            // a NaN ratio does not reject the line
            if snr < 1.0 {
                None
            } else {
                Some(col)
            }
        })
        .collect();
    peaks.sort_unstable();
    peaks
}

/// Narrow peaks located by [`find_peaks_cwt`] on the dBm spectrum with
/// widths `1..accuracy`. Returns the frequencies and Watt powers at the
/// detected bins.
pub fn get_narrow_peaks_dbm(
    f: &[f64],
    p: &[f64],
    accuracy: usize,
) -> Result<(Vec<f64>, Vec<f64>), SpectralError> {
    check_pair(f, p)?;
    if accuracy < 2 {
        return Err(SpectralError::InvalidParameter(format!(
            "peak accuracy must be at least 2, got {}",
            accuracy
        )));
    }
    let p_dbm = get_dbm(p);
    let widths: Vec<f64> = (1..accuracy).map(|w| w as f64).collect();
    let indices = find_peaks_cwt(&p_dbm, &widths);
    debug!("Found {} narrow peaks", indices.len());
    Ok((
        indices.iter().map(|&i| f[i]).collect(),
        indices.iter().map(|&i| p[i]).collect(),
    ))
}

/// Global maximum, returned as one element vectors to mirror
/// [`get_narrow_peaks_dbm`]
pub fn get_broad_peak_dbm(f: &[f64], p: &[f64]) -> Result<(Vec<f64>, Vec<f64>), SpectralError> {
    check_pair(f, p)?;
    let i = argmax(p);
    Ok((vec![f[i]], vec![p[i]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gaussian(n: usize, df: f64, sigma: f64, peak: f64) -> (Vec<f64>, Vec<f64>) {
        let center = (n / 2) as f64;
        let f: Vec<f64> = (0..n).map(|i| (i as f64 - center) * df).collect();
        let p = f
            .iter()
            .map(|x| peak * (-(x * x) / (2.0 * sigma * sigma)).exp())
            .collect();
        (f, p)
    }

    #[test]
    fn test_fwhm_of_gaussian() {
        let df = 10.0;
        let sigma = 300.0;
        let (f, p) = gaussian(201, df, sigma, 1e-3);
        let half_width = sigma * (2.0 * 0.3 * std::f64::consts::LN_10).sqrt();

        let result = get_fwhm(&f, &p, None).unwrap();
        assert_abs_diff_eq!(result.peak_dbm, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.fwhm / 2.0, half_width, epsilon = df);
        assert_abs_diff_eq!(result.freqs[0], -result.freqs[1], epsilon = 1e-9);
        assert_eq!(result.indices[0] + result.indices[1], 200);
        assert!(result.powers[1] <= 1e-3 / 10f64.powf(0.3));
    }

    #[test]
    fn test_fwhm_missing_crossing_defaults_to_zero() {
        // monotonically increasing: no upper crossing
        let f: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let p: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let result = get_fwhm(&f, &p, None).unwrap();
        assert_eq!(result.indices[1], 0);
        assert_eq!(result.freqs[1], 0.0);
        assert_eq!(result.powers[1], 0.0);
        // lower crossing: first bin at or below -3 dB is index 4 (p = 5)
        assert_eq!(result.indices[0], 4);
    }

    #[test]
    fn test_fwhm_skip_steps_over_dip() {
        // first maximum at 4, a dip at 6 and the real shoulder further out
        let p = vec![0.01, 0.01, 0.2, 0.9, 1.0, 1.0, 0.3, 0.9, 0.8, 0.2, 0.01, 0.01];
        let f: Vec<f64> = (0..p.len()).map(|i| i as f64).collect();
        let plain = get_fwhm(&f, &p, None).unwrap();
        assert_eq!(plain.indices[1], 6);

        let skipped = get_fwhm(&f, &p, Some(3)).unwrap();
        assert_eq!(skipped.indices, [1, 9]);
    }

    #[test]
    fn test_fwhm_skip_is_measured_from_the_peak() {
        // peak in the middle, a one-bin dip right above it
        let mut p = vec![0.01; 100];
        for v in &mut p[45..=55] {
            *v = 0.9;
        }
        p[50] = 1.0;
        p[51] = 0.1;
        let f: Vec<f64> = (0..p.len()).map(|i| i as f64).collect();

        assert_eq!(get_fwhm(&f, &p, None).unwrap().indices, [44, 51]);

        let skipped = get_fwhm(&f, &p, Some(3)).unwrap();
        assert_eq!(skipped.indices, [44, 56]);
        assert_eq!(skipped.fwhm, 12.0);
    }

    #[test]
    fn test_fwhm_leaves_input_untouched() {
        let f = vec![0.0, 1.0, 2.0];
        let p = vec![0.0, 1.0, -1.0];
        get_fwhm(&f, &p, None).unwrap();
        assert_eq!(p, vec![0.0, 1.0, -1.0]);
    }

    #[test]
    fn test_sigma_estimate() {
        let (f, p) = gaussian(200, 1.0, 10.0, 1.0);
        let estimate = get_sigma_estimate(&f, &p).unwrap();
        assert_eq!(estimate.peak_index, 100);
        // half maximum at |x| <= 11.77
        assert_eq!(estimate.lower_index, 89);
        assert_eq!(estimate.upper_index, 111);
        assert_eq!(estimate.width, 22);
    }

    #[test]
    fn test_sigma_estimate_window_bounds() {
        // peak outside the middle half: no bin in the window reaches half of it
        let mut p = vec![0.1; 40];
        p[2] = 10.0;
        let f: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let estimate = get_sigma_estimate(&f, &p).unwrap();
        assert_eq!((estimate.lower_index, estimate.upper_index), (0, 0));
    }

    #[test]
    fn test_ricker_shape() {
        let w = ricker(11, 1.0);
        assert_abs_diff_eq!(w[5], 2.0 / (3f64.sqrt() * std::f64::consts::PI.powf(0.25)), epsilon = 1e-12);
        assert_abs_diff_eq!(w[4], w[6], epsilon = 1e-15);
        assert_abs_diff_eq!(w[4], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_narrow_peaks_on_two_lines() {
        // 0 dBm floor with two 60 dB lines, slightly asymmetric shoulders
        let n = 512;
        let f: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let mut p = vec![1e-3; n];
        for center in [128usize, 384] {
            p[center - 1] = 2e2;
            p[center] = 1e3;
            p[center + 1] = 5e1;
        }
        let (pf, pp) = get_narrow_peaks_dbm(&f, &p, 30).unwrap();
        assert!(pf.iter().any(|x| (x - 128.0).abs() <= 2.0), "{pf:?}");
        assert!(pf.iter().any(|x| (x - 384.0).abs() <= 2.0), "{pf:?}");
        assert_eq!(pf.len(), pp.len());
        assert!(get_narrow_peaks_dbm(&f, &p, 1).is_err());
    }

    #[test]
    fn test_broad_peak() {
        let f = vec![-1.0, 0.0, 1.0];
        let p = vec![0.2, 0.7, 0.1];
        assert_eq!(get_broad_peak_dbm(&f, &p).unwrap(), (vec![0.0], vec![0.7]));
        assert!(matches!(
            get_broad_peak_dbm(&f, &p[..2]),
            Err(SpectralError::ShapeMismatch { .. })
        ));
    }
}
