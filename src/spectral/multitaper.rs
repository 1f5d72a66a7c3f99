// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Discrete prolate spheroidal sequences and the multitaper estimate
//!
//! The Slepian tapers are the eigenvectors belonging to the largest
//! eigenvalues of the symmetric tridiagonal matrix
//!
//! ```text
//! d[i]   = ((M - 1 - 2i) / 2)² · cos(2πW)        W = NW / M
//! e[i]   = i · (M - i) / 2                       i = 1..M-1
//! ```
//!
//! Eigenvalues are isolated by Sturm sequence bisection and the vectors
//! recovered by inverse iteration, which costs O(M) per taper.

use log::debug;
use rustfft::num_complex::{Complex32, Complex64};
use rustfft::FftPlanner;

use super::fft::fftshift;
use super::SpectralError;

/// Time-bandwidth product used for spectrograms
pub const DEFAULT_NW: f64 = 4.0;
/// Number of tapers used for spectrograms
pub const DEFAULT_TAPERS: usize = 6;

const INVERSE_ITERATIONS: usize = 4;

/// Number of eigenvalues of the tridiagonal matrix strictly below `x`
fn sturm_count(diag: &[f64], off: &[f64], x: f64) -> usize {
    let tiny = f64::MIN_POSITIVE.sqrt();
    let mut count = 0;
    let mut q = diag[0] - x;
    if q < 0.0 {
        count += 1;
    }
    for i in 1..diag.len() {
        if q == 0.0 {
            q = tiny;
        }
        q = diag[i] - x - off[i - 1] * off[i - 1] / q;
        if q < 0.0 {
            count += 1;
        }
    }
    count
}

/// `index`-th smallest eigenvalue (zero based) by bisection
fn bisect_eigenvalue(diag: &[f64], off: &[f64], index: usize) -> f64 {
    let n = diag.len();
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for i in 0..n {
        let radius = if i > 0 { off[i - 1].abs() } else { 0.0 }
            + if i + 1 < n { off[i].abs() } else { 0.0 };
        lo = lo.min(diag[i] - radius);
        hi = hi.max(diag[i] + radius);
    }

    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        if sturm_count(diag, off, mid) > index {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Solve `(T - shift·I) x = b` in place with partial pivoting
fn solve_shifted(diag: &[f64], off: &[f64], shift: f64, b: &mut [f64]) {
    let n = diag.len();
    let scale = diag
        .iter()
        .chain(off.iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()))
        .max(1.0);
    let guard = f64::EPSILON * scale;

    let mut d: Vec<f64> = diag.iter().map(|v| v - shift).collect();
    let mut dl: Vec<f64> = off.to_vec();
    let mut du: Vec<f64> = off.to_vec();
    let mut du2 = vec![0.0; n.saturating_sub(2)];
    let mut swapped = vec![false; n.saturating_sub(1)];

    for i in 0..n.saturating_sub(1) {
        if d[i].abs() >= dl[i].abs() {
            if d[i] == 0.0 {
                d[i] = guard;
            }
            let fact = dl[i] / d[i];
            dl[i] = fact;
            d[i + 1] -= fact * du[i];
        } else {
            let fact = d[i] / dl[i];
            d[i] = dl[i];
            dl[i] = fact;
            let upper = du[i];
            du[i] = d[i + 1];
            d[i + 1] = upper - fact * d[i + 1];
            if i + 2 < n {
                du2[i] = du[i + 1];
                du[i + 1] = -fact * du[i + 1];
            }
            swapped[i] = true;
        }
    }
    if d[n - 1] == 0.0 {
        d[n - 1] = guard;
    }

    for i in 0..n.saturating_sub(1) {
        if swapped[i] {
            let top = b[i];
            b[i] = b[i + 1];
            b[i + 1] = top - dl[i] * b[i];
        } else {
            b[i + 1] -= dl[i] * b[i];
        }
    }

    b[n - 1] /= d[n - 1];
    if n > 1 {
        b[n - 2] = (b[n - 2] - du[n - 2] * b[n - 1]) / d[n - 2];
    }
    for i in (0..n.saturating_sub(2)).rev() {
        b[i] = (b[i] - du[i] * b[i + 1] - du2[i] * b[i + 2]) / d[i];
    }
}

fn normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Discrete prolate spheroidal (Slepian) sequences.
///
/// Returns `kmax` tapers of length `m`, ordered by decreasing concentration
/// and normalized to unit energy. Symmetric tapers have a positive sum and
/// antisymmetric tapers start with a positive lobe.
pub fn dpss(m: usize, nw: f64, kmax: usize) -> Result<Vec<Vec<f64>>, SpectralError> {
    if m == 0 || kmax == 0 || kmax > m {
        return Err(SpectralError::InvalidParameter(format!(
            "cannot build {} tapers of length {}",
            kmax, m
        )));
    }
    if !(nw > 0.0 && nw < m as f64 / 2.0) {
        return Err(SpectralError::InvalidParameter(format!(
            "time-bandwidth product {} is out of range for length {}",
            nw, m
        )));
    }
    if m == 1 {
        return Ok(vec![vec![1.0]]);
    }

    let w = nw / m as f64;
    let mf = m as f64;
    let cos_w = (2.0 * std::f64::consts::PI * w).cos();
    let diag: Vec<f64> = (0..m)
        .map(|i| ((mf - 1.0 - 2.0 * i as f64) / 2.0).powi(2) * cos_w)
        .collect();
    let off: Vec<f64> = (1..m)
        .map(|i| i as f64 * (mf - i as f64) / 2.0)
        .collect();

    let mut tapers: Vec<Vec<f64>> = Vec::with_capacity(kmax);
    for k in 0..kmax {
        let lambda = bisect_eigenvalue(&diag, &off, m - 1 - k);

        // deterministic start vector with components along every eigenvector
        let mut v: Vec<f64> = (0..m)
            .map(|i| 1.0 + 0.5 * ((i as f64 * 0.618_033_988_75 + 0.1).fract() - 0.5))
            .collect();
        for _ in 0..INVERSE_ITERATIONS {
            solve_shifted(&diag, &off, lambda, &mut v);
            for prev in &tapers {
                let dot: f64 = prev.iter().zip(&v).map(|(a, b)| a * b).sum();
                v.iter_mut().zip(prev).for_each(|(x, p)| *x -= dot * p);
            }
            normalize(&mut v);
        }

        if k % 2 == 0 {
            if v.iter().sum::<f64>() < 0.0 {
                v.iter_mut().for_each(|x| *x = -*x);
            }
        } else {
            let thresh = (1e-7f64).max(1.0 / mf);
            if let Some(first) = v.iter().find(|x| *x * *x > thresh) {
                if *first < 0.0 {
                    v.iter_mut().for_each(|x| *x = -*x);
                }
            }
        }
        tapers.push(v);
    }

    debug!("Built {} DPSS tapers of length {} (NW = {})", kmax, m, nw);
    Ok(tapers)
}

/// Multitaper power spectral density estimator.
///
/// The eigenspectra `|FFT(x · v_k)|²` are averaged with equal weights and
/// divided by the sample rate. Output is centered.
#[derive(Debug, Clone)]
pub struct Multitaper {
    tapers: Vec<Vec<f64>>,
}

impl Multitaper {
    pub fn new(length: usize, nw: f64, tapers: usize) -> Result<Self, SpectralError> {
        Ok(Self {
            tapers: dpss(length, nw, tapers)?,
        })
    }

    /// Estimator with the spectrogram defaults (NW = 4, 6 tapers)
    pub fn with_defaults(length: usize) -> Result<Self, SpectralError> {
        Self::new(length, DEFAULT_NW, DEFAULT_TAPERS)
    }

    pub fn len(&self) -> usize {
        self.tapers.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tapers(&self) -> &[Vec<f64>] {
        &self.tapers
    }

    pub fn estimate(
        &self,
        planner: &mut FftPlanner<f64>,
        frame: &[Complex32],
        sample_rate: f64,
    ) -> Result<Vec<f64>, SpectralError> {
        let n = self.len();
        if frame.len() != n {
            return Err(SpectralError::ShapeMismatch {
                expected: n,
                actual: frame.len(),
            });
        }
        let fft = planner.plan_fft_forward(n);
        let mut psd = vec![0.0; n];
        let mut buf = vec![Complex64::new(0.0, 0.0); n];
        for taper in &self.tapers {
            for ((dst, x), w) in buf.iter_mut().zip(frame).zip(taper) {
                *dst = Complex64::new(x.re as f64 * w, x.im as f64 * w);
            }
            fft.process(&mut buf);
            for (acc, v) in psd.iter_mut().zip(&buf) {
                *acc += v.norm_sqr();
            }
        }
        let scale = 1.0 / (self.tapers.len() as f64 * sample_rate);
        psd.iter_mut().for_each(|p| *p *= scale);
        fftshift(&mut psd);
        Ok(psd)
    }
}
