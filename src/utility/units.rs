// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Power unit conversions
//!
//! Conversions between Watt and dBm. Logarithmic conversion of a value that
//! is zero or negative is undefined, so those values are first replaced by
//! [`WATT_FLOOR`]. After conversion they all read as the same floor level
//! (-270 dBm) and cannot be told apart from each other.

use log::trace;

/// Replacement value for non-positive powers before taking the logarithm
pub const WATT_FLOOR: f64 = 1e-30;

/// Convert a single power value from Watt to dBm
///
/// Values `<= 0` are clamped to [`WATT_FLOOR`].
///
/// # Example
///
/// ```
/// use rust_iqtools::utility::units::watt_to_dbm;
///
/// assert!((watt_to_dbm(1e-3) - 0.0).abs() < 1e-12);
/// assert!((watt_to_dbm(1.0) - 30.0).abs() < 1e-12);
/// ```
pub fn watt_to_dbm(watt: f64) -> f64 {
    let watt = if watt <= 0.0 { WATT_FLOOR } else { watt };
    10.0 * (watt * 1000.0).log10()
}

/// Convert a single power value from dBm to Watt
pub fn dbm_to_watt(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0) / 1000.0
}

/// Clamp every non-positive entry of `watt` to [`WATT_FLOOR`] **in place**
/// and return the dBm values.
///
/// The caller's buffer is modified: zero and negative powers are replaced by
/// the floor value and stay that way after the call. Use [`get_dbm`] when the
/// input must be left untouched.
pub fn get_dbm_in_place(watt: &mut [f64]) -> Vec<f64> {
    let mut clamped = 0usize;
    for w in watt.iter_mut() {
        if *w <= 0.0 {
            *w = WATT_FLOOR;
            clamped += 1;
        }
    }
    if clamped > 0 {
        trace!("Clamped {} non-positive power values to {:e} W", clamped, WATT_FLOOR);
    }
    watt.iter().map(|&w| 10.0 * (w * 1000.0).log10()).collect()
}

/// Convert a slice of Watt values to dBm, clamping a copy of the input
pub fn get_dbm(watt: &[f64]) -> Vec<f64> {
    let mut copy = watt.to_vec();
    get_dbm_in_place(&mut copy)
}

/// Convert a slice of dBm values to Watt
pub fn get_watt(dbm: &[f64]) -> Vec<f64> {
    dbm.iter().map(|&d| dbm_to_watt(d)).collect()
}
