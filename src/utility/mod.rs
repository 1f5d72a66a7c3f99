// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Utility module for common utilities used throughout the project

pub mod noise_generator;
pub mod units;

// Re-exports for use in other modules
pub use noise_generator::IqNoiseGenerator;
pub use units::{dbm_to_watt, get_dbm, get_dbm_in_place, get_watt, watt_to_dbm, WATT_FLOOR};
