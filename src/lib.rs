// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust I/Q tools library
//!
//! This library decodes recorded RF I/Q captures and runs offline spectral
//! analysis on them.

pub mod acquisition;
pub mod config;
pub mod report;
pub mod spectral;
pub mod utility;

pub use report::{analyze_record, AnalysisReport};
