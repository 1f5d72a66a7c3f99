// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::Config;
use crate::acquisition::IqFormat;

/// Embedded JSON schema of the configuration file
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_iqtools --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validates the configuration against rules the JSON schema can't express.
///
/// # Validation Rules
///
/// - **Framing**: `frames` and `frame_length` are positive
/// - **Flat formats**: a GNU Radio input needs a positive sample rate
/// - **Folding**: `average_every` does not exceed the number of frames
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let acquisition = &config.acquisition;
    if acquisition.frame_length == 0 {
        anyhow::bail!("frame_length must be greater than zero");
    }
    if acquisition.frames == 0 {
        anyhow::bail!("frames must be greater than zero");
    }

    if acquisition.format == Some(IqFormat::Gnuradio) {
        match acquisition.sample_rate {
            Some(rate) if rate > 0.0 => {}
            _ => anyhow::bail!("gnuradio input requires a positive sample_rate"),
        }
    }

    if let Some(every) = config.analysis.average_every {
        if every == 0 || every > acquisition.frames {
            anyhow::bail!(
                "average_every ({}) must be between 1 and frames ({})",
                every,
                acquisition.frames
            );
        }
    }

    Ok(())
}
