// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management
//!
//! The configuration is backed by a YAML file and validated against a JSON
//! schema embedded in the binary.
//!
//! ## Configuration Structure
//!
//! - `acquisition`: which frames of a capture to read, and the sample rate
//!   and center frequency of flat formats
//! - `analysis`: window, spectrogram method and estimator settings
//!
//! ## Usage
//!
//! ```no_run
//! use rust_iqtools::config::Config;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file("iqtools.yaml").unwrap();
//!
//! // Command line overrides
//! config.apply_args(None, Some(20), Some(2048), None, None, Some("welch".parse().unwrap()), Some(5), None);
//!
//! println!("Reading {} frames", config.acquisition.frames);
//! ```

pub mod acquisition;
pub mod analysis;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use acquisition::AcquisitionConfig;
pub use analysis::AnalysisConfig;
pub use utils::output_config_schema;

use crate::acquisition::IqFormat;
use crate::spectral::{SpectrogramMethod, WindowFunction};

/// Root configuration structure.
///
/// Each section uses default values when not explicitly specified in the
/// configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Capture reading settings.
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Spectral engine settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let yaml_value: serde_yml::Value = match serde_yml::from_str(&contents) {
            Ok(value) => value,
            Err(err) => {
                error!("Configuration is not valid YAML: {}", err);
                Self::create_sample_config(path)?;
                return Err(err)
                    .with_context(|| format!("Failed to parse YAML configuration from {:?}", path));
            }
        };

        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema: serde_json::Value = serde_json::from_str(utils::CONFIG_SCHEMA)
            .context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only the values that are provided replace the loaded ones.
    ///
    /// # Parameters
    ///
    /// * `format` - Container format of the input
    /// * `frames` - Number of frames to read
    /// * `frame_length` - Samples per frame
    /// * `start_frame` - First frame to read (zero based)
    /// * `window` - Taper for FFT and Welch estimates
    /// * `method` - Spectrogram estimate
    /// * `average_every` - Spectrogram fold divisor
    /// * `span` - Channel power span in Hz
    #[allow(clippy::too_many_arguments)]
    pub fn apply_args(
        &mut self,
        format: Option<IqFormat>,
        frames: Option<usize>,
        frame_length: Option<usize>,
        start_frame: Option<usize>,
        window: Option<WindowFunction>,
        method: Option<SpectrogramMethod>,
        average_every: Option<usize>,
        span: Option<f64>,
    ) {
        if let Some(format) = format {
            debug!("Overriding format from command line: {}", format);
            self.acquisition.format = Some(format);
        }
        if let Some(frames) = frames {
            debug!("Overriding frames from command line: {}", frames);
            self.acquisition.frames = frames;
        }
        if let Some(frame_length) = frame_length {
            debug!("Overriding frame length from command line: {}", frame_length);
            self.acquisition.frame_length = frame_length;
        }
        if let Some(start_frame) = start_frame {
            debug!("Overriding start frame from command line: {}", start_frame);
            self.acquisition.start_frame = start_frame;
        }
        if let Some(window) = window {
            debug!("Overriding window from command line: {}", window);
            self.analysis.window = window;
        }
        if let Some(method) = method {
            debug!("Overriding spectrogram method from command line: {}", method);
            self.analysis.method = method;
        }
        if let Some(every) = average_every {
            debug!("Overriding fold divisor from command line: {}", every);
            self.analysis.average_every = Some(every);
        }
        if let Some(span) = span {
            debug!("Overriding channel span from command line: {}", span);
            self.analysis.span = Some(span);
        }
    }

    /// Re-run the rule checks, for use after [`Config::apply_args`]
    pub fn validate(&self) -> Result<()> {
        utils::validate_specific_rules(self)
    }
}
