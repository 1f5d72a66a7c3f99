// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_iqtools::acquisition::IqFormat;
use rust_iqtools::config::Config;
use rust_iqtools::spectral::{SpectrogramMethod, WindowFunction};
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

#[test]
fn test_config_type_error_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Valid YAML, wrong types
    let invalid_yaml = r#"
acquisition:
  frames: "ten"
  frame_length: -4
analysis:
  window: 12
"#;
    fs::write(&config_path, invalid_yaml)?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        Path::new(&sample_path).exists(),
        "Sample config file was not created"
    );

    // The sample file holds the defaults and loads cleanly
    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config.acquisition.frames, 10);
    assert_eq!(sample_config.acquisition.frame_length, 1024);
    assert_eq!(sample_config.analysis.window, WindowFunction::Rectangular);

    Ok(())
}

#[test]
fn test_unknown_window_is_rejected_by_schema() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(&config_path, "analysis:\n  window: kaiser\n")?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("validation failed"), "{}", err);
    assert!(config_path.with_extension("sample.yaml").exists());

    Ok(())
}

#[test]
fn test_unknown_section_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(&config_path, "visualization:\n  port: 8080\n")?;
    assert!(Config::from_file(&config_path).is_err());

    Ok(())
}

#[test]
fn test_specific_rule_error_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Passes the schema but folds more frames than are read
    let config = r#"
acquisition:
  frames: 4
analysis:
  average_every: 8
"#;
    fs::write(&config_path, config)?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("average_every"), "{}", err);
    assert!(config_path.with_extension("sample.yaml").exists());

    Ok(())
}

#[test]
fn test_gnuradio_requires_sample_rate() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    fs::write(&config_path, "acquisition:\n  format: gnuradio\n")?;
    assert!(Config::from_file(&config_path).is_err());

    fs::write(
        &config_path,
        "acquisition:\n  format: gnuradio\n  sample_rate: 2000000.0\n  center_frequency: 4.5e8\n",
    )?;
    let config = Config::from_file(&config_path)?;
    assert_eq!(config.acquisition.format, Some(IqFormat::Gnuradio));
    assert_eq!(config.acquisition.flat_params().sample_rate_hz, 2e6);

    Ok(())
}

#[test]
fn test_save_and_reload() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("roundtrip.yaml");

    let mut config = Config::default();
    config.analysis.method = SpectrogramMethod::Multitaper;
    config.analysis.span = Some(250e3);
    config.acquisition.start_frame = 3;
    config.save_to_file(&config_path)?;

    assert_eq!(Config::from_file(&config_path)?, config);
    Ok(())
}
