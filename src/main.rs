// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the I/Q capture analyzer
use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::path::PathBuf;

use rust_iqtools::acquisition::{create_decoder, DecodeError, IqFormat};
use rust_iqtools::config::{output_config_schema, Config};
use rust_iqtools::spectral::{SpectrogramMethod, WindowFunction};
use rust_iqtools::analyze_record;

/// Offline spectral analysis of recorded I/Q captures
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input capture file (.iqt or raw complex64)
    #[arg(short, long, required_unless_present = "show_config_schema")]
    input: Option<PathBuf>,

    /// Container format, guessed from the extension when omitted
    #[arg(short, long)]
    format: Option<IqFormat>,

    /// Configuration file (YAML)
    #[arg(short, long, default_value = "iqtools.yaml")]
    config: PathBuf,

    /// Number of frames to read
    #[arg(long)]
    frames: Option<usize>,

    /// Samples per frame
    #[arg(long)]
    frame_length: Option<usize>,

    /// First frame to read (zero based)
    #[arg(long)]
    start_frame: Option<usize>,

    /// Window: rectangular, bartlett, blackman, hamming or hanning
    #[arg(short, long)]
    window: Option<WindowFunction>,

    /// Spectrogram method: fft, welch or multitaper
    #[arg(short, long)]
    method: Option<SpectrogramMethod>,

    /// Fold the spectrogram in groups of this many frames
    #[arg(long)]
    every: Option<usize>,

    /// Channel power span in Hz
    #[arg(long)]
    span: Option<f64>,

    /// Output file for results (JSON)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Accept a capture that ends before the requested frames
    #[arg(long, default_value_t = false)]
    allow_partial: bool,

    /// Print the configuration JSON schema and exit
    #[arg(long, default_value_t = false)]
    show_config_schema: bool,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, default_level),
    );

    if args.show_config_schema {
        return output_config_schema();
    }

    let input = args
        .input
        .context("An input file is required")?;

    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))?;
    config.apply_args(
        args.format,
        args.frames,
        args.frame_length,
        args.start_frame,
        args.window,
        args.method,
        args.every,
        args.span,
    );
    config.validate()?;

    let format = config
        .acquisition
        .format
        .or_else(|| IqFormat::from_path(&input))
        .with_context(|| format!("Cannot guess the format of {:?}, use --format", input))?;
    debug!("Reading {:?} as {}", input, format);

    let acquisition = &config.acquisition;
    let decoder = create_decoder(&input, format, acquisition.flat_params())?;
    let record = match decoder.decode(
        acquisition.frames,
        acquisition.frame_length,
        acquisition.start_frame,
    ) {
        Ok(record) => record,
        Err(DecodeError::Truncated {
            requested_frames,
            decoded_frames,
            partial,
        }) if args.allow_partial && decoded_frames > 0 => {
            warn!(
                "Capture ended early, analysing {} of {} frames",
                decoded_frames, requested_frames
            );
            *partial
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to decode {:?}", input));
        }
    };

    println!("I/Q Capture Analyzer");
    println!("--------------------");
    println!("{}", record.summary());

    let report = analyze_record(&record, &config.analysis)?;

    if let Some(output_path) = args.output {
        info!("Saving results to: {}", output_path.display());
        std::fs::write(&output_path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
    } else {
        println!();
        println!("Results:");
        println!("- Peak: {:.3} dBm at {:+.1} Hz", report.peak_dbm, report.peak_frequency);
        println!("- FWHM: {:.1} Hz", report.fwhm);
        println!("- Channel power: {:.3} dBm", report.channel_power_dbm);
        println!("- Narrow peaks: {}", report.narrow_peaks.len());
        for (t, p) in report.time.iter().zip(&report.power_vs_time) {
            println!("  {:>10.6} s  {:>9.3} dBm", t, p);
        }
    }

    Ok(())
}
