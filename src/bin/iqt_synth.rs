// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Synthetic IQT capture generator for testing
// Writes a tone buried in complex Gaussian noise as an IQT container

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use rust_iqtools::acquisition::iqt::IQT_POINTS_PER_FRAME;
use rust_iqtools::acquisition::{IqtHeader, IqtWriter};
use rust_iqtools::utility::noise_generator::{quantize_i16, IqNoiseGenerator};

/// Synthetic IQT capture generator
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output file path (.iqt)
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Number of frames of 1024 samples
    #[arg(short, long, default_value_t = 10)]
    frames: usize,

    /// Span in Hz, the sample rate is 1.024 × span
    #[arg(short, long, default_value_t = 1.0e6)]
    span: f64,

    /// Center frequency in Hz
    #[arg(short, long, default_value_t = 1.0e9)]
    center: f64,

    /// Tone offset from the center in Hz
    #[arg(short = 't', long, default_value_t = 50.0e3)]
    tone: f64,

    /// Tone amplitude (calibrated units)
    #[arg(short, long, default_value_t = 1.0)]
    amplitude: f32,

    /// Noise standard deviation on each of I and Q
    #[arg(short, long, default_value_t = 0.01)]
    noise: f32,

    /// Quantize with this full scale instead of the header levels
    #[arg(long)]
    full_scale: Option<f32>,

    /// Seed of the noise generator, the system clock when omitted
    #[arg(long)]
    seed: Option<u32>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.frames == 0 {
        eprintln!("Error: At least one frame is required");
        std::process::exit(1);
    }
    if args.span <= 0.0 {
        eprintln!("Error: Span must be positive");
        std::process::exit(1);
    }
    if args.tone.abs() >= args.span * 1.024 / 2.0 {
        eprintln!("Error: Tone offset must stay below half the sample rate");
        std::process::exit(1);
    }

    let num_samples = args.frames * IQT_POINTS_PER_FRAME;
    let header = IqtHeader {
        fft_points: IQT_POINTS_PER_FRAME,
        max_input_level: 0.0,
        level_offset: 0.0,
        frame_duration: IQT_POINTS_PER_FRAME as f64 / (args.span * 1.024),
        gain_offset: 0.0,
        center_frequency: args.center,
        span: args.span,
        valid_frames: args.frames,
        date_time: chrono::Local::now().format("%m/%d/%Y %I:%M:%S %p").to_string(),
    };
    let sample_rate = header.sample_rate();

    println!("Generating {} frames ({} samples)...", args.frames, num_samples);
    println!("Sample rate: {} S/s", sample_rate);
    println!("Center frequency: {} Hz", args.center);
    println!("Tone: {:+} Hz, amplitude {}", args.tone, args.amplitude);

    let mut generator = match args.seed {
        Some(seed) => IqNoiseGenerator::new(seed),
        None => IqNoiseGenerator::new_from_system_time(),
    };
    let samples = generator.generate_tone_with_noise(
        num_samples,
        args.tone,
        sample_rate,
        args.amplitude,
        args.noise,
    );

    let writer = IqtWriter::new(header);
    let mut file = BufWriter::new(
        File::create(&args.output)
            .with_context(|| format!("Failed to create {:?}", args.output))?,
    );
    let frames = match args.full_scale {
        Some(full_scale) => {
            let raw: Vec<(i16, i16)> = samples
                .iter()
                .map(|s| quantize_i16(*s, full_scale))
                .collect();
            writer.write_raw(&mut file, &raw)?
        }
        None => writer.write_samples(&mut file, &samples)?,
    };
    file.flush()?;

    println!("Wrote {} frames to {}", frames, args.output.display());
    Ok(())
}
