// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use approx::assert_relative_eq;
use rust_iqtools::acquisition::iqt::IQT_FRAME_BYTES;
use rust_iqtools::acquisition::{
    create_decoder, DecodeError, FlatParams, IqDecoder, IqFormat, IqtDecoder, IqtHeader, IqtWriter,
};
use rustfft::num_complex::Complex32;
use std::fs::{self, File};
use std::io::Write;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

fn header() -> IqtHeader {
    IqtHeader {
        fft_points: 1024,
        max_input_level: 0.0,
        level_offset: 0.0,
        frame_duration: 1e-3,
        gain_offset: 0.0,
        center_frequency: 1e6,
        span: 2e6,
        valid_frames: 10,
        date_time: "01/01/2020 12:00:00 PM".to_string(),
    }
}

/// Integer ramps so every sample is identifiable
fn raw_samples(n: usize) -> Vec<(i16, i16)> {
    (0..n).map(|k| ((k % 1000) as i16, -((k % 700) as i16))).collect()
}

#[test]
fn test_iqt_capture_of_ten_frames() -> Result<()> {
    setup();
    let dir = tempdir()?;
    let path = dir.path().join("capture.iqt");
    let mut file = File::create(&path)?;
    IqtWriter::new(header()).write_raw(&mut file, &raw_samples(10 * 1024))?;
    drop(file);

    let decoder = create_decoder(&path, IqFormat::Iqt, FlatParams::default())?;
    assert_eq!(decoder.format(), IqFormat::Iqt);
    let record = decoder.decode(10, 1024, 0)?;

    assert_relative_eq!(record.sample_rate_hz, 1.024e6, max_relative = 1e-12);
    assert_eq!(record.nsamples_total, 10240);
    assert_eq!(record.samples.len(), 10240);
    assert_relative_eq!(record.scale_factor, 0.316_227_766, max_relative = 1e-8);
    assert_relative_eq!(record.center_frequency_hz, 1e6);
    assert_relative_eq!(record.record_length_s(), 0.01, max_relative = 1e-12);

    // sample k is (I, Q) × scale
    let scale = record.scale_factor as f32;
    let k = 1500;
    assert_relative_eq!(record.samples[k].re, 500.0 * scale, max_relative = 1e-6);
    assert_relative_eq!(record.samples[k].im, -100.0 * scale, max_relative = 1e-6);

    let summary = serde_json::to_value(record.summary())?;
    assert_eq!(summary["file_name"], path.to_str().unwrap());
    assert_eq!(summary["nframes"], 10);
    Ok(())
}

#[test]
fn test_iqt_start_frame_and_metadata() -> Result<()> {
    setup();
    let dir = tempdir()?;
    let path = dir.path().join("capture.iqt");
    IqtWriter::new(header()).write_raw(&mut File::create(&path)?, &raw_samples(4 * 1024))?;

    let decoder = IqtDecoder::new(&path);
    assert_eq!(decoder.read_header()?.valid_frames, 4);

    let (record, metadata) = decoder.decode_with_metadata(2, 1024, 2)?;
    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata[0].ticks, 2);
    assert_eq!(metadata[1].last_frame, 1);
    // first sample of frame 2 is k = 2048
    let scale = record.scale_factor as f32;
    assert_relative_eq!(record.samples[0].re, 48.0 * scale, max_relative = 1e-6);

    // sample offsets that straddle a frame boundary
    let part = decoder.read_samples(100, 1000)?;
    assert_eq!(part.samples.len(), 100);
    assert_eq!((part.frames, part.frame_length), (1, 100));
    assert_relative_eq!(part.samples[30].re, 30.0 * scale, max_relative = 1e-6);
    Ok(())
}

#[test]
fn test_iqt_truncated_capture_keeps_complete_frames() -> Result<()> {
    setup();
    let dir = tempdir()?;
    let path = dir.path().join("short.iqt");
    let mut bytes = Vec::new();
    IqtWriter::new(header()).write_raw(&mut bytes, &raw_samples(5 * 1024))?;
    // cut the file in the middle of the fourth frame
    bytes.truncate(bytes.len() - IQT_FRAME_BYTES - IQT_FRAME_BYTES / 2);
    fs::write(&path, &bytes)?;

    let err = IqtDecoder::new(&path).decode(5, 1024, 0).unwrap_err();
    match err {
        DecodeError::Truncated {
            requested_frames,
            decoded_frames,
            partial,
        } => {
            assert_eq!(requested_frames, 5);
            assert_eq!(decoded_frames, 3);
            assert_eq!(partial.samples.len(), 3 * 1024);
            assert_eq!(partial.frames, 3);
        }
        other => panic!("unexpected error {:?}", other),
    }
    Ok(())
}

#[test]
fn test_iqt_truncation_uses_the_requested_framing() -> Result<()> {
    setup();
    let dir = tempdir()?;
    let path = dir.path().join("short.iqt");
    let mut bytes = Vec::new();
    IqtWriter::new(header()).write_raw(&mut bytes, &raw_samples(3 * 1024))?;
    bytes.truncate(bytes.len() - 10);
    fs::write(&path, &bytes)?;

    let decoder = IqtDecoder::new(&path);
    match decoder.decode(16, 512, 0).unwrap_err() {
        DecodeError::Truncated {
            requested_frames,
            decoded_frames,
            partial,
        } => {
            assert_eq!((requested_frames, decoded_frames), (16, 4));
            assert_eq!((partial.frames, partial.frame_length), (4, 512));
        }
        other => panic!("unexpected error {:?}", other),
    }

    // raw sample reads count in samples
    match decoder.read_samples(1000, 1500).unwrap_err() {
        DecodeError::Truncated {
            requested_frames,
            decoded_frames,
            partial,
        } => {
            assert_eq!((requested_frames, decoded_frames), (1000, 548));
            let scale = partial.scale_factor as f32;
            assert_relative_eq!(partial.samples[0].re, 500.0 * scale, max_relative = 1e-6);
        }
        other => panic!("unexpected error {:?}", other),
    }
    Ok(())
}

#[test]
fn test_iqt_garbage_header() -> Result<()> {
    setup();
    let dir = tempdir()?;
    let path = dir.path().join("garbage.iqt");
    fs::write(&path, b"not an iqt file at all")?;

    let err = IqtDecoder::new(&path).decode(1, 1024, 0).unwrap_err();
    assert!(err.is_malformed_header(), "{:?}", err);
    Ok(())
}

#[test]
fn test_iqt_calibrated_write_round_trip() -> Result<()> {
    setup();
    let dir = tempdir()?;
    let path = dir.path().join("calibrated.iqt");
    let samples: Vec<Complex32> = (0..2048)
        .map(|k| Complex32::new((k as f32 * 0.01).sin() * 100.0, (k as f32 * 0.01).cos() * 100.0))
        .collect();
    let frames = IqtWriter::new(header()).write_file(&path, &samples)?;
    assert_eq!(frames, 2);

    let record = IqtDecoder::new(&path).decode(2, 1024, 0)?;
    let half_step = record.scale_factor as f32 / 2.0 + 1e-4;
    for (a, b) in record.samples.iter().zip(&samples) {
        assert!((a.re - b.re).abs() <= half_step);
        assert!((a.im - b.im).abs() <= half_step);
    }
    Ok(())
}

#[test]
fn test_gnuradio_flat_capture() -> Result<()> {
    setup();
    let dir = tempdir()?;
    let path = dir.path().join("dump.cfile");
    let mut file = File::create(&path)?;
    for k in 0..1000 {
        file.write_all(&(k as f32).to_le_bytes())?;
        file.write_all(&(-(k as f32)).to_le_bytes())?;
    }
    drop(file);

    assert_eq!(IqFormat::from_path(&path), Some(IqFormat::Gnuradio));
    let params = FlatParams {
        sample_rate_hz: 2e6,
        center_frequency_hz: 4.5e8,
        timestamp: None,
    };
    let decoder = create_decoder(&path, IqFormat::Gnuradio, params)?;
    let record = decoder.decode(4, 100, 2)?;
    assert_eq!(record.samples.len(), 400);
    assert_eq!(record.nsamples_total, 1000);
    assert_eq!(record.samples[0], Complex32::new(200.0, -200.0));
    assert_relative_eq!(record.record_length_s(), 1000.0 / 2e6);

    // 10 frames of 100 from frame 5 runs 500 samples past the end
    let partial = decoder.decode(10, 100, 5).unwrap_err().into_partial().unwrap();
    assert_eq!(partial.samples.len(), 500);
    Ok(())
}

#[test]
fn test_gnuradio_needs_sample_rate() {
    setup();
    let params = FlatParams::default();
    assert!(create_decoder("dump.cfile", IqFormat::Gnuradio, params).is_err());
}
