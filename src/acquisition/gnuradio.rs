// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Flat GNU Radio complex64 reader
//!
//! File sinks write interleaved little endian `f32` pairs (`I`, `Q`) with no
//! header at all, so sample rate and center frequency come from the caller.

use log::{debug, info, warn};
use rustfft::num_complex::Complex32;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::record::IqRecord;
use super::{DecodeError, IqDecoder, IqFormat};

/// Bytes per complex64 sample
pub const GR_SAMPLE_BYTES: usize = 8;

#[derive(Debug, Clone)]
pub struct GrDecoder {
    path: PathBuf,
    sample_rate_hz: f64,
    center_frequency_hz: f64,
    timestamp: Option<String>,
}

impl GrDecoder {
    pub fn new<P: AsRef<Path>>(
        path: P,
        sample_rate_hz: f64,
        center_frequency_hz: f64,
        timestamp: Option<String>,
    ) -> Result<Self, DecodeError> {
        if sample_rate_hz.is_nan() || sample_rate_hz <= 0.0 {
            return Err(DecodeError::InvalidRequest(format!(
                "flat complex64 files need a positive sample rate, got {}",
                sample_rate_hz
            )));
        }
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            sample_rate_hz,
            center_frequency_hz,
            timestamp,
        })
    }

    fn empty_record(&self, nsamples_total: usize) -> IqRecord {
        let mut record = IqRecord::new(&self.path);
        record.sample_rate_hz = self.sample_rate_hz;
        record.center_frequency_hz = self.center_frequency_hz;
        record.timestamp = self.timestamp.clone();
        record.nsamples_total = nsamples_total;
        record
    }

    /// Read `nsamples` samples starting at sample `offset`.
    ///
    /// A short file yields [`DecodeError::Truncated`] counted in samples,
    /// with every complete sample read so far in the partial record.
    fn read_range(&self, nsamples: usize, offset: usize) -> Result<IqRecord, DecodeError> {
        let file = File::open(&self.path)?;
        let file_size = file.metadata()?.len() as usize;
        let mut record = self.empty_record(file_size / GR_SAMPLE_BYTES);
        record.frames_total = 1;

        let start_byte = (offset as u64)
            .checked_mul(GR_SAMPLE_BYTES as u64)
            .ok_or_else(|| {
                DecodeError::InvalidRequest(format!("sample offset {} overflows", offset))
            })?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(start_byte))?;

        let available = record.nsamples_total.saturating_sub(offset);
        let to_read = nsamples.min(available);
        debug!(
            "Reading {} of {} requested complex64 samples at offset {}",
            to_read, nsamples, offset
        );

        let mut bytes = vec![0u8; to_read * GR_SAMPLE_BYTES];
        reader.read_exact(&mut bytes)?;
        record.samples = bytes
            .chunks_exact(GR_SAMPLE_BYTES)
            .map(|c| {
                Complex32::new(
                    f32::from_le_bytes([c[0], c[1], c[2], c[3]]),
                    f32::from_le_bytes([c[4], c[5], c[6], c[7]]),
                )
            })
            .collect();

        if to_read < nsamples {
            warn!(
                "{} holds {} samples, {} requested from offset {}",
                self.path.display(),
                record.nsamples_total,
                nsamples,
                offset
            );
            return Err(DecodeError::Truncated {
                requested_frames: nsamples,
                decoded_frames: to_read,
                partial: Box::new(record),
            });
        }
        Ok(record)
    }

    /// Load every sample of the file as a single frame
    pub fn read_complete(&self) -> Result<IqRecord, DecodeError> {
        let nsamples = std::fs::metadata(&self.path)?.len() as usize / GR_SAMPLE_BYTES;
        let mut record = self.read_range(nsamples, 0)?;
        record.frames = 1;
        record.frame_length = nsamples;
        info!(
            "Loaded {} samples ({:.3} s) from {}",
            nsamples,
            record.record_length_s(),
            self.path.display()
        );
        Ok(record)
    }
}

impl IqDecoder for GrDecoder {
    fn decode(
        &self,
        frames: usize,
        frame_length: usize,
        start_frame: usize,
    ) -> Result<IqRecord, DecodeError> {
        if frame_length == 0 {
            return Err(DecodeError::InvalidRequest(
                "frame length must be positive".to_string(),
            ));
        }
        let overflow = |what: &str, n: usize| {
            DecodeError::InvalidRequest(format!(
                "{} {} x {} samples overflows",
                what, n, frame_length
            ))
        };
        let nsamples = frames
            .checked_mul(frame_length)
            .ok_or_else(|| overflow("frames", frames))?;
        let offset = start_frame
            .checked_mul(frame_length)
            .ok_or_else(|| overflow("start frame", start_frame))?;
        match self.read_range(nsamples, offset) {
            Ok(mut record) => {
                record.frames = frames;
                record.frame_length = frame_length;
                Ok(record)
            }
            Err(DecodeError::Truncated { mut partial, .. }) => {
                let decoded_frames = partial.samples.len() / frame_length;
                partial.frames = decoded_frames;
                partial.frame_length = frame_length;
                Err(DecodeError::Truncated {
                    requested_frames: frames,
                    decoded_frames,
                    partial,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn read_samples(&self, nsamples: usize, offset: usize) -> Result<IqRecord, DecodeError> {
        if nsamples == 0 {
            return Err(DecodeError::InvalidRequest(
                "at least one sample must be requested".to_string(),
            ));
        }
        let mut record = self.read_range(nsamples, offset)?;
        record.frames = 1;
        record.frame_length = nsamples;
        Ok(record)
    }

    fn format(&self) -> IqFormat {
        IqFormat::Gnuradio
    }
}
