// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-iqtools project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! IQT container decoder and writer
//!
//! An IQT file is laid out as follows (all integers little endian):
//!
//! ```text
//! [1 byte ASCII digit]        N1 = number of digits of the header length
//! [N1 bytes ASCII digits]     N2 = header length in bytes
//! [N2 bytes UTF-8 text]       newline separated `key = value` records
//! repeated for every frame:
//!   [24 bytes metadata]       10 x i16 flags/counters + 1 x i32 tick counter
//!   [4096 bytes payload]      2048 x i16, (Q, I) pairs for 1024 points
//! ```
//!
//! A frame always carries 1024 complex points whatever the `FFTPoints`
//! header value says. Within a pair the quadrature value comes first, so
//! sample `k` is `I = raw[2k + 1]`, `Q = raw[2k]`, times the header derived
//! scale factor.

use log::{debug, info, warn};
use rustfft::num_complex::Complex32;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::header::HeaderDictionary;
use super::record::IqRecord;
use super::{DecodeError, IqDecoder, IqFormat};

/// Complex points carried by one binary frame
pub const IQT_POINTS_PER_FRAME: usize = 1024;
/// Size of the per-frame metadata block
pub const IQT_METADATA_BYTES: usize = 10 * 2 + 4;
/// Size of the per-frame sample payload
pub const IQT_PAYLOAD_BYTES: usize = IQT_POINTS_PER_FRAME * 2 * 2;
/// Size of one complete frame
pub const IQT_FRAME_BYTES: usize = IQT_METADATA_BYTES + IQT_PAYLOAD_BYTES;

/// Acquisition parameters carried by an IQT header
#[derive(Debug, Clone, PartialEq)]
pub struct IqtHeader {
    /// `FFTPoints`
    pub fft_points: usize,
    /// `MaxInputLevel` in dBm
    pub max_input_level: f64,
    /// `LevelOffset` in dB
    pub level_offset: f64,
    /// `FrameLength`, duration of one FFT frame in seconds
    pub frame_duration: f64,
    /// `GainOffset` in dB
    pub gain_offset: f64,
    /// `CenterFrequency` in Hz
    pub center_frequency: f64,
    /// `Span` in Hz
    pub span: f64,
    /// `ValidFrames`
    pub valid_frames: usize,
    /// `DateTime`, kept verbatim
    pub date_time: String,
}

impl IqtHeader {
    /// Pull the required fields out of a parsed header
    pub fn from_dictionary(dic: &HeaderDictionary) -> Result<Self, DecodeError> {
        let header = Self {
            fft_points: dic.require_usize("FFTPoints")?,
            max_input_level: dic.require_f64("MaxInputLevel")?,
            level_offset: dic.require_f64("LevelOffset")?,
            frame_duration: dic.require_f64("FrameLength")?,
            gain_offset: dic.require_f64("GainOffset")?,
            center_frequency: dic.require_f64("CenterFrequency")?,
            span: dic.require_f64("Span")?,
            valid_frames: dic.require_usize("ValidFrames")?,
            date_time: dic.require_str("DateTime")?.to_string(),
        };

        if !(header.frame_duration > 0.0 && header.frame_duration.is_finite()) {
            return Err(DecodeError::InvalidValue {
                key: "FrameLength".to_string(),
                value: header.frame_duration.to_string(),
            });
        }
        if header.fft_points == 0 {
            return Err(DecodeError::InvalidValue {
                key: "FFTPoints".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(header)
    }

    /// `FFTPoints / FrameLength`
    pub fn sample_rate(&self) -> f64 {
        self.fft_points as f64 / self.frame_duration
    }

    /// Samples stored in the whole file, `ValidFrames × FFTPoints`.
    /// Saturates on absurd header values.
    pub fn total_samples(&self) -> usize {
        self.valid_frames.saturating_mul(self.fft_points)
    }

    /// Amplitude calibration of the raw integers:
    /// `sqrt(10^((gain + max_level + level_offset) / 10) / 20 * 2)`
    pub fn scale_factor(&self) -> f64 {
        let level_db = self.gain_offset + self.max_input_level + self.level_offset;
        (10f64.powf(level_db / 10.0) / 20.0 * 2.0).sqrt()
    }

    /// Header text as written into the container
    pub fn to_text(&self) -> String {
        format!(
            "FFTPoints = {}\nMaxInputLevel = {}\nLevelOffset = {}\nFrameLength = {}\nGainOffset = {}\nCenterFrequency = {}\nSpan = {}\nValidFrames = {}\nDateTime = {}\n",
            self.fft_points,
            self.max_input_level,
            self.level_offset,
            self.frame_duration,
            self.gain_offset,
            self.center_frequency,
            self.span,
            self.valid_frames,
            self.date_time
        )
    }
}

/// Metadata block preceding every frame payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IqtFrameMetadata {
    pub reserved1: i16,
    pub valid_a: i16,
    pub valid_p: i16,
    pub valid_i: i16,
    pub valid_q: i16,
    pub bins: i16,
    pub reserved2: i16,
    pub triggered: i16,
    pub overload: i16,
    pub last_frame: i16,
    pub ticks: i32,
}

impl IqtFrameMetadata {
    pub fn from_bytes(bytes: &[u8; IQT_METADATA_BYTES]) -> Self {
        let field = |i: usize| i16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]]);
        Self {
            reserved1: field(0),
            valid_a: field(1),
            valid_p: field(2),
            valid_i: field(3),
            valid_q: field(4),
            bins: field(5),
            reserved2: field(6),
            triggered: field(7),
            overload: field(8),
            last_frame: field(9),
            ticks: i32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; IQT_METADATA_BYTES] {
        let mut out = [0u8; IQT_METADATA_BYTES];
        let fields = [
            self.reserved1,
            self.valid_a,
            self.valid_p,
            self.valid_i,
            self.valid_q,
            self.bins,
            self.reserved2,
            self.triggered,
            self.overload,
            self.last_frame,
        ];
        for (i, v) in fields.iter().enumerate() {
            out[2 * i..2 * i + 2].copy_from_slice(&v.to_le_bytes());
        }
        out[20..24].copy_from_slice(&self.ticks.to_le_bytes());
        out
    }
}

fn read_header_bytes<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<(), DecodeError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DecodeError::MalformedHeader(format!("source ended inside the {}", what))
        } else {
            DecodeError::Io(e)
        }
    })
}

fn parse_ascii_number(bytes: &[u8], what: &str) -> Result<usize, DecodeError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .ok_or_else(|| {
            DecodeError::MalformedHeader(format!(
                "{} is not an ASCII number: {:?}",
                what,
                String::from_utf8_lossy(bytes)
            ))
        })
}

/// Read the length-prefixed text header.
///
/// Returns the parsed dictionary and the byte offset of the first frame.
pub fn read_header<R: Read>(reader: &mut R) -> Result<(HeaderDictionary, u64), DecodeError> {
    let mut size_of_size = [0u8; 1];
    read_header_bytes(reader, &mut size_of_size, "header size prefix")?;
    let n1 = parse_ascii_number(&size_of_size, "header size prefix")?;

    let mut size_field = vec![0u8; n1];
    read_header_bytes(reader, &mut size_field, "header size field")?;
    let n2 = parse_ascii_number(&size_field, "header size field")?;

    // the length field is untrusted, only keep what the source holds
    let mut text = Vec::new();
    reader.by_ref().take(n2 as u64).read_to_end(&mut text)?;
    if text.len() < n2 {
        return Err(DecodeError::MalformedHeader(format!(
            "source ended inside the header text ({} of {} bytes)",
            text.len(),
            n2
        )));
    }
    let text = String::from_utf8(text)
        .map_err(|e| DecodeError::MalformedHeader(format!("header is not UTF-8: {}", e)))?;

    let data_offset = (1 + n1 + n2) as u64;
    debug!("IQT header: {} bytes, frames start at byte {}", n2, data_offset);
    Ok((HeaderDictionary::parse(&text), data_offset))
}

/// Fill `buf` as far as the source allows, returning the number of bytes read
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Convert one frame payload into scaled complex samples.
///
/// The payload stores `(Q, I)` pairs; they are swapped into `I + jQ`.
pub fn deinterleave_payload(payload: &[u8], scale: f64, out: &mut Vec<Complex32>) {
    for pair in payload.chunks_exact(4) {
        let q = i16::from_le_bytes([pair[0], pair[1]]) as f32;
        let i = i16::from_le_bytes([pair[2], pair[3]]) as f32;
        out.push(Complex32::new(
            (i as f64 * scale) as f32,
            (q as f64 * scale) as f32,
        ));
    }
}

/// Decode an IQT container from any seekable byte source.
///
/// Reads enough binary frames, starting at binary frame `start_frame`
/// (zero based, 1024 points each whatever `frame_length` is), to cover
/// `frames × frame_length` samples, and returns the record with the
/// metadata block of every frame read. Truncation is reported in frames of
/// `frame_length`.
pub fn decode_iqt<R: Read + Seek>(
    mut reader: R,
    filename: &Path,
    frames: usize,
    frame_length: usize,
    start_frame: usize,
) -> Result<(IqRecord, Vec<IqtFrameMetadata>), DecodeError> {
    if frame_length == 0 {
        return Err(DecodeError::InvalidRequest(
            "frame length must be positive".to_string(),
        ));
    }
    let wanted = frames.checked_mul(frame_length).ok_or_else(|| {
        DecodeError::InvalidRequest(format!("{} x {} samples overflows", frames, frame_length))
    })?;

    let (dic, data_offset) = read_header(&mut reader)?;
    let header = IqtHeader::from_dictionary(&dic)?;
    let scale = header.scale_factor();

    let mut record = IqRecord::new(filename);
    record.sample_rate_hz = header.sample_rate();
    record.center_frequency_hz = header.center_frequency;
    record.span_hz = Some(header.span);
    record.scale_factor = scale;
    record.frames_total = header.valid_frames;
    record.nsamples_total = header.total_samples();
    record.timestamp = Some(header.date_time.clone());
    record.frames = frames;
    record.frame_length = frame_length;

    let binary_frames = wanted.div_ceil(IQT_POINTS_PER_FRAME);
    let out_of_range = || {
        DecodeError::InvalidRequest(format!(
            "{} frames from binary frame {} are outside any IQT file",
            binary_frames, start_frame
        ))
    };
    let end_frame = start_frame
        .checked_add(binary_frames)
        .ok_or_else(out_of_range)?;
    let start_byte = (start_frame as u64)
        .checked_mul(IQT_FRAME_BYTES as u64)
        .and_then(|b| b.checked_add(data_offset))
        .ok_or_else(out_of_range)?;
    if end_frame > header.valid_frames {
        warn!(
            "Requested frames {}..{} but the header declares only {} valid frames",
            start_frame, end_frame, header.valid_frames
        );
    }

    info!(
        "Reading {} IQT frames from frame {} (fs = {} Hz, scale = {})",
        binary_frames, start_frame, record.sample_rate_hz, scale
    );
    reader.seek(SeekFrom::Start(start_byte))?;

    let expected = end_frame.min(header.valid_frames).saturating_sub(start_frame);
    let mut samples = Vec::with_capacity(expected * IQT_POINTS_PER_FRAME);
    let mut metadata = Vec::with_capacity(expected);
    let mut buf = vec![0u8; IQT_FRAME_BYTES];

    for index in 0..binary_frames {
        let got = read_up_to(&mut reader, &mut buf)?;
        if got < IQT_FRAME_BYTES {
            warn!(
                "Source ends inside frame {} ({} of {} bytes), keeping {} complete frames",
                start_frame + index,
                got,
                IQT_FRAME_BYTES,
                index
            );
            record.samples = samples;
            record.frames = record.samples.len() / frame_length;
            return Err(DecodeError::Truncated {
                requested_frames: frames,
                decoded_frames: record.frames,
                partial: Box::new(record),
            });
        }

        let mut meta_bytes = [0u8; IQT_METADATA_BYTES];
        meta_bytes.copy_from_slice(&buf[..IQT_METADATA_BYTES]);
        metadata.push(IqtFrameMetadata::from_bytes(&meta_bytes));
        deinterleave_payload(&buf[IQT_METADATA_BYTES..], scale, &mut samples);
    }

    let overloaded = metadata.iter().filter(|m| m.overload != 0).count();
    if overloaded > 0 {
        warn!("{} of {} frames carry the overload flag", overloaded, metadata.len());
    }

    record.samples = samples;
    Ok((record, metadata))
}

/// Decoder for IQT files on disk
#[derive(Debug, Clone)]
pub struct IqtDecoder {
    path: PathBuf,
}

impl IqtDecoder {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn open(&self) -> Result<BufReader<File>, DecodeError> {
        debug!("Opening IQT file {}", self.path.display());
        Ok(BufReader::new(File::open(&self.path)?))
    }

    /// Parse only the header of the file
    pub fn read_header(&self) -> Result<IqtHeader, DecodeError> {
        let mut reader = self.open()?;
        let (dic, _) = read_header(&mut reader)?;
        IqtHeader::from_dictionary(&dic)
    }

    /// Like [`IqDecoder::decode`], also returning the frame metadata blocks
    pub fn decode_with_metadata(
        &self,
        frames: usize,
        frame_length: usize,
        start_frame: usize,
    ) -> Result<(IqRecord, Vec<IqtFrameMetadata>), DecodeError> {
        let reader = self.open()?;
        decode_iqt(reader, &self.path, frames, frame_length, start_frame)
    }
}

impl IqDecoder for IqtDecoder {
    fn decode(
        &self,
        frames: usize,
        frame_length: usize,
        start_frame: usize,
    ) -> Result<IqRecord, DecodeError> {
        self.decode_with_metadata(frames, frame_length, start_frame)
            .map(|(record, _)| record)
    }

    fn read_samples(&self, nsamples: usize, offset: usize) -> Result<IqRecord, DecodeError> {
        if nsamples == 0 {
            return Err(DecodeError::InvalidRequest(
                "at least one sample must be requested".to_string(),
            ));
        }
        let end = offset.checked_add(nsamples).ok_or_else(|| {
            DecodeError::InvalidRequest(format!(
                "{} samples from offset {} overflows",
                nsamples, offset
            ))
        })?;
        let first = offset / IQT_POINTS_PER_FRAME;
        let last = end.div_ceil(IQT_POINTS_PER_FRAME);
        let skip = offset % IQT_POINTS_PER_FRAME;
        let trim = |record: &mut IqRecord| {
            record.samples.drain(..skip.min(record.samples.len()));
            record.samples.truncate(nsamples);
        };

        match self.decode(last - first, IQT_POINTS_PER_FRAME, first) {
            Ok(mut record) => {
                trim(&mut record);
                record.frames = 1;
                record.frame_length = nsamples;
                Ok(record)
            }
            // counted in samples, like flat captures
            Err(DecodeError::Truncated { mut partial, .. }) => {
                trim(&mut *partial);
                partial.frames = partial.samples.len();
                partial.frame_length = 1;
                Err(DecodeError::Truncated {
                    requested_frames: nsamples,
                    decoded_frames: partial.samples.len(),
                    partial,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn format(&self) -> IqFormat {
        IqFormat::Iqt
    }
}

/// Writes IQT containers, the exact inverse of [`decode_iqt`]
#[derive(Debug, Clone)]
pub struct IqtWriter {
    header: IqtHeader,
}

impl IqtWriter {
    /// `header.valid_frames` is replaced by the number of frames written
    pub fn new(header: IqtHeader) -> Self {
        Self { header }
    }

    fn write_prefix<W: Write>(&self, writer: &mut W, valid_frames: usize) -> io::Result<()> {
        let mut header = self.header.clone();
        header.valid_frames = valid_frames;
        let text = header.to_text();
        let size = text.len().to_string();
        // the size prefix is a single ASCII digit
        debug_assert!(size.len() < 10);
        writer.write_all(size.len().to_string().as_bytes())?;
        writer.write_all(size.as_bytes())?;
        writer.write_all(text.as_bytes())
    }

    /// Write raw `(I, Q)` integer pairs, zero padding the last frame.
    ///
    /// Returns the number of frames written.
    pub fn write_raw<W: Write>(&self, writer: &mut W, raw: &[(i16, i16)]) -> io::Result<usize> {
        let frame_count = raw.len().div_ceil(IQT_POINTS_PER_FRAME);
        self.write_prefix(writer, frame_count)?;

        for (index, chunk) in raw.chunks(IQT_POINTS_PER_FRAME).enumerate() {
            let metadata = IqtFrameMetadata {
                valid_a: 1,
                valid_p: 1,
                valid_i: 1,
                valid_q: 1,
                bins: IQT_POINTS_PER_FRAME as i16,
                last_frame: i16::from(index + 1 == frame_count),
                ticks: index as i32,
                ..Default::default()
            };
            writer.write_all(&metadata.to_bytes())?;

            let mut payload = vec![0u8; IQT_PAYLOAD_BYTES];
            for (k, &(i, q)) in chunk.iter().enumerate() {
                payload[4 * k..4 * k + 2].copy_from_slice(&q.to_le_bytes());
                payload[4 * k + 2..4 * k + 4].copy_from_slice(&i.to_le_bytes());
            }
            writer.write_all(&payload)?;
        }
        Ok(frame_count)
    }

    /// Quantize calibrated samples back to integers with the header scale
    /// factor and write them.
    pub fn write_samples<W: Write>(&self, writer: &mut W, samples: &[Complex32]) -> io::Result<usize> {
        let scale = self.header.scale_factor();
        if scale.is_nan() || scale <= 0.0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "header levels give a zero scale factor",
            ));
        }
        let to_i16 = |v: f32| (v as f64 / scale).round().clamp(-32768.0, 32767.0) as i16;
        let raw: Vec<(i16, i16)> = samples.iter().map(|s| (to_i16(s.re), to_i16(s.im))).collect();
        self.write_raw(writer, &raw)
    }

    /// Write calibrated samples to a new file
    pub fn write_file<P: AsRef<Path>>(&self, path: P, samples: &[Complex32]) -> io::Result<usize> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        let frames = self.write_samples(&mut writer, samples)?;
        writer.flush()?;
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    fn scenario_header() -> IqtHeader {
        IqtHeader {
            fft_points: 1024,
            max_input_level: 0.0,
            level_offset: 0.0,
            frame_duration: 1e-3,
            gain_offset: 0.0,
            center_frequency: 1e6,
            span: 2e6,
            valid_frames: 0,
            date_time: "01/01/2020 12:00:00 PM".to_string(),
        }
    }

    fn container(raw: &[(i16, i16)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        IqtWriter::new(scenario_header())
            .write_raw(&mut bytes, raw)
            .unwrap();
        bytes
    }

    fn ramp(n: usize) -> Vec<(i16, i16)> {
        (0..n)
            .map(|k| ((k % 3000) as i16 - 1500, -((k % 2000) as i16)))
            .collect()
    }

    #[test]
    fn test_frame_layout_constants() {
        assert_eq!(IQT_METADATA_BYTES, 24);
        assert_eq!(IQT_FRAME_BYTES, 4120);
    }

    #[test]
    fn test_header_prefix_and_suffixes() {
        let text = "FFTPoints = 1024\nMaxInputLevel = 0\nLevelOffset = 0\nFrameLength = 1m\nGainOffset = 0\nCenterFrequency = 1M\nSpan = 2M\nValidFrames = 10\nDateTime = 01/01/2020 12:00:00 PM\n";
        let mut bytes = format!("{}{}", text.len().to_string().len(), text.len()).into_bytes();
        bytes.extend_from_slice(text.as_bytes());

        let (dic, offset) = read_header(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(offset as usize, bytes.len());

        let header = IqtHeader::from_dictionary(&dic).unwrap();
        assert_relative_eq!(header.sample_rate(), 1.024e6, max_relative = 1e-12);
        assert_eq!(header.total_samples(), 10240);
        assert_relative_eq!(header.scale_factor(), 0.1f64.sqrt(), max_relative = 1e-12);
        assert_relative_eq!(header.center_frequency, 1e6);
        assert_eq!(header.date_time, "01/01/2020 12:00:00 PM");
    }

    #[test]
    fn test_scale_factor_order_of_operations() {
        let mut header = scenario_header();
        header.gain_offset = 3.0;
        header.max_input_level = -10.0;
        header.level_offset = 17.0;
        let expected = (10f64.powf(10.0 / 10.0) / 20.0 * 2.0).sqrt();
        assert_relative_eq!(header.scale_factor(), expected, max_relative = 1e-15);
        assert_relative_eq!(header.scale_factor(), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_deinterleave_and_scale() {
        let raw = ramp(3 * IQT_POINTS_PER_FRAME);
        let bytes = container(&raw);
        let (record, metadata) =
            decode_iqt(Cursor::new(bytes), Path::new("mem.iqt"), 3, 1024, 0).unwrap();

        let scale = 0.1f64.sqrt();
        assert_eq!(record.samples.len(), raw.len());
        for (s, &(i, q)) in record.samples.iter().zip(&raw) {
            assert_relative_eq!(s.re, (i as f64 * scale) as f32, max_relative = 1e-6);
            assert_relative_eq!(s.im, (q as f64 * scale) as f32, max_relative = 1e-6);
        }
        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata[2].last_frame, 1);
        assert_eq!(metadata[1].ticks, 1);
    }

    #[test]
    fn test_payload_order_is_quadrature_first() {
        // one point: payload bytes hold Q = 7 then I = -3
        let mut payload = Vec::new();
        payload.extend_from_slice(&7i16.to_le_bytes());
        payload.extend_from_slice(&(-3i16).to_le_bytes());
        let mut out = Vec::new();
        deinterleave_payload(&payload, 2.0, &mut out);
        assert_eq!(out, vec![Complex32::new(-6.0, 14.0)]);
    }

    #[test]
    fn test_start_frame_offset() {
        let raw = ramp(4 * IQT_POINTS_PER_FRAME);
        let bytes = container(&raw);
        let (record, _) =
            decode_iqt(Cursor::new(bytes), Path::new("mem.iqt"), 2, 1024, 2).unwrap();

        let scale = 0.1f64.sqrt();
        let expected_first = raw[2 * IQT_POINTS_PER_FRAME];
        assert_relative_eq!(
            record.samples[0].re,
            (expected_first.0 as f64 * scale) as f32,
            max_relative = 1e-6
        );
        assert_eq!(record.samples.len(), 2048);
        assert_eq!(record.frames_total, 4);
    }

    #[test]
    fn test_framing_view_reads_enough_frames() {
        let bytes = container(&ramp(4 * IQT_POINTS_PER_FRAME));
        let (record, metadata) =
            decode_iqt(Cursor::new(bytes), Path::new("mem.iqt"), 3, 1000, 0).unwrap();
        assert_eq!(metadata.len(), 3);
        assert!(record.frames * record.frame_length <= record.samples.len());
    }

    #[test]
    fn test_truncated_source_keeps_complete_frames() {
        let mut bytes = container(&ramp(3 * IQT_POINTS_PER_FRAME));
        bytes.truncate(bytes.len() - 100);

        let err = decode_iqt(Cursor::new(bytes), Path::new("mem.iqt"), 3, 1024, 0).unwrap_err();
        match err {
            DecodeError::Truncated {
                requested_frames,
                decoded_frames,
                partial,
            } => {
                assert_eq!(requested_frames, 3);
                assert_eq!(decoded_frames, 2);
                assert_eq!(partial.samples.len(), 2048);
                assert_eq!(partial.frames, 2);
            }
            other => panic!("expected truncation, got {other}"),
        }
    }

    #[test]
    fn test_start_beyond_end_is_truncated() {
        let bytes = container(&ramp(IQT_POINTS_PER_FRAME));
        let err = decode_iqt(Cursor::new(bytes), Path::new("mem.iqt"), 1, 1024, 5).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { decoded_frames: 0, .. }));
    }

    #[test]
    fn test_missing_key_fails_fast() {
        let text = "FFTPoints = 1024\n";
        let mut bytes = format!("{}{}", text.len().to_string().len(), text.len()).into_bytes();
        bytes.extend_from_slice(text.as_bytes());
        let err = decode_iqt(Cursor::new(bytes), Path::new("mem.iqt"), 1, 1024, 0).unwrap_err();
        assert!(err.is_malformed_header());
    }

    #[test]
    fn test_garbage_prefix_is_malformed() {
        let err = read_header(&mut Cursor::new(b"x12".to_vec())).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedHeader(_)));

        let err = read_header(&mut Cursor::new(b"3200abc".to_vec())).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedHeader(_)));
    }

    #[test]
    fn test_oversized_header_length_is_malformed() {
        let mut bytes = b"9999999999".to_vec();
        bytes.extend_from_slice(b"FFTPoints = 1024\n");
        let err = read_header(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedHeader(_)), "{err}");
    }

    #[test]
    fn test_frame_length_must_be_finite() {
        for bad in ["NaN", "inf", "0", "-1e-3"] {
            let text = format!(
                "FFTPoints = 1024\nMaxInputLevel = 0\nLevelOffset = 0\nFrameLength = {}\n\
                 GainOffset = 0\nCenterFrequency = 1e6\nSpan = 2e6\nValidFrames = 1\n\
                 DateTime = 01/01/2020 12:00:00 PM\n",
                bad
            );
            let err = IqtHeader::from_dictionary(&HeaderDictionary::parse(&text)).unwrap_err();
            assert!(
                matches!(err, DecodeError::InvalidValue { ref key, .. } if key == "FrameLength"),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn test_truncation_is_counted_in_requested_frames() {
        // 3 binary frames, 2.5 of them readable
        let mut bytes = container(&ramp(3 * IQT_POINTS_PER_FRAME));
        bytes.truncate(bytes.len() - IQT_FRAME_BYTES / 2);

        match decode_iqt(Cursor::new(bytes), Path::new("mem.iqt"), 16, 512, 0) {
            Err(DecodeError::Truncated {
                requested_frames,
                decoded_frames,
                partial,
            }) => {
                assert_eq!(requested_frames, 16);
                assert_eq!(decoded_frames, 4);
                assert_eq!(partial.frames, 4);
                assert_eq!(partial.frame_length, 512);
                assert_eq!(partial.samples.len(), 2 * IQT_POINTS_PER_FRAME);
            }
            other => panic!("expected truncation, got {:?}", other.map(|(r, _)| r.frames)),
        }
    }

    #[test]
    fn test_unaddressable_requests_are_rejected() {
        let bytes = container(&ramp(IQT_POINTS_PER_FRAME));
        let err = decode_iqt(Cursor::new(bytes.clone()), Path::new("mem.iqt"), 1, 1024, usize::MAX)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidRequest(_)), "{err}");

        let err = decode_iqt(Cursor::new(bytes), Path::new("mem.iqt"), usize::MAX / 2, 4, 0)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidRequest(_)), "{err}");
    }

    #[test]
    fn test_write_samples_round_trip() {
        let writer = IqtWriter::new(scenario_header());
        let scale = 0.1f64.sqrt() as f32;
        let samples: Vec<Complex32> = (0..1500)
            .map(|k| Complex32::new(k as f32 * scale, -(k as f32) * scale))
            .collect();
        let mut bytes = Vec::new();
        assert_eq!(writer.write_samples(&mut bytes, &samples).unwrap(), 2);

        let (record, _) =
            decode_iqt(Cursor::new(bytes), Path::new("mem.iqt"), 2, 1024, 0).unwrap();
        for (a, b) in record.samples.iter().zip(&samples) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-3);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-3);
        }
        // padding of the last frame decodes as zeros
        assert_eq!(record.samples[2047], Complex32::new(0.0, 0.0));
    }
}
