//! Ingestion boundary: dropped files in, decoded buffers out.

use crate::buffer::SampleBuffer;
use crate::error::{EditorError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fmt;
use std::io::Cursor;
use thiserror::Error;

/// Audio container kinds recognised by MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// `audio/mp3`
    Mp3,
    /// `audio/ogg`
    Ogg,
    /// `audio/wav`
    Wav,
}

impl MediaKind {
    /// Kind for a MIME type, ignoring case and parameters.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "audio/mp3" | "audio/mpeg" => Some(MediaKind::Mp3),
            "audio/ogg" => Some(MediaKind::Ogg),
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(MediaKind::Wav),
            _ => None,
        }
    }

    /// Canonical MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            MediaKind::Mp3 => "audio/mp3",
            MediaKind::Ogg => "audio/ogg",
            MediaKind::Wav => "audio/wav",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// A file handed over by the drag-and-drop collaborator.
#[derive(Debug, Clone)]
pub struct DroppedFile {
    /// File name; becomes the source's display name.
    pub name: String,
    /// Declared MIME type.
    pub mime: String,
    /// Raw contents.
    pub bytes: Vec<u8>,
}

impl DroppedFile {
    /// Bundle a dropped file.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

/// Decoder failures.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The decoder has no codec for this kind.
    #[error("no decoder for {0}")]
    Unsupported(MediaKind),

    /// The WAV reader rejected the data.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// The data decoded to zero channels.
    #[error("stream has no channels")]
    NoChannels,
}

/// Turns encoded bytes into a mono buffer.
pub trait AudioDecoder {
    /// Decode `bytes` of the given kind.
    fn decode(&self, kind: MediaKind, bytes: &[u8]) -> std::result::Result<SampleBuffer, DecodeError>;
}

/// PCM and float WAV decoder; multi-channel input is averaged down to mono.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(&self, kind: MediaKind, bytes: &[u8]) -> std::result::Result<SampleBuffer, DecodeError> {
        if kind != MediaKind::Wav {
            return Err(DecodeError::Unsupported(kind));
        }
        let reader = WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            return Err(DecodeError::NoChannels);
        }

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        let mono = if channels > 1 {
            samples
                .chunks(channels)
                .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
                .collect()
        } else {
            samples
        };
        Ok(SampleBuffer::new(mono, spec.sample_rate))
    }
}

/// Check a dropped file against the accepted MIME types.
pub fn classify(file: &DroppedFile, accepted: &[String]) -> Result<MediaKind> {
    let kind = MediaKind::from_mime(&file.mime)
        .filter(|kind| accepted.iter().any(|a| MediaKind::from_mime(a) == Some(*kind)));
    kind.ok_or_else(|| EditorError::UnsupportedMediaKind(file.mime.clone()))
}

/// Classify and decode a dropped file.
pub fn decode_file<D: AudioDecoder + ?Sized>(
    file: &DroppedFile,
    accepted: &[String],
    decoder: &D,
) -> Result<SampleBuffer> {
    let kind = classify(file, accepted)?;
    decoder
        .decode(kind, &file.bytes)
        .map_err(|err| EditorError::DecodeFailure {
            name: file.name.clone(),
            reason: err.to_string(),
        })
}

/// Encode a buffer as 16-bit mono WAV bytes.
pub fn encode_wav(buffer: &SampleBuffer) -> std::result::Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in buffer.samples() {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
