//! Binary format of the `.pxlstrm` pixel stream container.

use std::fmt;
use std::io::{self, Read, Write};
use std::num::NonZeroU8;
use std::time::Duration;

use super::frame::{FRAME_SIZE, Frame};
use crate::playback::format_clock;

/// Magic bytes identifying a pixel stream file.
pub const FORMAT_IDENTIFIER: &[u8; 7] = b"PXLSTRM";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

/// Identifier(7) + Version(1) + FrameRate(1).
pub const HEADER_SIZE: usize = FORMAT_IDENTIFIER.len() + 2;

/// Errors produced while reading or writing a pixel stream.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Invalid or corrupt pxlstrm data: {reason}")]
    CorruptFormat { reason: String },

    #[error("Unsupported pxlstrm format version: found {found}, expected {expected}")]
    UnsupportedVersion { found: u8, expected: u8 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FormatError {
    fn corrupt(reason: impl Into<String>) -> Self {
        FormatError::CorruptFormat {
            reason: reason.into(),
        }
    }
}

/// An in-memory pixel stream: a frame rate and an ordered list of frames.
///
/// Frame index is the frame number; insertion order is temporal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelStream {
    version: u8,
    frame_rate: NonZeroU8,
    frames: Vec<Frame>,
}

impl PixelStream {
    /// Create a stream stamped with the current [`FORMAT_VERSION`].
    pub fn new(frame_rate: NonZeroU8, frames: Vec<Frame>) -> Self {
        Self {
            version: FORMAT_VERSION,
            frame_rate,
            frames,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Target playback rate in frames per second.
    pub fn frame_rate(&self) -> NonZeroU8 {
        self.frame_rate
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Time between two consecutive frames.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(1) / u32::from(self.frame_rate.get())
    }

    /// Total playback duration (`frame_count / frame_rate`).
    pub fn duration(&self) -> Duration {
        let nanos = self.frames.len() as u128 * 1_000_000_000 / u128::from(self.frame_rate.get());
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Index of the frame shown at `elapsed`, clamped to the last frame.
    ///
    /// Computed in integer nanoseconds so `elapsed == duration()` maps to
    /// the last frame rather than one past it.
    pub fn frame_index_at(&self, elapsed: Duration) -> Option<usize> {
        let last = self.frames.len().checked_sub(1)?;
        let index = elapsed.as_nanos() * u128::from(self.frame_rate.get()) / 1_000_000_000;
        Some(usize::try_from(index).map_or(last, |i| i.min(last)))
    }

    /// Frame shown at `elapsed`, or `None` for an empty stream.
    pub fn frame_at(&self, elapsed: Duration) -> Option<&Frame> {
        self.frame_index_at(elapsed).map(|i| &self.frames[i])
    }

    /// Size of the encoded stream in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.frames.len() * FRAME_SIZE
    }

    /// Write the encoded stream to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(FORMAT_IDENTIFIER)?;
        w.write_all(&[self.version, self.frame_rate.get()])?;
        for frame in &self.frames {
            w.write_all(frame.encode())?;
        }
        Ok(())
    }

    /// Encode the stream into a new buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buf);
        buf
    }

    /// Read and decode a whole stream from input.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Decode a stream from its encoded bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let ident_len = FORMAT_IDENTIFIER.len();
        if bytes.len() < ident_len || &bytes[..ident_len] != FORMAT_IDENTIFIER {
            return Err(FormatError::corrupt("missing PXLSTRM identifier"));
        }
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::corrupt("truncated header"));
        }

        let version = bytes[ident_len];
        if version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                expected: FORMAT_VERSION,
            });
        }

        let frame_rate = NonZeroU8::new(bytes[ident_len + 1])
            .ok_or_else(|| FormatError::corrupt("frame rate is zero"))?;

        let body = &bytes[HEADER_SIZE..];
        let chunks = body.chunks_exact(FRAME_SIZE);
        let trailing = chunks.remainder().len();
        if trailing > 0 {
            log::warn!(
                "Ignoring {} trailing bytes after the last complete frame",
                trailing
            );
        }

        let frames = chunks.map(Frame::decode).collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version,
            frame_rate,
            frames,
        })
    }
}

impl fmt::Display for PixelStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version {}, {} fps, {} frames, {}",
            self.version,
            self.frame_rate,
            self.frames.len(),
            format_clock(self.duration())
        )
    }
}
