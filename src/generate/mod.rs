//! Video to pixel stream conversion.
//!
//! Decoding is delegated to a [`FrameDecoder`] (ffmpeg by default). The
//! pipeline only reduces each decoded image to the 32x8 RGB grid and
//! assembles the frames into a [`PixelStream`]. Any failure aborts the whole
//! run; no partial stream is ever returned.

mod ffmpeg;

use std::io;
use std::num::NonZeroU8;
use std::path::{Path, PathBuf};

use image::DynamicImage;

pub use ffmpeg::FfmpegDecoder;

use crate::container::{Frame, GRID_HEIGHT, GRID_WIDTH, PIXEL_COUNT, Pixel, PixelStream};
use crate::schema::{ConfigError, StreamConfig};

/// Errors that abort stream generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Source video not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Failed to launch decoder `{}`: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Decoder exited with {status}: {stderr}")]
    DecoderFailed { status: String, stderr: String },

    #[error("Failed to decode frame {index}: {source}")]
    Image {
        index: usize,
        #[source]
        source: image::ImageError,
    },

    #[error("Frame {index} is {width}x{height}, expected 32x8")]
    Dimensions { index: usize, width: u32, height: u32 },

    #[error("Decoder produced no frames")]
    NoFrames,

    #[error("I/O error during generation: {0}")]
    Io(#[from] io::Error),
}

/// Source of decoded still images, one per time step at the requested rate.
pub trait FrameDecoder {
    fn decode(
        &self,
        source: &Path,
        frame_rate: NonZeroU8,
    ) -> Result<Vec<DynamicImage>, GenerationError>;
}

/// Converts videos into pixel streams at a fixed frame rate.
#[derive(Debug, Clone)]
pub struct Generator<D = FfmpegDecoder> {
    decoder: D,
    frame_rate: NonZeroU8,
}

impl Generator<FfmpegDecoder> {
    /// Generator using the configured ffmpeg program and frame rate.
    pub fn from_config(config: &StreamConfig) -> Result<Self, ConfigError> {
        let frame_rate = NonZeroU8::new(config.frame_rate).ok_or(ConfigError::InvalidFrameRate)?;
        Ok(Self::new(
            FfmpegDecoder::new(config.ffmpeg_program.clone()),
            frame_rate,
        ))
    }
}

impl<D: FrameDecoder> Generator<D> {
    pub fn new(decoder: D, frame_rate: NonZeroU8) -> Self {
        Self {
            decoder,
            frame_rate,
        }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn frame_rate(&self) -> NonZeroU8 {
        self.frame_rate
    }

    /// Override the frame rate for subsequent conversions.
    pub fn with_frame_rate(mut self, frame_rate: NonZeroU8) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Convert `source` into a pixel stream.
    pub fn generate(&self, source: &Path) -> Result<PixelStream, GenerationError> {
        log::info!(
            "Converting {} at {} fps",
            source.display(),
            self.frame_rate
        );

        let images = self.decoder.decode(source, self.frame_rate)?;
        if images.is_empty() {
            return Err(GenerationError::NoFrames);
        }

        let frames = images
            .iter()
            .enumerate()
            .map(|(index, image)| frame_from_image(index, image))
            .collect::<Result<Vec<_>, _>>()?;

        let stream = PixelStream::new(self.frame_rate, frames);
        log::info!("Converted {} ({})", source.display(), stream);
        Ok(stream)
    }
}

/// Reduce a decoded image to a frame: RGB only, row-major from the top-left.
fn frame_from_image(index: usize, image: &DynamicImage) -> Result<Frame, GenerationError> {
    if image.width() as usize != GRID_WIDTH || image.height() as usize != GRID_HEIGHT {
        return Err(GenerationError::Dimensions {
            index,
            width: image.width(),
            height: image.height(),
        });
    }

    let rgb = image.to_rgb8();
    let mut pixels = [Pixel::default(); PIXEL_COUNT];
    for (pixel, source) in pixels.iter_mut().zip(rgb.pixels()) {
        let [r, g, b] = source.0;
        *pixel = Pixel::new(r, g, b);
    }
    Ok(Frame::from_pixels(pixels))
}
