//! ffmpeg-backed frame decoder.

use std::fs;
use std::num::NonZeroU8;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;

use super::{FrameDecoder, GenerationError};
use crate::container::{GRID_HEIGHT, GRID_WIDTH};

/// Decodes videos by running `ffmpeg` into a scratch directory of BMPs.
///
/// ffmpeg resamples to the target rate and scales to the LED grid, writing
/// `1.bmp`, `2.bmp`, ... in temporal order.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    program: PathBuf,
}

impl FfmpegDecoder {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, source: &Path, frame_rate: NonZeroU8, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(source)
            .arg("-filter:v")
            .arg(format!(
                "fps={},scale={}:{}",
                frame_rate, GRID_WIDTH, GRID_HEIGHT
            ))
            .arg("-c:a")
            .arg("copy")
            .arg(output_dir.join("%d.bmp"));
        cmd
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn decode(
        &self,
        source: &Path,
        frame_rate: NonZeroU8,
    ) -> Result<Vec<DynamicImage>, GenerationError> {
        if !source.is_file() {
            return Err(GenerationError::SourceNotFound(source.to_path_buf()));
        }

        let scratch = tempfile::tempdir()?;
        let mut cmd = self.command(source, frame_rate, scratch.path());
        log::debug!("Running {:?}", cmd);

        let output = cmd.output().map_err(|source| GenerationError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(GenerationError::DecoderFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let frame_count = fs::read_dir(scratch.path())?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "bmp"))
            .count();
        log::debug!("ffmpeg produced {} frames", frame_count);

        (1..=frame_count)
            .map(|n| {
                let path = scratch.path().join(format!("{n}.bmp"));
                image::open(&path).map_err(|source| GenerationError::Image {
                    index: n - 1,
                    source,
                })
            })
            .collect()
    }
}
