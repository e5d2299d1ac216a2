//! Pixel streams for 32x8 LED matrix clocks.
//!
//! This crate converts videos into fixed-rate sequences of 32x8 RGB frames,
//! stores them in the compact `PXLSTRM` container, and plays them back by
//! pushing each frame to a networked display device at precisely spaced
//! intervals.
//!
//! # Architecture
//!
//! - `container`: frame and container codecs, plus file storage
//! - `generate`: video to pixel stream conversion through an external decoder
//! - `playback`: playback clock, single-flight push gate and the session loop
//! - `device`: HTTP client for the display device
//! - `source`: load-or-convert resolution of a user-selected file
//! - `schema`: configuration types
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pixelstream::{
//!     container::storage,
//!     device::DeviceClient,
//!     playback::PlaybackSession,
//!     schema::{DeviceHost, StreamConfig},
//! };
//!
//! # async fn play() -> anyhow::Result<()> {
//! let config = StreamConfig::default();
//! let stream = Arc::new(storage::load("clip.mp4.pxlstrm")?);
//! let client = DeviceClient::new(DeviceHost::parse("http://192.168.1.170")?, &config)?;
//!
//! let session = PlaybackSession::new(stream, Arc::new(client), &config)?.quit_at_end(true);
//! let (_controls, rx) = tokio::sync::mpsc::unbounded_channel();
//! let summary = session.run(rx).await;
//! println!("Stopped at {:?}", summary.elapsed);
//! # Ok(())
//! # }
//! ```

pub mod container;
pub mod device;
pub mod generate;
pub mod playback;
pub mod schema;
pub mod source;

// Re-export commonly used types
pub use container::{Frame, Pixel, PixelStream};
pub use generate::Generator;
pub use playback::{Control, PlaybackSession, PlaybackSnapshot};
pub use schema::{DeviceHost, StreamConfig};
