//! Pixel stream container: frames, binary format, and storage.
//!
//! # File Format
//!
//! The `.pxlstrm` format stores fixed-size 32x8 RGB frames back to back:
//!
//! ```text
//! Header (9 bytes):
//!   Identifier: "PXLSTRM" (7 bytes)
//!   Version: u8 (currently 1)
//!   Frame rate: u8 (frames per second, 1-255)
//!
//! Frame data (frame_count * 768 bytes):
//!   Each frame is 256 pixels * 3 bytes (R, G, B), row-major
//! ```
//!
//! There is no frame count or index table; frame boundaries follow from the
//! fixed frame size.

mod format;
mod frame;
pub mod storage;

pub use format::{FORMAT_IDENTIFIER, FORMAT_VERSION, FormatError, HEADER_SIZE, PixelStream};
pub use frame::{FRAME_SIZE, Frame, GRID_HEIGHT, GRID_WIDTH, PIXEL_COUNT, Pixel};
