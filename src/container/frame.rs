//! Fixed-layout frame type and its byte encoding.

use bytemuck::{Pod, Zeroable};

use super::format::FormatError;

/// Width of the LED grid in pixels.
pub const GRID_WIDTH: usize = 32;

/// Height of the LED grid in pixels.
pub const GRID_HEIGHT: usize = 8;

/// Number of pixels in one frame.
pub const PIXEL_COUNT: usize = GRID_WIDTH * GRID_HEIGHT;

/// Size of one encoded frame in bytes (3 bytes per pixel).
pub const FRAME_SIZE: usize = PIXEL_COUNT * 3;

/// A single RGB pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pack into a 24-bit `0xRRGGBB` integer as used by the device API.
    #[inline]
    pub fn pack(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Unpack a `0xRRGGBB` integer. Bits above 24 are ignored.
    #[inline]
    pub fn unpack(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        }
    }
}

/// One 32x8 frame, pixels stored row-major from the top-left corner.
///
/// The in-memory layout is exactly the on-disk layout, so encoding is a
/// byte view and decoding is a single unaligned read.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Frame {
    pixels: [Pixel; PIXEL_COUNT],
}

impl Frame {
    /// An all-black frame.
    pub fn black() -> Self {
        Zeroable::zeroed()
    }

    pub fn from_pixels(pixels: [Pixel; PIXEL_COUNT]) -> Self {
        Self { pixels }
    }

    /// Build a frame from packed `0xRRGGBB` values.
    ///
    /// Fewer than [`PIXEL_COUNT`] values leave the remaining pixels black;
    /// extra values are ignored.
    pub fn from_packed(values: &[u32]) -> Self {
        let mut frame = Self::black();
        for (pixel, &value) in frame.pixels.iter_mut().zip(values) {
            *pixel = Pixel::unpack(value);
        }
        frame
    }

    pub fn pixels(&self) -> &[Pixel; PIXEL_COUNT] {
        &self.pixels
    }

    /// Pixel at column `x`, row `y`, or `None` outside the grid.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Pixel> {
        if x >= GRID_WIDTH || y >= GRID_HEIGHT {
            return None;
        }
        Some(self.pixels[y * GRID_WIDTH + x])
    }

    /// All pixels packed as `0xRRGGBB`, in index order.
    pub fn packed(&self) -> [u32; PIXEL_COUNT] {
        self.pixels.map(Pixel::pack)
    }

    /// Encoded frame bytes: `R, G, B` for each pixel in index order.
    pub fn encode(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decode exactly [`FRAME_SIZE`] bytes into a frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() != FRAME_SIZE {
            return Err(FormatError::CorruptFormat {
                reason: format!(
                    "frame size mismatch: {} bytes, expected {}",
                    bytes.len(),
                    FRAME_SIZE
                ),
            });
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::black()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 256 pixels is too noisy for assertion output
        let lit = self.pixels.iter().filter(|p| **p != Pixel::default()).count();
        f.debug_struct("Frame")
            .field("first", &self.pixels[0])
            .field("lit_pixels", &lit)
            .finish()
    }
}
