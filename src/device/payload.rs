//! Wire payloads of the device HTTP API.

use serde::Serialize;

use super::DeviceError;
use crate::container::{Frame, GRID_HEIGHT, GRID_WIDTH, PIXEL_COUNT};

/// Largest valid packed `0xRRGGBB` value.
const MAX_PACKED: u64 = 0xFF_FFFF;

/// Body of `POST /api/notify`: draw one bitmap over the whole screen.
///
/// Serializes to `{"stack":false,"draw":[{"db":[0,0,32,8,[...]]}]}`.
#[derive(Debug, Clone, Serialize)]
pub struct NotifyPayload {
    stack: bool,
    draw: [DrawCommand; 1],
}

/// `db` = draw bitmap: `[x, y, width, height, pixels]`.
#[derive(Debug, Clone, Serialize)]
struct DrawCommand {
    db: (u8, u8, u8, u8, Vec<u32>),
}

impl NotifyPayload {
    pub fn for_frame(frame: &Frame) -> Self {
        Self {
            stack: false,
            draw: [DrawCommand {
                db: (0, 0, GRID_WIDTH as u8, GRID_HEIGHT as u8, frame.packed().to_vec()),
            }],
        }
    }
}

/// Parse the body of `GET /api/screen`.
///
/// Accepts a JSON array or a bracketed comma list of packed `0xRRGGBB`
/// integers. Pixels the device did not report stay black.
pub fn parse_screen(body: &str) -> Result<Frame, DeviceError> {
    let malformed = |reason: String| DeviceError::MalformedScreen { reason };

    let inner = body
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(body.trim());

    let mut values = Vec::with_capacity(PIXEL_COUNT);
    for token in inner.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let value: u64 = token
            .parse()
            .map_err(|_| malformed(format!("`{token}` is not a pixel value")))?;
        if value > MAX_PACKED {
            return Err(malformed(format!("{value} exceeds 24 bits")));
        }
        if values.len() == PIXEL_COUNT {
            return Err(malformed(format!("more than {PIXEL_COUNT} pixels")));
        }
        values.push(value as u32);
    }

    Ok(Frame::from_packed(&values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Pixel;

    #[test]
    fn test_notify_payload_shape() {
        let mut packed = [0u32; PIXEL_COUNT];
        packed[0] = 0xFF0000;
        packed[255] = 0x0000FF;
        let frame = Frame::from_packed(&packed);

        let json = serde_json::to_string(&NotifyPayload::for_frame(&frame)).unwrap();
        let zeros = vec!["0"; PIXEL_COUNT - 2].join(",");
        assert_eq!(
            json,
            format!(r#"{{"stack":false,"draw":[{{"db":[0,0,32,8,[16711680,{zeros},255]]}}]}}"#)
        );
    }

    #[test]
    fn test_parse_json_array() {
        let frame = parse_screen("[16711680, 65280,255]").unwrap();
        assert_eq!(frame.pixels()[0], Pixel::new(255, 0, 0));
        assert_eq!(frame.pixels()[1], Pixel::new(0, 255, 0));
        assert_eq!(frame.pixels()[2], Pixel::new(0, 0, 255));
        assert_eq!(frame.pixels()[3], Pixel::default());
    }

    #[test]
    fn test_parse_full_screen_roundtrip() {
        let packed: Vec<u32> = (0..PIXEL_COUNT as u32).map(|i| i * 0x010101).collect();
        let body = serde_json::to_string(&packed).unwrap();
        let frame = parse_screen(&body).unwrap();
        assert_eq!(frame.packed().to_vec(), packed);
    }

    #[test]
    fn test_parse_empty_and_bare_lists() {
        assert_eq!(parse_screen("[]").unwrap(), Frame::black());
        assert_eq!(parse_screen("  \n").unwrap(), Frame::black());
        assert_eq!(parse_screen("1,2").unwrap().packed()[1], 2);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        for body in ["[16777216]", "[-1]", "[abc]", "[1.5]"] {
            assert!(
                matches!(parse_screen(body), Err(DeviceError::MalformedScreen { .. })),
                "{body} should be rejected"
            );
        }

        let too_many = serde_json::to_string(&vec![0u32; PIXEL_COUNT + 1]).unwrap();
        assert!(parse_screen(&too_many).is_err());
    }
}
