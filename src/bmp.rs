//! # 1-bit Bitmap Encoder
//!
//! Produces the uncompressed two-colour Windows bitmap consumed by the device
//! firmware. The layout is fixed and byte-exact:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0      | 14   | File header: `BM`, file size, pixel offset 62 |
//! | 14     | 40   | Info header: size 40, width, height, 1 plane, 1 bpp, no compression, image size, 2 colours |
//! | 54     | 8    | Palette: index 0 black, index 1 white |
//! | 62     | ...  | Rows bottom-to-top, each padded to 4 bytes, MSB = leftmost pixel |
//!
//! A pixel becomes a set bit (white) when its luminance
//! `0.299 R + 0.587 G + 0.114 B` is at least 128.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use thiserror::Error;

const FILE_HEADER_LEN: usize = 14;
const INFO_HEADER_LEN: usize = 40;
const PALETTE_LEN: usize = 8;
/// Offset of the first pixel row.
pub const PIXEL_OFFSET: usize = FILE_HEADER_LEN + INFO_HEADER_LEN + PALETTE_LEN;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("image {width}x{height} does not fit a bitmap file")]
    TooLarge { width: u32, height: u32 },
}

/// Bytes per pixel row, padded to a 32-bit boundary.
pub fn row_size(width: u32) -> usize {
    (width as usize).div_ceil(32) * 4
}

/// Whether a pixel is classified as white.
pub fn is_white(color: Rgb888) -> bool {
    let gray =
        0.299 * f64::from(color.r()) + 0.587 * f64::from(color.g()) + 0.114 * f64::from(color.b());
    gray >= 128.0
}

/// Encode `width × height` pixels, read through `pixel(x, y)`, as a 1-bit bitmap.
pub fn encode<F>(width: u32, height: u32, pixel: F) -> Result<Vec<u8>, EncodeError>
where
    F: Fn(u32, u32) -> Rgb888,
{
    if width == 0 || height == 0 {
        return Err(EncodeError::EmptyImage { width, height });
    }
    if width > i32::MAX as u32 || height > i32::MAX as u32 {
        return Err(EncodeError::TooLarge { width, height });
    }

    let row = row_size(width);
    let image_size = row
        .checked_mul(height as usize)
        .filter(|size| *size <= u32::MAX as usize - PIXEL_OFFSET)
        .ok_or(EncodeError::TooLarge { width, height })?;
    let file_size = PIXEL_OFFSET + image_size;

    let mut buffer = vec![0u8; file_size];

    // file header
    buffer[0..2].copy_from_slice(b"BM");
    put_u32(&mut buffer, 2, file_size as u32);
    put_u32(&mut buffer, 10, PIXEL_OFFSET as u32);

    // info header
    put_u32(&mut buffer, 14, INFO_HEADER_LEN as u32);
    put_u32(&mut buffer, 18, width);
    put_u32(&mut buffer, 22, height);
    put_u16(&mut buffer, 26, 1); // planes
    put_u16(&mut buffer, 28, 1); // bits per pixel
    put_u32(&mut buffer, 30, 0); // BI_RGB
    put_u32(&mut buffer, 34, image_size as u32);
    put_u32(&mut buffer, 46, 2); // colours used

    // palette: black stays zeroed at 54..58
    buffer[58..61].copy_from_slice(&[255, 255, 255]);

    let mut offset = PIXEL_OFFSET;
    for y in (0..height).rev() {
        for x in 0..width {
            if is_white(pixel(x, y)) {
                buffer[offset + (x / 8) as usize] |= 0x80 >> (x % 8);
            }
        }
        offset += row;
    }

    Ok(buffer)
}

fn put_u16(buffer: &mut [u8], at: usize, value: u16) {
    buffer[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buffer: &mut [u8], at: usize, value: u32) {
    buffer[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(800, 480, |_, _| Rgb888::WHITE).unwrap();

        assert_eq!(&bytes[0..2], b"BM");
        assert_eq!(u32_at(&bytes, 2) as usize, bytes.len());
        assert_eq!(bytes.len(), 62 + 100 * 480);
        assert_eq!(u32_at(&bytes, 10), 62);
        assert_eq!(u32_at(&bytes, 14), 40);
        assert_eq!(u32_at(&bytes, 18), 800);
        assert_eq!(u32_at(&bytes, 22), 480);
        assert_eq!(&bytes[26..30], &[1, 0, 1, 0]);
        assert_eq!(u32_at(&bytes, 30), 0);
        assert_eq!(u32_at(&bytes, 34), 100 * 480);
        assert_eq!(u32_at(&bytes, 46), 2);
        assert_eq!(&bytes[54..62], &[0, 0, 0, 0, 255, 255, 255, 0]);
    }

    #[test]
    fn test_row_sizes() {
        assert_eq!(row_size(1), 4);
        assert_eq!(row_size(32), 4);
        assert_eq!(row_size(33), 8);
        assert_eq!(row_size(800), 100);
        assert_eq!(row_size(122), 16);
    }

    #[test]
    fn test_white_sets_every_pixel_bit() {
        let width = 37;
        let bytes = encode(width, 3, |_, _| Rgb888::WHITE).unwrap();
        for row in bytes[PIXEL_OFFSET..].chunks(row_size(width)) {
            assert_eq!(&row[..4], &[0xFF; 4]);
            // 5 trailing pixels, the rest is padding
            assert_eq!(row[4], 0b1111_1000);
            assert_eq!(&row[5..], &[0, 0, 0]);
        }
    }

    #[test]
    fn test_black_clears_every_bit() {
        let bytes = encode(64, 2, |_, _| Rgb888::BLACK).unwrap();
        assert!(bytes[PIXEL_OFFSET..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rows_are_bottom_up_msb_first() {
        // single white pixel at top-left
        let bytes = encode(16, 2, |x, y| {
            if x == 0 && y == 0 {
                Rgb888::WHITE
            } else {
                Rgb888::BLACK
            }
        })
        .unwrap();
        let row = row_size(16);
        assert_eq!(bytes[PIXEL_OFFSET], 0);
        assert_eq!(bytes[PIXEL_OFFSET + row], 0x80);
    }

    #[test]
    fn test_luminance_threshold() {
        assert!(is_white(Rgb888::new(130, 130, 130)));
        assert!(!is_white(Rgb888::new(127, 127, 127)));
        assert!(!is_white(Rgb888::new(255, 0, 0)));
        assert!(is_white(Rgb888::new(0, 255, 0)));
    }

    #[test]
    fn test_empty_image_rejected() {
        assert_eq!(
            encode(0, 10, |_, _| Rgb888::WHITE),
            Err(EncodeError::EmptyImage {
                width: 0,
                height: 10
            })
        );
    }
}
