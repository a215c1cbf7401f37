//! In-memory RGB drawing surface.
//!
//! One canvas is allocated per render and one smaller canvas per composer
//! binding; both implement `DrawTarget` so the embedded-graphics primitives
//! and the font handles in [`crate::style`] can draw straight into them.

use core::convert::Infallible;

use embedded_graphics::{pixelcolor::Rgb888, prelude::*};

/// Mutable `width × height` pixel buffer, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgb888>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb888) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at `(x, y)`; `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Opaquely copy `source` onto this canvas with its top-left at `origin`.
    ///
    /// Pixels that fall outside this canvas are dropped.
    pub fn blit(&mut self, source: &Canvas, origin: Point) {
        for sy in 0..source.height {
            let ty = origin.y + sy as i32;
            if ty < 0 || ty >= self.height as i32 {
                continue;
            }
            for sx in 0..source.width {
                let tx = origin.x + sx as i32;
                if tx < 0 || tx >= self.width as i32 {
                    continue;
                }
                let src = source.pixels[(sy * source.width + sx) as usize];
                self.pixels[(ty as u32 * self.width + tx as u32) as usize] = src;
            }
        }
    }

    /// Encode as the 1-bit bitmap the devices expect.
    pub fn to_bmp(&self) -> Result<Vec<u8>, crate::bmp::EncodeError> {
        crate::bmp::encode(self.width, self.height, |x, y| self.pixels[(y * self.width + x) as usize])
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x < self.width && y < self.height {
                self.pixels[(y * self.width + x) as usize] = color;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.pixels.fill(color);
        Ok(())
    }
}
