//! Diagonal separator from the top-left to the bottom-right corner.

use embedded_graphics::{
    prelude::*,
    primitives::{Line, PrimitiveStyle},
};

use crate::canvas::Canvas;
use crate::style::Style;

/// Diagonal separator from the top-left to the bottom-right corner.
///
/// A binding one pixel tall (or wide) turns this into a plain rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineComposer {
    pub thickness: u32,
}

impl LineComposer {
    pub fn new(thickness: u32) -> Self {
        Self { thickness }
    }

    pub(super) fn draw(&self, surface: &mut Canvas, style: &Style) {
        if self.thickness == 0 {
            return;
        }
        let end = Point::new(surface.width() as i32 - 1, surface.height() as i32 - 1);
        Line::new(Point::zero(), end)
            .into_styled(PrimitiveStyle::with_stroke(style.color(), self.thickness))
            .draw(surface)
            .ok();
    }
}
