//! Filled or outlined rectangle covering the whole sub-surface.

use embedded_graphics::{
    prelude::*,
    primitives::{PrimitiveStyleBuilder, Rectangle, StrokeAlignment},
};

use crate::canvas::Canvas;
use crate::style::Style;

/// Solid block or outline covering the whole binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RectangleComposer {
    pub filled: bool,
    pub thickness: u32,
}

impl RectangleComposer {
    pub fn filled() -> Self {
        Self {
            filled: true,
            thickness: 1,
        }
    }

    pub fn outline(thickness: u32) -> Self {
        Self {
            filled: false,
            thickness,
        }
    }

    pub(super) fn draw(&self, surface: &mut Canvas, style: &Style) {
        if self.filled {
            surface.clear(style.color()).ok();
            return;
        }
        if self.thickness == 0 {
            return;
        }
        let outline = PrimitiveStyleBuilder::new()
            .stroke_color(style.color())
            .stroke_width(self.thickness)
            .stroke_alignment(StrokeAlignment::Inside)
            .build();
        Rectangle::new(Point::zero(), surface.size())
            .into_styled(outline)
            .draw(surface)
            .ok();
    }
}
