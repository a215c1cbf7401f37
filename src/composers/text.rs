//! Fixed labels and formatted local time.

use std::fmt::Write as _;

use embedded_graphics::{prelude::*, primitives::Rectangle};

use super::{baseline_for, left_for, HAlign, RenderContext, VAlign};
use crate::canvas::Canvas;
use crate::style::{Style, DEFAULT_FONT_SIZE};

/// Gap kept between the time text and the binding edge.
const TIME_MARGIN: i32 = 8;

/// Fixed label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextComposer {
    pub text: String,
    pub halign: HAlign,
    pub valign: VAlign,
    pub size: u32,
}

impl TextComposer {
    pub fn new(text: impl Into<String>, halign: HAlign, valign: VAlign) -> Self {
        Self {
            text: text.into(),
            halign,
            valign,
            size: DEFAULT_FONT_SIZE,
        }
    }

    pub(super) fn draw(&self, surface: &mut Canvas, clip: Rectangle, style: &Style) {
        if self.text.is_empty() {
            return;
        }
        let font = style.font(self.size);
        let (width, height) = (surface.width(), surface.height());
        let x = left_for(&font, &self.text, self.halign, width, clip.top_left.x);
        let y = baseline_for(&font, self.valign, height, clip);

        let mut target = surface.clipped(&clip);
        font.draw(&mut target, &self.text, x, y, style.color());
    }
}

/// Render time formatted with a strftime pattern, sized to fill the binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeComposer {
    pub format: String,
    pub halign: HAlign,
    pub valign: VAlign,
}

impl TimeComposer {
    pub fn new(format: impl Into<String>, halign: HAlign, valign: VAlign) -> Self {
        Self {
            format: format.into(),
            halign,
            valign,
        }
    }

    /// Text for the given context, or `None` if the pattern is unusable.
    pub fn text(&self, ctx: &RenderContext) -> Option<String> {
        let mut text = String::new();
        write!(text, "{}", ctx.local_time.format(&self.format)).ok()?;
        Some(text)
    }

    pub(super) fn draw(&self, surface: &mut Canvas, clip: Rectangle, style: &Style, ctx: &RenderContext) {
        let Some(text) = self.text(ctx) else {
            return;
        };
        if text.is_empty() {
            return;
        }
        let (width, height) = (surface.width(), surface.height());
        let size = height.saturating_sub(2 * TIME_MARGIN as u32).max(1);
        let font = style.font(size);
        let x = left_for(&font, &text, self.halign, width, TIME_MARGIN * 3 / 2);
        let y = baseline_for(&font, self.valign, height, clip);

        font.draw(surface, &text, x, y, style.color());
    }
}
