//! # Compositor
//!
//! Turns a [`DisplayDefinition`] and a render instant into the bitmap a
//! device shows. Each binding gets its own sub-surface the size of its
//! rectangle, pre-filled with the binding's background; the composer draws
//! into it and the result is copied opaquely onto the panel canvas. Later
//! bindings paint over earlier ones where rectangles overlap.
//!
//! Rendering is a pure function of its inputs: the same definition, instant
//! and readings always produce the same bytes.

use chrono::{DateTime, Utc};
use embedded_graphics::{
    prelude::{Point, Size},
    primitives::Rectangle,
};
use thiserror::Error;
use tracing::trace;

use crate::bmp::EncodeError;
use crate::canvas::Canvas;
use crate::composers::{ink, RenderContext};
use crate::display::DisplayDefinition;
use crate::style::{Style, StyleError, DEFAULT_FAMILY};
use crate::telemetry::DeviceTelemetry;

/// Inset applied on each side of a binding before its composer draws.
pub const MARGIN: u32 = 4;
/// Bindings narrower (or shorter) than this get no margin in that direction.
const MARGIN_MIN_EXTENT: u32 = 16;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot encode image: {0}")]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Style(#[from] StyleError),
}

/// Render `definition` at `instant` and encode it as a 1-bit bitmap.
///
/// `readings` are the battery and wireless values of the device the image
/// is for.
pub fn render(
    definition: &DisplayDefinition,
    instant: DateTime<Utc>,
    readings: &DeviceTelemetry,
) -> Result<Vec<u8>, RenderError> {
    let canvas = compose(definition, instant, readings)?;
    Ok(canvas.to_bmp()?)
}

/// Draw every binding onto a fresh canvas without encoding it.
pub fn compose(
    definition: &DisplayDefinition,
    instant: DateTime<Utc>,
    readings: &DeviceTelemetry,
) -> Result<Canvas, RenderError> {
    let local_time = instant.with_timezone(&definition.time_zone());
    let (_, background) = ink(definition.inverted());
    let mut canvas = Canvas::new(definition.width(), definition.height(), background);

    for binding in definition.bindings() {
        let (width, height) = (binding.rect.width(), binding.rect.height());
        let (foreground, background) = ink(definition.inverted() != binding.inverted);
        let style = Style::resolve(foreground, DEFAULT_FAMILY)?;

        let mut surface = Canvas::new(width, height, background);
        let ctx = RenderContext {
            local_time: local_time
                .checked_add_signed(binding.offset)
                .unwrap_or(local_time),
            battery: readings.battery,
            wireless: readings.wireless,
        };
        binding
            .composer
            .draw(&mut surface, inner_rect(width, height), &style, &ctx);
        canvas.blit(&surface, binding.rect.origin());

        trace!(
            device = %definition.device_id(),
            section = %binding.label,
            kind = binding.composer.kind(),
            "composed binding"
        );
    }
    Ok(canvas)
}

/// Clip box for a `width × height` sub-surface.
fn inner_rect(width: u32, height: u32) -> Rectangle {
    let inset = |extent: u32| if extent >= MARGIN_MIN_EXTENT { MARGIN } else { 0 };
    let (dx, dy) = (inset(width), inset(height));
    Rectangle::new(
        Point::new(dx as i32, dy as i32),
        Size::new(width - 2 * dx, height - 2 * dy),
    )
}
