//! # Events List
//!
//! Lists the entries the [`crate::calendar`] source yields for the rendered
//! date. Each key is printed once in bold, followed by its values in the
//! regular face; groups are separated by the clip box's top margin. Drawing
//! stops at the bottom of the clip box.

use std::path::PathBuf;

use embedded_graphics::{prelude::*, primitives::Rectangle};

use super::RenderContext;
use crate::calendar::EventSource;
use crate::canvas::Canvas;
use crate::style::{Style, DEFAULT_FONT_SIZE};

/// Today's calendar entries as a list: each key once as a bold header,
/// followed by its values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventsComposer {
    pub directory: PathBuf,
}

impl EventsComposer {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub(super) fn draw(&self, surface: &mut Canvas, clip: Rectangle, style: &Style, ctx: &RenderContext) {
        let header = style.bold_font(DEFAULT_FONT_SIZE);
        let body = style.font(DEFAULT_FONT_SIZE);
        let left = clip.top_left.x;
        let bottom = clip.top_left.y + clip.size.height as i32;
        let color = style.color();

        let mut target = surface.clipped(&clip);
        let mut y = clip.top_left.y + header.ascent();
        let mut last_key: Option<String> = None;
        let mut last_value: Option<String> = None;

        let source = EventSource::new(&self.directory);
        for (key, value) in source.entries(ctx.local_time.date_naive()) {
            if last_key.as_deref() != Some(key.as_str()) {
                if last_key.is_some() {
                    y += clip.top_left.y;
                }
                if y - header.ascent() >= bottom {
                    break;
                }
                header.draw(&mut target, &key, left, y, color);
                y += header.line_height() as i32;
                last_key = Some(key);
                last_value = None;
            }

            if last_value.as_deref() == Some(value.as_str()) {
                continue;
            }
            if y - body.ascent() >= bottom {
                break;
            }
            body.draw(&mut target, &value, left, y, color);
            y += body.line_height() as i32;
            last_value = Some(value);
        }
    }
}
