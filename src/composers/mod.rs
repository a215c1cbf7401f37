//! # Composers
//!
//! A composer draws one visual element into the sub-surface allocated for its
//! binding. It never knows where that surface lands on the panel: every
//! coordinate is relative to the sub-surface, and the clip box passed in is
//! the sub-surface minus its margin.
//!
//! The set of variants is closed and known when configs are parsed, so
//! dispatch is a plain `match` over [`Composer`].
//!
//! Composers never fail. Bad input (an unusable time format, a missing event
//! directory, no battery reading) simply leaves that element blank.

mod battery;
mod events;
mod line;
mod rectangle;
mod text;

use chrono::DateTime;
use chrono_tz::Tz;
use embedded_graphics::{pixelcolor::Rgb888, primitives::Rectangle};

use crate::canvas::Canvas;
use crate::style::{Font, Style};
use crate::telemetry::{BatteryLevel, WirelessLevel};

pub use battery::BatteryComposer;
pub use events::EventsComposer;
pub use line::LineComposer;
pub use rectangle::RectangleComposer;
pub use text::{TextComposer, TimeComposer};

/// Horizontal placement inside the clip box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical placement inside the clip box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Read-only inputs for one composer call.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext {
    /// Render instant in the display's time zone, binding offset applied
    pub local_time: DateTime<Tz>,
    pub battery: BatteryLevel,
    pub wireless: WirelessLevel,
}

#[derive(Clone, Debug)]
pub enum Composer {
    Rectangle(RectangleComposer),
    Line(LineComposer),
    Text(TextComposer),
    Time(TimeComposer),
    Battery(BatteryComposer),
    Events(EventsComposer),
}

impl Composer {
    /// Config tag of this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Composer::Rectangle(_) => "Rectangle",
            Composer::Line(_) => "Line",
            Composer::Text(_) => "Text",
            Composer::Time(_) => "Time",
            Composer::Battery(_) => "Battery",
            Composer::Events(_) => "Events",
        }
    }

    pub fn draw(&self, surface: &mut Canvas, clip: Rectangle, style: &Style, ctx: &RenderContext) {
        match self {
            Composer::Rectangle(c) => c.draw(surface, style),
            Composer::Line(c) => c.draw(surface, style),
            Composer::Text(c) => c.draw(surface, clip, style),
            Composer::Time(c) => c.draw(surface, clip, style, ctx),
            Composer::Battery(c) => c.draw(surface, clip, style, ctx),
            Composer::Events(c) => c.draw(surface, clip, style, ctx),
        }
    }
}

/// Baseline for a line of text in `font`.
///
/// Top and bottom hug the clip box; middle centres on the whole surface.
pub(crate) fn baseline_for(font: &Font, valign: VAlign, surface_height: u32, clip: Rectangle) -> i32 {
    match valign {
        VAlign::Top => clip.top_left.y + font.ascent(),
        VAlign::Bottom => clip.top_left.y + clip.size.height as i32 - font.descent(),
        VAlign::Middle => surface_height as i32 / 2 + (font.ascent() - font.descent()) / 2,
    }
}

/// Left edge for `text` placed `margin` pixels in from the surface sides.
pub(crate) fn left_for(font: &Font, text: &str, halign: HAlign, surface_width: u32, margin: i32) -> i32 {
    let width = font.measure(text) as i32;
    match halign {
        HAlign::Left => margin,
        HAlign::Right => surface_width as i32 - margin - width,
        HAlign::Center => surface_width as i32 / 2 - width / 2,
    }
}

/// Foreground and background for a binding.
pub(crate) fn ink(inverted: bool) -> (Rgb888, Rgb888) {
    use embedded_graphics::pixelcolor::RgbColor;
    if inverted {
        (Rgb888::WHITE, Rgb888::BLACK)
    } else {
        (Rgb888::BLACK, Rgb888::WHITE)
    }
}
