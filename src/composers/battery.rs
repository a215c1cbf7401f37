//! Battery indicator.
//!
//! Draws a 7x13 battery glyph pixel by pixel: an outline filled one row per
//! started 10%, a broken outline with an exclamation mark at 0%, or a bolt
//! while charging. Left or right alignment adds a text label beside it.

use embedded_graphics::{prelude::*, primitives::Rectangle};

use super::{HAlign, RenderContext};
use crate::canvas::Canvas;
use crate::style::Style;

/// Label font size.
const LABEL_SIZE: u32 = 16;
/// Horizontal room reserved for the icon next to the label.
const ICON_SLOT: i32 = 8;

/// Battery icon, 7 px wide, rows 1..=13 below the icon top. `#` is ink.
///
/// Outline shared by every non-empty level; the fill is added on top.
const OUTLINE: [&str; 13] = [
    "..###..",
    "#######",
    "#.....#",
    "#.....#",
    "#.....#",
    "#.....#",
    "#.....#",
    "#.....#",
    "#.....#",
    "#.....#",
    "#.....#",
    "#.....#",
    "#######",
];

/// Flat battery: broken outline with an exclamation mark.
const EMPTY: [&str; 13] = [
    "..###..",
    "#######",
    "#.....#",
    "#.....#",
    "#..#..#",
    "...#...",
    "...#...",
    "...#...",
    ".......",
    "#..#..#",
    "#.....#",
    "#.....#",
    "#######",
];

/// External power: full battery with a lightning bolt cut out of the fill.
const CHARGING: [&str; 13] = [
    "..###..",
    "#######",
    "#######",
    "####.##",
    "###.###",
    "##..###",
    "##...##",
    "###..##",
    "###.###",
    "##.####",
    "#######",
    "#######",
    "#######",
];

/// Battery indicator, optionally followed by a percentage label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatteryComposer {
    /// Only draw while the percentage is below this value
    pub show_below: u8,
    pub halign: HAlign,
}

impl BatteryComposer {
    pub fn new(show_below: u8, halign: HAlign) -> Self {
        Self { show_below, halign }
    }

    pub(super) fn draw(&self, surface: &mut Canvas, clip: Rectangle, style: &Style, ctx: &RenderContext) {
        let battery = ctx.battery;
        let (glyph, rows, label) = if battery.charging {
            (&CHARGING, 0, "Charging".to_string())
        } else {
            let Some(percentage) = battery.percentage else {
                return;
            };
            if percentage >= self.show_below {
                return;
            }
            if percentage == 0 {
                (&EMPTY, 0, "0%".to_string())
            } else {
                (&OUTLINE, fill_rows(percentage), format!("{percentage}%"))
            }
        };

        let (width, height) = (surface.width() as i32, surface.height() as i32);
        let top = height / 2 - 8;
        let left = match self.halign {
            HAlign::Left => 0,
            HAlign::Right => width - 8,
            HAlign::Center => width / 2 - 4,
        };
        draw_icon(surface, glyph, rows, left, top, style);

        if self.halign == HAlign::Center {
            return;
        }
        let font = style.font(LABEL_SIZE);
        let margin = clip.top_left.x / 2;
        let baseline = height / 2 + (font.ascent() - font.descent()) / 2;
        let x = match self.halign {
            HAlign::Right => width - ICON_SLOT - margin - font.measure(&label) as i32,
            _ => ICON_SLOT + margin,
        };
        let mut target = surface.clipped(&clip);
        font.draw(&mut target, &label, x, baseline, style.color());
    }
}

/// Number of filled rows for a percentage in `1..=100`.
fn fill_rows(percentage: u8) -> i32 {
    (i32::from(percentage) + 9) / 10
}

fn draw_icon(
    surface: &mut Canvas,
    glyph: &[&str; 13],
    fill_rows: i32,
    left: i32,
    top: i32,
    style: &Style,
) {
    let color = style.color();
    let outline = glyph.iter().enumerate().flat_map(|(row, line)| {
        line.bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'#')
            .map(move |(col, _)| Point::new(col as i32, row as i32 + 1))
    });
    // fill occupies rows 13 - fill_rows ..= 12, columns 1..=5
    let fill = (13 - fill_rows..=12).flat_map(|row| (1..=5).map(move |col| Point::new(col, row)));

    let pixels = outline
        .chain(fill)
        .map(|p| Pixel(Point::new(left, top) + p, color));
    surface.draw_iter(pixels).ok();
}
