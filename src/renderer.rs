//! # ASCII Preview
//!
//! Development mode: prints a rendered canvas to the terminal so layouts can
//! be checked without a device. Each character stands for a block of pixels
//! twice as tall as it is wide, roughly matching a terminal cell:
//!
//! - `#` mostly dark
//! - `.` some dark pixels
//! - ` ` light

use crate::bmp::is_white;
use crate::canvas::Canvas;

/// Preview width used when the terminal size is unknown.
pub const DEFAULT_COLUMNS: u32 = 100;

/// Preview lines for `canvas`, at most `columns` characters wide.
pub fn ascii_lines(canvas: &Canvas, columns: u32) -> Vec<String> {
    let block_w = canvas.width().div_ceil(columns.max(1)).max(1);
    let block_h = block_w * 2;

    (0..canvas.height())
        .step_by(block_h as usize)
        .map(|top| {
            (0..canvas.width())
                .step_by(block_w as usize)
                .map(|left| shade(canvas, left, top, block_w, block_h))
                .collect()
        })
        .collect()
}

fn shade(canvas: &Canvas, left: u32, top: u32, block_w: u32, block_h: u32) -> char {
    let mut total = 0;
    let mut dark = 0;
    for y in top..(top + block_h).min(canvas.height()) {
        for x in left..(left + block_w).min(canvas.width()) {
            total += 1;
            if canvas.pixel(x, y).is_some_and(|color| !is_white(color)) {
                dark += 1;
            }
        }
    }
    match dark {
        0 => ' ',
        d if d * 2 >= total => '#',
        _ => '.',
    }
}

/// Print the preview framed by a border.
pub fn draw_ascii(canvas: &Canvas, columns: u32) {
    let lines = ascii_lines(canvas, columns);
    let width = lines.first().map_or(0, |line| line.chars().count());
    let rule = format!("+{}+", "-".repeat(width));

    println!("{rule}");
    for line in lines {
        println!("|{line}|");
    }
    println!("{rule}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::{
        pixelcolor::Rgb888,
        prelude::*,
        primitives::{PrimitiveStyle, Rectangle},
    };

    #[test]
    fn test_blank_canvas_is_spaces() {
        let canvas = Canvas::new(40, 20, Rgb888::WHITE);
        let lines = ascii_lines(&canvas, 40);
        assert_eq!(lines.len(), 10);
        assert!(lines.iter().all(|line| line == &" ".repeat(40)));
    }

    #[test]
    fn test_downsampled_shading() {
        let mut canvas = Canvas::new(80, 40, Rgb888::WHITE);
        // left half dark
        Rectangle::new(Point::zero(), Size::new(40, 40))
            .into_styled(PrimitiveStyle::with_fill(Rgb888::BLACK))
            .draw(&mut canvas)
            .unwrap();
        // a single dark pixel in the right half
        Pixel(Point::new(70, 30), Rgb888::BLACK).draw(&mut canvas).unwrap();

        let lines = ascii_lines(&canvas, 20);
        // 4 px wide, 8 px tall blocks
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], format!("{}{}", "#".repeat(10), " ".repeat(10)));
        assert_eq!(lines[3].chars().nth(17), Some('.'));
    }

    #[test]
    fn test_draw_ascii_smoke() {
        let canvas = Canvas::new(800, 480, Rgb888::WHITE);
        draw_ascii(&canvas, DEFAULT_COLUMNS);
    }
}
