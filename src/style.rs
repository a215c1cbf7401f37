//! # Style Resolution
//!
//! Maps a font family name to its regular, bold and italic faces and hands
//! out [`Font`] handles at a requested pixel size. Faces are the bitmap
//! fonts bundled with embedded-graphics (Latin-1 coverage). A size larger
//! than the biggest face of a family is served by drawing a smaller face at
//! an integer scale factor, so large clock digits stay crisp on a 1-bit
//! panel.
//!
//! ## Families
//! - `Fixed` (default): 6 to 20 px faces, bold 13 to 18 px, italic 13 px
//! - `Fixed Narrow`: condensed 6 to 13 px faces
//!
//! Glyph edges are never smoothed: every drawn pixel is either foreground or
//! untouched, which is what the 1-bit encoder expects.

use embedded_graphics::{
    mono_font::{iso_8859_1 as faces, MonoFont, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::Rectangle,
    text::{Baseline, Text},
};
use thiserror::Error;

/// Family used for every composer binding.
pub const DEFAULT_FAMILY: &str = "Fixed";

/// Size used when a composer does not ask for one.
pub const DEFAULT_FONT_SIZE: u32 = 20;

/// Largest integer scale tried when synthesising big sizes.
const MAX_SCALE: u32 = 12;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StyleError {
    #[error("font family '{0}' not found")]
    FamilyNotFound(String),
}

type Ladder = &'static [&'static MonoFont<'static>];

/// One named family; each ladder is ordered by ascending glyph height.
#[derive(Debug)]
struct Family {
    name: &'static str,
    normal: Ladder,
    bold: Ladder,
    italic: Ladder,
}

static FAMILIES: &[Family] = &[
    Family {
        name: "Fixed",
        normal: &[
            &faces::FONT_4X6,
            &faces::FONT_5X8,
            &faces::FONT_6X10,
            &faces::FONT_6X13,
            &faces::FONT_7X14,
            &faces::FONT_9X15,
            &faces::FONT_9X18,
            &faces::FONT_10X20,
        ],
        bold: &[
            &faces::FONT_6X13_BOLD,
            &faces::FONT_7X14_BOLD,
            &faces::FONT_9X15_BOLD,
            &faces::FONT_9X18_BOLD,
        ],
        italic: &[&faces::FONT_7X13_ITALIC],
    },
    Family {
        name: "Fixed Narrow",
        normal: &[
            &faces::FONT_4X6,
            &faces::FONT_5X7,
            &faces::FONT_6X9,
            &faces::FONT_6X12,
            &faces::FONT_6X13,
        ],
        bold: &[&faces::FONT_6X13_BOLD],
        italic: &[&faces::FONT_6X13_ITALIC],
    },
];

/// Foreground colour plus a resolved font family.
#[derive(Clone, Copy, Debug)]
pub struct Style {
    color: Rgb888,
    family: &'static Family,
}

impl Style {
    /// Resolve a family by name (case-insensitive).
    pub fn resolve(color: Rgb888, family: &str) -> Result<Self, StyleError> {
        FAMILIES
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(family))
            .map(|family| Self { color, family })
            .ok_or_else(|| StyleError::FamilyNotFound(family.to_string()))
    }

    pub fn color(&self) -> Rgb888 {
        self.color
    }

    pub fn family_name(&self) -> &'static str {
        self.family.name
    }

    pub fn font(&self, size: u32) -> Font {
        Font::pick(self.family.normal, size)
    }

    pub fn bold_font(&self, size: u32) -> Font {
        Font::pick(self.family.bold, size)
    }

    pub fn italic_font(&self, size: u32) -> Font {
        Font::pick(self.family.italic, size)
    }
}

/// A face drawn at an integer scale.
///
/// Metrics follow the usual typographic convention: text is positioned by
/// its baseline, `ascent` extends above it and `descent` below it, both as
/// positive pixel counts.
#[derive(Clone, Copy, Debug)]
pub struct Font {
    face: &'static MonoFont<'static>,
    scale: u32,
}

impl Font {
    /// Pick the tallest face that fits `size` at the smallest scale able to
    /// reach it, stepping the scale down when no face fits. Falls back to the
    /// smallest face when nothing fits at all.
    fn pick(ladder: Ladder, size: u32) -> Self {
        let tallest = ladder
            .iter()
            .map(|face| face.character_size.height)
            .max()
            .unwrap_or(1);
        let first = size.div_ceil(tallest).clamp(1, MAX_SCALE);

        (1..=first)
            .rev()
            .find_map(|scale| {
                ladder
                    .iter()
                    .copied()
                    .filter(|face| face.character_size.height * scale <= size)
                    .max_by_key(|face| face.character_size.height)
                    .map(|face| Self { face, scale })
            })
            .unwrap_or(Self {
                face: ladder[0],
                scale: 1,
            })
    }

    pub fn ascent(&self) -> i32 {
        (self.face.baseline * self.scale) as i32
    }

    pub fn descent(&self) -> i32 {
        ((self.face.character_size.height - self.face.baseline) * self.scale) as i32
    }

    /// Distance between consecutive baselines.
    pub fn line_height(&self) -> i32 {
        self.ascent() + self.descent()
    }

    /// Rendered width of `text` in pixels.
    pub fn measure(&self, text: &str) -> u32 {
        let count = text.chars().count() as u32;
        if count == 0 {
            return 0;
        }
        let advance = self.face.character_size.width + self.face.character_spacing;
        (count * advance - self.face.character_spacing) * self.scale
    }

    /// Draw `text` with its left edge at `left` and its baseline at `baseline`.
    pub fn draw<D>(&self, target: &mut D, text: &str, left: i32, baseline: i32, color: Rgb888)
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let mut scaled = Scaled {
            target,
            origin: Point::new(left, baseline - self.ascent()),
            factor: self.scale,
        };
        let style = MonoTextStyle::new(self.face, color);
        Text::with_baseline(text, Point::zero(), style, Baseline::Top)
            .draw(&mut scaled)
            .ok();
    }
}

/// Draw target adapter that blows every pixel up into a `factor × factor` block.
struct Scaled<'a, D> {
    target: &'a mut D,
    origin: Point,
    factor: u32,
}

impl<D: DrawTarget> Dimensions for Scaled<'_, D> {
    fn bounding_box(&self) -> Rectangle {
        let outer = self.target.bounding_box();
        let f = self.factor as i32;
        let top_left = Point::new(
            (outer.top_left.x - self.origin.x).div_euclid(f),
            (outer.top_left.y - self.origin.y).div_euclid(f),
        );
        let size = Size::new(
            outer.size.width / self.factor + 2,
            outer.size.height / self.factor + 2,
        );
        Rectangle::new(top_left, size)
    }
}

impl<D: DrawTarget> DrawTarget for Scaled<'_, D> {
    type Color = D::Color;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let f = self.factor as i32;
        if f == 1 {
            let origin = self.origin;
            return self
                .target
                .draw_iter(pixels.into_iter().map(|Pixel(p, c)| Pixel(p + origin, c)));
        }
        let block = Size::new(self.factor, self.factor);
        for Pixel(point, color) in pixels {
            let top_left = self.origin + Point::new(point.x * f, point.y * f);
            self.target.fill_solid(&Rectangle::new(top_left, block), color)?;
        }
        Ok(())
    }
}
