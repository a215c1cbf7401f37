//! # Display Definitions
//!
//! Static per-device layout: panel geometry, refresh interval, time zone and
//! the ordered list of composer bindings. Definitions are validated once when
//! they are built and never change afterwards; the [`DisplayTable`] hands them
//! out as shared `Arc`s so concurrent renders can read them freely.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Duration;
use chrono_tz::Tz;
use embedded_graphics::{
    prelude::{Point, Size},
    primitives::Rectangle,
};
use tracing::warn;

use crate::composers::Composer;

/// Id of the wildcard definition used for devices without their own config.
pub const ANY_DEVICE: &str = "any";

pub const DEFAULT_INTERVAL_SECS: u32 = 600;
pub const MIN_INTERVAL_SECS: u32 = 300;
pub const MAX_INTERVAL_SECS: u32 = 3600;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 480;
/// Largest panel side accepted from a layout.
pub const MAX_PANEL_EXTENT: u32 = 4096;

/// Panel size, replaced by the 800x480 default when either side is zero or
/// larger than [`MAX_PANEL_EXTENT`].
pub fn panel_size(device_id: &str, width: u32, height: u32) -> (u32, u32) {
    let valid = |extent: u32| (1..=MAX_PANEL_EXTENT).contains(&extent);
    if valid(width) && valid(height) {
        return (width, height);
    }
    warn!(
        device = %device_id,
        width,
        height,
        "invalid panel size, using {DEFAULT_WIDTH}x{DEFAULT_HEIGHT}"
    );
    (DEFAULT_WIDTH, DEFAULT_HEIGHT)
}

/// Inclusive pixel bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Whole-panel bounds.
    pub fn full(width: u32, height: u32) -> Self {
        let last = |extent: u32| i32::try_from(extent).unwrap_or(i32::MAX).saturating_sub(1);
        Self::new(0, 0, last(width), last(height))
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left + 1).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top + 1).max(0) as u32
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// `0 <= left <= right < width` and `0 <= top <= bottom < height`.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        0 <= self.left
            && self.left <= self.right
            && (self.right as i64) < width as i64
            && 0 <= self.top
            && self.top <= self.bottom
            && (self.bottom as i64) < height as i64
    }

    pub fn to_rectangle(&self) -> Rectangle {
        Rectangle::new(self.origin(), Size::new(self.width(), self.height()))
    }
}

/// One composer placed on the panel.
#[derive(Clone, Debug)]
pub struct ComposerBinding {
    /// Config section the binding came from, used in log messages
    pub label: String,
    pub composer: Composer,
    pub rect: PixelRect,
    /// Draw light-on-dark inside this rectangle
    pub inverted: bool,
    /// Shift applied to the render time before this composer sees it
    pub offset: Duration,
}

impl ComposerBinding {
    pub fn new(label: impl Into<String>, composer: Composer, rect: PixelRect) -> Self {
        Self {
            label: label.into(),
            composer,
            rect,
            inverted: false,
            offset: Duration::zero(),
        }
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn offset(mut self, offset: Duration) -> Self {
        self.offset = offset;
        self
    }
}

/// Validated configuration for one device.
#[derive(Clone, Debug)]
pub struct DisplayDefinition {
    device_id: String,
    interval_secs: u32,
    width: u32,
    height: u32,
    inverted: bool,
    time_zone: Tz,
    bindings: Vec<ComposerBinding>,
}

impl DisplayDefinition {
    /// Build a definition, dropping anything that would not render.
    ///
    /// An interval outside 300..=3600 s is replaced by 600 s, an unusable
    /// panel size by 800x480, and bindings whose rectangle falls outside the
    /// panel are skipped; all with a warning.
    pub fn new(
        device_id: impl Into<String>,
        interval_secs: u32,
        width: u32,
        height: u32,
        inverted: bool,
        time_zone: Tz,
        bindings: Vec<ComposerBinding>,
    ) -> Self {
        let device_id = device_id.into();
        let (width, height) = panel_size(&device_id, width, height);

        let interval_secs = if (MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&interval_secs) {
            interval_secs
        } else {
            warn!(
                device = %device_id,
                interval_secs,
                "invalid interval, using {DEFAULT_INTERVAL_SECS} seconds"
            );
            DEFAULT_INTERVAL_SECS
        };

        let bindings = bindings
            .into_iter()
            .filter(|binding| {
                let fits = binding.rect.fits_within(width, height);
                if !fits {
                    warn!(
                        device = %device_id,
                        section = %binding.label,
                        rect = ?binding.rect,
                        "rectangle outside {width}x{height} display, skipping"
                    );
                }
                fits
            })
            .collect();

        Self {
            device_id,
            interval_secs,
            width,
            height,
            inverted,
            time_zone,
            bindings,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn interval_secs(&self) -> u32 {
        self.interval_secs
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn inverted(&self) -> bool {
        self.inverted
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn bindings(&self) -> &[ComposerBinding] {
        &self.bindings
    }
}

/// All loaded definitions, keyed by lower-cased device id.
#[derive(Debug, Default)]
pub struct DisplayTable {
    displays: RwLock<HashMap<String, Arc<DisplayDefinition>>>,
}

impl DisplayTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a definition.
    pub fn insert(&self, definition: DisplayDefinition) {
        let key = definition.device_id().to_lowercase();
        let mut displays = self.displays.write().unwrap_or_else(PoisonError::into_inner);
        displays.insert(key, Arc::new(definition));
    }

    /// Definition for exactly this device.
    pub fn get(&self, device_id: &str) -> Option<Arc<DisplayDefinition>> {
        let displays = self.displays.read().unwrap_or_else(PoisonError::into_inner);
        displays.get(&device_id.to_lowercase()).cloned()
    }

    /// Definition for this device, or the wildcard one.
    pub fn resolve(&self, device_id: &str) -> Option<Arc<DisplayDefinition>> {
        self.get(device_id).or_else(|| self.get(ANY_DEVICE))
    }

    pub fn len(&self) -> usize {
        self.displays
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
