//! # Paperboard Core Library
//!
//! Render-on-demand status images for networked e-paper panels. Devices poll
//! over HTTP; each poll is answered with the URL of a 1-bit bitmap depicting
//! a specific instant, and fetching that URL renders the image on the spot
//! from the device's layout.
//!
//! ## Design Philosophy
//!
//! ### Stateless Images
//! No image is ever stored. The file name carries the device id and the
//! render instant, and rendering is a pure function of layout, instant and
//! the device's last telemetry, so the same name always yields the same
//! bytes.
//!
//! ### Layouts Are Data
//! A [`display::DisplayDefinition`] is a list of rectangles, each bound to
//! one of a closed set of [`composers::Composer`] variants (rectangle, line,
//! text, time, battery, events). Layouts are loaded once at startup by
//! [`layout`] and never mutated afterwards.
//!
//! ### Nothing Fails Loudly
//! A bad layout value, a missing events directory or an unusable time format
//! blanks one element and logs a warning. Only a missing config directory
//! stops the server.
//!
//! ## Data Flow
//! 1. **Poll**: [`server`] records battery and RSSI into the
//!    [`telemetry::TelemetryStore`] and asks the [`scheduler`] for the next
//!    render instant and sleep time
//! 2. **Fetch**: [`server`] parses the image name and calls
//!    [`compositor::render`]
//! 3. **Render**: each binding is drawn by its composer onto a sub-surface,
//!    composited onto the panel [`canvas::Canvas`] and encoded by [`bmp`]

pub mod bmp;
pub mod calendar;
pub mod canvas;
pub mod composers;
pub mod compositor;
pub mod config;
pub mod display;
pub mod layout;
pub mod renderer;
pub mod scheduler;
pub mod server;
pub mod style;
pub mod telemetry;

#[cfg(test)]
mod tests;
