//! # Device Layouts
//!
//! Loads [`DisplayDefinition`]s from the config directory. Each device has
//! its own sub-directory holding a `config.toml`; the wildcard layout used for
//! unknown devices lives in `any/config.toml` (or `config.toml` at the top of
//! the directory).
//!
//! ## File format
//!
//! ```toml
//! [display]
//! interval = 600            # seconds, 300..=3600
//! width = 800
//! height = 480
//! inverted = false
//! time_zone = "Europe/Berlin"
//!
//! [clock]                   # any other table is a composer binding
//! kind = "Time"
//! format = "%H:%M"
//! left = 0
//! top = 0
//! right = 399
//! bottom = 199
//! ```
//!
//! Keys are case-insensitive. Each table is parsed in two phases: its keys go
//! into a working set, every recognised key is taken out as it is read, and
//! whatever is left afterwards is reported in one warning. Problems inside a
//! layout never fail the load: the offending value falls back to its default
//! or the binding is skipped, with a warning either way.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Duration;
use chrono_tz::Tz;
use thiserror::Error;
use toml::{Table, Value};
use tracing::{info, warn};

use crate::composers::{
    BatteryComposer, Composer, EventsComposer, HAlign, LineComposer, RectangleComposer, TextComposer,
    TimeComposer, VAlign,
};
use crate::display::{
    panel_size, ComposerBinding, DisplayDefinition, DisplayTable, PixelRect, ANY_DEVICE, DEFAULT_HEIGHT,
    DEFAULT_INTERVAL_SECS, DEFAULT_WIDTH,
};
use crate::style::DEFAULT_FONT_SIZE;

/// Name of the layout file inside a device directory.
pub const CONFIG_FILE: &str = "config.toml";

const DISPLAY_SECTION: &str = "display";
const DEFAULT_TIME_FORMAT: &str = "%H:%M";
const DEFAULT_EVENTS_DIRECTORY: &str = "events";
/// `show_below` value that keeps the battery indicator always visible.
const ALWAYS_SHOW: u8 = 101;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("cannot read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config directory {} not found", .0.display())]
    MissingDirectory(PathBuf),
}

/// Load every layout under `dir`.
///
/// Only a missing or unreadable `dir` is an error. Devices whose layout
/// cannot be read are skipped with a warning.
pub fn load_config_dir(dir: &Path, default_tz: Tz) -> Result<DisplayTable, LayoutError> {
    if !dir.is_dir() {
        return Err(LayoutError::MissingDirectory(dir.to_path_buf()));
    }
    let table = DisplayTable::new();

    let wildcard = [dir.join(ANY_DEVICE).join(CONFIG_FILE), dir.join(CONFIG_FILE)]
        .into_iter()
        .find(|path| path.is_file());
    if let Some(path) = wildcard {
        insert_loaded(&table, ANY_DEVICE, &path, default_tz);
    }

    let listing = fs::read_dir(dir).map_err(|source| LayoutError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut devices: Vec<(String, PathBuf)> = listing
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            Some((name, path))
        })
        .filter(|(name, _)| !name.eq_ignore_ascii_case(ANY_DEVICE))
        .collect();
    devices.sort();

    for (device_id, device_dir) in devices {
        let path = device_dir.join(CONFIG_FILE);
        if !path.is_file() {
            warn!(device = %device_id, "no {CONFIG_FILE} in {}, skipping", device_dir.display());
            continue;
        }
        insert_loaded(&table, &device_id, &path, default_tz);
    }

    info!(
        directory = %dir.display(),
        displays = table.len(),
        wildcard = table.get(ANY_DEVICE).is_some(),
        "loaded display layouts"
    );
    Ok(table)
}

fn insert_loaded(table: &DisplayTable, device_id: &str, path: &Path, default_tz: Tz) {
    match load_display(device_id, path, default_tz) {
        Ok(definition) => table.insert(definition),
        Err(e) => warn!(device = %device_id, "skipping layout: {e}"),
    }
}

/// Read and parse one layout file. Relative paths inside it (the events
/// directory) resolve against the file's directory.
pub fn load_display(device_id: &str, path: &Path, default_tz: Tz) -> Result<DisplayDefinition, LayoutError> {
    let contents = fs::read_to_string(path).map_err(|source| LayoutError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let device_dir = path.parent().unwrap_or(Path::new("."));
    parse_display(device_id, &contents, device_dir, default_tz).map_err(|source| LayoutError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse layout text. Fails only on TOML syntax errors.
pub fn parse_display(
    device_id: &str,
    contents: &str,
    device_dir: &Path,
    default_tz: Tz,
) -> Result<DisplayDefinition, toml::de::Error> {
    let document: Table = contents.parse()?;

    let mut display_table = None;
    let mut composer_tables = Vec::new();
    for (name, value) in document {
        match value {
            Value::Table(section) if name.eq_ignore_ascii_case(DISPLAY_SECTION) => {
                display_table = Some(section);
            }
            Value::Table(section) => composer_tables.push((name, section)),
            _ => warn!(device = %device_id, key = %name, "top-level key is not a table, ignoring"),
        }
    }

    let mut display = Section::new(device_id, DISPLAY_SECTION, display_table.unwrap_or_default());
    let interval_secs = display
        .integer("interval")
        .map(|secs| u32::try_from(secs).unwrap_or(0))
        .unwrap_or(DEFAULT_INTERVAL_SECS);
    let (width, height) = panel_size(
        device_id,
        display.positive("width", DEFAULT_WIDTH),
        display.positive("height", DEFAULT_HEIGHT),
    );
    let inverted = display.boolean("inverted", false);
    let time_zone = display.time_zone("time_zone", default_tz);
    display.finish();

    let bindings = composer_tables
        .into_iter()
        .filter_map(|(name, table)| {
            let section = Section::new(device_id, &name, table);
            parse_binding(section, width, height, device_dir)
        })
        .collect();

    Ok(DisplayDefinition::new(
        device_id,
        interval_secs,
        width,
        height,
        inverted,
        time_zone,
        bindings,
    ))
}

fn parse_binding(mut section: Section<'_>, width: u32, height: u32, device_dir: &Path) -> Option<ComposerBinding> {
    let Some(kind) = section.string("kind") else {
        section.warn("missing 'kind', skipping");
        return None;
    };

    let composer = match kind.to_ascii_lowercase().as_str() {
        "rectangle" => Composer::Rectangle(RectangleComposer {
            filled: section.boolean("filled", true),
            thickness: section.positive("thickness", 1),
        }),
        "line" => Composer::Line(LineComposer::new(section.positive("thickness", 1))),
        "text" => Composer::Text(TextComposer {
            text: section.string("text").unwrap_or_default(),
            halign: section.halign("align", HAlign::Center),
            valign: section.valign("valign", VAlign::Middle),
            size: section.positive("size", DEFAULT_FONT_SIZE),
        }),
        "time" => Composer::Time(TimeComposer::new(
            section
                .string("format")
                .unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string()),
            section.halign("align", HAlign::Center),
            section.valign("valign", VAlign::Middle),
        )),
        "battery" => Composer::Battery(BatteryComposer::new(
            section.positive("show_below", ALWAYS_SHOW),
            section.halign("align", HAlign::Left),
        )),
        "events" => {
            let directory = section
                .string("directory")
                .unwrap_or_else(|| DEFAULT_EVENTS_DIRECTORY.to_string());
            Composer::Events(EventsComposer::new(device_dir.join(directory)))
        }
        _ => {
            section.warn(&format!("unknown kind '{kind}', skipping"));
            return None;
        }
    };

    let full = PixelRect::full(width, height);
    let rect = PixelRect::new(
        section.coordinate("left", full.left),
        section.coordinate("top", full.top),
        section.coordinate("right", full.right),
        section.coordinate("bottom", full.bottom),
    );
    let inverted = section.boolean("inverted", false);
    let offset = section
        .integer("offset")
        .and_then(Duration::try_seconds)
        .unwrap_or_else(Duration::zero);

    let label = section.name.to_string();
    section.finish();
    Some(ComposerBinding::new(label, composer, rect).inverted(inverted).offset(offset))
}

/// Working set of one table's keys; recognised keys are taken out as they
/// are read.
struct Section<'a> {
    device_id: &'a str,
    name: &'a str,
    keys: Table,
}

impl<'a> Section<'a> {
    fn new(device_id: &'a str, name: &'a str, table: Table) -> Self {
        let keys = table
            .into_iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value))
            .collect();
        Self { device_id, name, keys }
    }

    fn warn(&self, message: &str) {
        warn!(device = %self.device_id, section = %self.name, "{message}");
    }

    fn take(&mut self, key: &str) -> Option<Value> {
        self.keys.remove(key)
    }

    fn wrong_type(&self, key: &str, expected: &str, value: &Value) {
        self.warn(&format!("'{key}' should be {expected}, got {}", value.type_str()));
    }

    fn string(&mut self, key: &str) -> Option<String> {
        match self.take(key)? {
            Value::String(s) => Some(s),
            other => {
                self.wrong_type(key, "a string", &other);
                None
            }
        }
    }

    fn integer(&mut self, key: &str) -> Option<i64> {
        match self.take(key)? {
            Value::Integer(i) => Some(i),
            other => {
                self.wrong_type(key, "an integer", &other);
                None
            }
        }
    }

    fn boolean(&mut self, key: &str, default: bool) -> bool {
        match self.take(key) {
            Some(Value::Boolean(b)) => b,
            Some(other) => {
                self.wrong_type(key, "true or false", &other);
                default
            }
            None => default,
        }
    }

    /// Integer above zero that fits `T`, or `default`.
    fn positive<T>(&mut self, key: &str, default: T) -> T
    where
        T: TryFrom<i64> + Copy,
    {
        match self.integer(key) {
            Some(value) if value > 0 => T::try_from(value).unwrap_or_else(|_| {
                self.warn(&format!("'{key}' = {value} is out of range, using default"));
                default
            }),
            Some(value) => {
                self.warn(&format!("'{key}' = {value} must be positive, using default"));
                default
            }
            None => default,
        }
    }

    /// Pixel coordinate; out-of-range values become -1 so the binding fails
    /// the bounds check.
    fn coordinate(&mut self, key: &str, default: i32) -> i32 {
        self.integer(key)
            .map(|value| i32::try_from(value).unwrap_or(-1))
            .unwrap_or(default)
    }

    fn time_zone(&mut self, key: &str, default: Tz) -> Tz {
        let Some(name) = self.string(key) else {
            return default;
        };
        name.parse().unwrap_or_else(|_| {
            self.warn(&format!("unknown time zone '{name}', using {}", default.name()));
            default
        })
    }

    fn halign(&mut self, key: &str, default: HAlign) -> HAlign {
        let Some(value) = self.string(key) else {
            return default;
        };
        match value.to_ascii_lowercase().as_str() {
            "left" => HAlign::Left,
            "center" | "centre" => HAlign::Center,
            "right" => HAlign::Right,
            _ => {
                self.warn(&format!("unknown {key} '{value}', using {default:?}"));
                default
            }
        }
    }

    fn valign(&mut self, key: &str, default: VAlign) -> VAlign {
        let Some(value) = self.string(key) else {
            return default;
        };
        match value.to_ascii_lowercase().as_str() {
            "top" => VAlign::Top,
            "middle" | "center" | "centre" => VAlign::Middle,
            "bottom" => VAlign::Bottom,
            _ => {
                self.warn(&format!("unknown {key} '{value}', using {default:?}"));
                default
            }
        }
    }

    /// Report any keys nobody asked for.
    fn finish(self) {
        if self.keys.is_empty() {
            return;
        }
        let leftover: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        self.warn(&format!("unrecognized keys: {}", leftover.join(", ")));
    }
}
