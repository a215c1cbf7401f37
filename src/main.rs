//! # Paperboard Entry Point
//!
//! Loads the server settings and the device layouts, then serves the device
//! API until interrupted. A development mode renders one layout to the
//! terminal instead of starting the server.
//!
//! ```text
//! paperboard [CONFIG]                               # serve, CONFIG defaults to paperboard.toml
//! paperboard [CONFIG] --preview DEVICE [INSTANT]    # ASCII preview, INSTANT in RFC 3339
//! ```

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use paperboard::config::ServerConfig;
use paperboard::server::{self, normalize_device_id, AppState};
use paperboard::style::{Style, DEFAULT_FAMILY};
use paperboard::telemetry::DeviceTelemetry;
use paperboard::{compositor, layout, renderer, scheduler};

/// Parsed command line.
#[derive(Debug, PartialEq)]
struct Args {
    config_path: Option<PathBuf>,
    preview: Option<Preview>,
}

#[derive(Debug, PartialEq)]
struct Preview {
    device_id: String,
    instant: Option<DateTime<Utc>>,
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut config_path = None;
    let mut preview = None;
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--preview" => {
                let device = iter.next().context("--preview needs a device id")?;
                let instant = match iter.peek() {
                    Some(next) => match DateTime::parse_from_rfc3339(next) {
                        Ok(instant) => {
                            iter.next();
                            Some(instant.with_timezone(&Utc))
                        }
                        Err(_) => None,
                    },
                    None => None,
                };
                preview = Some(Preview {
                    device_id: normalize_device_id(device),
                    instant,
                });
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            path if config_path.is_none() => config_path = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {extra}"),
        }
    }

    Ok(Args {
        config_path,
        preview,
    })
}

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Load settings, logging at `info` until the configured filter is known.
fn load_config(path: Option<&Path>) -> ServerConfig {
    let bootstrap = tracing_subscriber::fmt().with_env_filter(env_filter("info")).finish();
    tracing::subscriber::with_default(bootstrap, || match path {
        Some(path) => {
            let mut config = ServerConfig::load_from_path(path);
            config.apply_env(|name| env::var(name).ok());
            config
        }
        None => ServerConfig::load(),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("cannot listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let args = parse_args(&env::args().skip(1).collect::<Vec<_>>())?;
    let config = load_config(args.config_path.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.log_level))
        .init();

    // No fallback typeface exists, so a missing default family is fatal
    Style::resolve(Rgb888::BLACK, DEFAULT_FAMILY).context("resolving the default font family")?;

    let default_tz = config.default_time_zone();
    let displays = layout::load_config_dir(&config.config_dir, default_tz)
        .with_context(|| format!("loading layouts from {}", config.config_dir.display()))?;
    if displays.is_empty() {
        info!("no layouts found, every device will get 404");
    }

    // Development mode: ASCII output for checking a layout
    if let Some(preview) = args.preview {
        let definition = displays
            .resolve(&preview.device_id)
            .with_context(|| format!("no layout for device {}", preview.device_id))?;
        let instant = preview.instant.unwrap_or_else(|| {
            scheduler::next_instant(Utc::now(), definition.interval_secs(), None).render_instant
        });
        let canvas = compositor::compose(&definition, instant, &DeviceTelemetry::default())?;

        println!(
            "{} ({}x{}) at {}",
            definition.device_id(),
            definition.width(),
            definition.height(),
            instant.with_timezone(&definition.time_zone())
        );
        renderer::draw_ascii(&canvas, renderer::DEFAULT_COLUMNS);
        return Ok(());
    }

    let state = AppState::new(displays);
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(server::serve(&config.host, config.port, state, shutdown_signal()))
        .with_context(|| format!("serving on {}:{}", config.host, config.port))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn args(list: &[&str]) -> anyhow::Result<Args> {
        parse_args(&list.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_defaults() {
        let parsed = args(&[]).unwrap();
        assert_eq!(parsed.config_path, None);
        assert_eq!(parsed.preview, None);
    }

    #[test]
    fn test_preview_with_instant() {
        let parsed = args(&["/etc/paper.toml", "--preview", "aa:bb:cc:dd:ee:ff", "2025-03-14T09:20:00+01:00"]).unwrap();
        assert_eq!(parsed.config_path, Some(PathBuf::from("/etc/paper.toml")));
        assert_eq!(
            parsed.preview,
            Some(Preview {
                device_id: "AABBCCDDEEFF".to_string(),
                instant: Some(Utc.with_ymd_and_hms(2025, 3, 14, 8, 20, 0).unwrap()),
            })
        );
    }

    #[test]
    fn test_preview_without_instant_then_config() {
        let parsed = args(&["--preview", "any", "local.toml"]).unwrap();
        assert_eq!(parsed.config_path, Some(PathBuf::from("local.toml")));
        assert_eq!(parsed.preview.unwrap().instant, None);
    }

    #[test]
    fn test_bad_arguments() {
        assert!(args(&["--preview"]).is_err());
        assert!(args(&["--stdout"]).is_err());
        assert!(args(&["a.toml", "b.toml"]).is_err());
    }
}
