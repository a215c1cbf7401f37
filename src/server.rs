//! # Device HTTP API
//!
//! The polling protocol spoken by TRMNL-style e-paper devices:
//!
//! | Endpoint | Method | Purpose |
//! |----------|--------|---------|
//! | `/api/setup` | GET | Device registration |
//! | `/api/display` | GET | Telemetry in, next image URL and sleep time out |
//! | `/api/log` | POST | Device logs (accepted and dropped) |
//! | `/{deviceId}_{yyyy-MM-ddTHH-mm-ss}.bmp` | GET | The image itself |
//!
//! Devices identify themselves with their MAC address in the `ID` header and
//! report `Battery-Voltage`, `RSSI` and `FW-Version` on every display poll.
//!
//! Nothing is cached: the image file name carries the device id and the
//! render instant, and fetching it renders that instant again. Rendering is
//! deterministic, so a retried download gets identical bytes.

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::compositor;
use crate::display::{DisplayDefinition, DisplayTable};
use crate::scheduler::{self, Schedule};
use crate::telemetry::TelemetryStore;

const ID_HEADER: &str = "id";
const BATTERY_HEADER: &str = "battery-voltage";
const RSSI_HEADER: &str = "rssi";
const FIRMWARE_HEADER: &str = "fw-version";

const FILENAME_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";
const IMAGE_EXTENSION: &str = ".bmp";

/// Shared state handed to every request.
#[derive(Clone, Debug)]
pub struct AppState {
    pub displays: Arc<DisplayTable>,
    pub telemetry: Arc<TelemetryStore>,
}

impl AppState {
    pub fn new(displays: DisplayTable) -> Self {
        Self {
            displays: Arc::new(displays),
            telemetry: Arc::new(TelemetryStore::new()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetupResponse {
    pub status: u16,
    pub api_key: String,
    pub friendly_id: String,
    pub image_url: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayResponse {
    pub status: u16,
    pub image_url: String,
    pub filename: String,
    pub refresh_rate: u32,
    pub reset_firmware: bool,
    pub update_firmware: bool,
    pub firmware_url: Option<String>,
    pub special_function: String,
}

/// Device id from a MAC address: separators dropped, upper-cased.
pub fn normalize_device_id(mac: &str) -> String {
    mac.trim().replace(':', "").to_uppercase()
}

/// `{deviceId}_{yyyy-MM-ddTHH-mm-ss}.bmp`, instant in UTC.
pub fn image_filename(device_id: &str, instant: DateTime<Utc>) -> String {
    format!("{device_id}_{}{IMAGE_EXTENSION}", instant.format(FILENAME_TIME_FORMAT))
}

/// Inverse of [`image_filename`].
pub fn parse_image_filename(name: &str) -> Option<(String, DateTime<Utc>)> {
    let stem = name.strip_suffix(IMAGE_EXTENSION)?;
    let (device_id, stamp) = stem.rsplit_once('_')?;
    if device_id.is_empty() {
        return None;
    }
    let instant = NaiveDateTime::parse_from_str(stamp, FILENAME_TIME_FORMAT).ok()?;
    Some((device_id.to_string(), instant.and_utc()))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn device_id(headers: &HeaderMap) -> Result<String, StatusCode> {
    header_value(headers, ID_HEADER)
        .map(normalize_device_id)
        .filter(|id| !id.is_empty())
        .ok_or(StatusCode::BAD_REQUEST)
}

fn image_url(headers: &HeaderMap, filename: &str) -> String {
    let host = header_value(headers, header::HOST.as_str()).unwrap_or("localhost");
    format!("http://{host}/{filename}")
}

fn lookup(state: &AppState, device_id: &str) -> Result<Arc<DisplayDefinition>, StatusCode> {
    state.displays.resolve(device_id).ok_or_else(|| {
        warn!(device = %device_id, "no display configured");
        StatusCode::NOT_FOUND
    })
}

fn schedule_for(state: &AppState, definition: &DisplayDefinition, device_id: &str, now: DateTime<Utc>) -> Schedule {
    let battery = state.telemetry.battery(device_id);
    scheduler::next_instant(now, definition.interval_secs(), battery.percentage)
}

/// Registration: tell the device its id and the image it should show first.
pub fn setup_response(state: &AppState, headers: &HeaderMap, now: DateTime<Utc>) -> Result<SetupResponse, StatusCode> {
    let id = device_id(headers)?;
    let definition = lookup(state, &id)?;
    let schedule = schedule_for(state, &definition, &id, now);
    let filename = image_filename(&id, schedule.render_instant);

    info!(device = %id, "device set up");
    Ok(SetupResponse {
        status: 200,
        api_key: id.clone(),
        friendly_id: id,
        image_url: image_url(headers, &filename),
        filename,
    })
}

/// Poll: record telemetry, then pick the image and the next wake-up.
pub fn display_response(
    state: &AppState,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<DisplayResponse, StatusCode> {
    let id = device_id(headers)?;

    if let Some(voltage) = header_value(headers, BATTERY_HEADER)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
    {
        state.telemetry.record_battery(&id, voltage);
    }
    if let Some(rssi) = header_value(headers, RSSI_HEADER).and_then(|v| v.parse::<i32>().ok()) {
        state.telemetry.record_wireless(&id, rssi);
    }

    let definition = lookup(state, &id)?;
    let schedule = schedule_for(state, &definition, &id, now);
    let filename = image_filename(&id, schedule.render_instant);

    info!(
        device = %id,
        firmware = header_value(headers, FIRMWARE_HEADER).unwrap_or("?"),
        image = %filename,
        refresh_secs = schedule.next_poll_secs,
        "display poll"
    );
    Ok(DisplayResponse {
        status: 0,
        image_url: image_url(headers, &filename),
        filename,
        refresh_rate: schedule.next_poll_secs,
        reset_firmware: false,
        update_firmware: false,
        firmware_url: None,
        special_function: "none".to_string(),
    })
}

/// Render the image named by a request path.
pub fn image_response(state: &AppState, path: &str) -> Result<Vec<u8>, StatusCode> {
    let name = path.trim_start_matches('/');
    let Some((id, instant)) = parse_image_filename(name) else {
        debug!(path = %name, "not an image name");
        return Err(StatusCode::NOT_FOUND);
    };
    let definition = lookup(state, &id)?;
    let readings = state.telemetry.get(&id);

    compositor::render(&definition, instant, &readings).map_err(|e| {
        error!(device = %id, "render failed: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

fn json_or_status<T: Serialize>(result: Result<T, StatusCode>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(status) => status.into_response(),
    }
}

async fn setup(State(state): State<AppState>, headers: HeaderMap) -> Response {
    json_or_status(setup_response(&state, &headers, Utc::now()))
}

async fn display(State(state): State<AppState>, headers: HeaderMap) -> Response {
    json_or_status(display_response(&state, &headers, Utc::now()))
}

async fn log(headers: HeaderMap, body: String) -> StatusCode {
    debug!(
        device = header_value(&headers, ID_HEADER).unwrap_or("?"),
        bytes = body.len(),
        "device log dropped"
    );
    StatusCode::OK
}

async fn image(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    let rendered = tokio::task::spawn_blocking(move || image_response(&state, &path)).await;
    match rendered {
        Ok(Ok(bytes)) => {
            info!(path = %uri.path(), bytes = bytes.len(), "served image");
            ([(header::CONTENT_TYPE, "image/bmp")], bytes).into_response()
        }
        Ok(Err(status)) => status.into_response(),
        Err(e) => {
            error!("render task failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/setup", get(setup))
        .route("/api/display", get(display))
        .route("/api/log", post(log))
        .fallback(image)
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(host: &str, port: u16, state: AppState, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind((host, port)).await?;
    info!(address = %listener.local_addr()?, "listening for devices");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composers::{Composer, RectangleComposer};
    use crate::display::{ComposerBinding, PixelRect, ANY_DEVICE};
    use axum::http::HeaderValue;
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn state(with_wildcard: bool) -> AppState {
        let table = DisplayTable::new();
        let border = ComposerBinding::new(
            "border",
            Composer::Rectangle(RectangleComposer::outline(2)),
            PixelRect::full(80, 40),
        );
        table.insert(DisplayDefinition::new("AABBCCDDEEFF", 600, 80, 40, false, Tz::UTC, vec![border]));
        if with_wildcard {
            table.insert(DisplayDefinition::new(ANY_DEVICE, 1800, 80, 40, false, Tz::UTC, vec![]));
        }
        AppState::new(table)
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(*value));
        }
        headers
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 8, 21, 5).unwrap()
    }

    #[test]
    fn test_normalize_device_id() {
        assert_eq!(normalize_device_id("aa:bb:cc:dd:ee:ff"), "AABBCCDDEEFF");
        assert_eq!(normalize_device_id(" 01:02:03:04:05:06 "), "010203040506");
    }

    #[test]
    fn test_image_filename_format() {
        let instant = Utc.with_ymd_and_hms(2025, 3, 14, 8, 20, 0).unwrap();
        let name = image_filename("AABBCCDDEEFF", instant);
        assert_eq!(name, "AABBCCDDEEFF_2025-03-14T08-20-00.bmp");
        assert_eq!(
            parse_image_filename(&name),
            Some(("AABBCCDDEEFF".to_string(), instant))
        );
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        assert_eq!(parse_image_filename("favicon.ico"), None);
        assert_eq!(parse_image_filename("AABB.bmp"), None);
        assert_eq!(parse_image_filename("_2025-03-14T08-20-00.bmp"), None);
        assert_eq!(parse_image_filename("AABB_2025-13-14T08-20-00.bmp"), None);
        assert_eq!(parse_image_filename("AABB_2025-03-14 08:20:00.bmp"), None);
        // underscores inside the id are fine, the last one separates
        assert_eq!(
            parse_image_filename("my_dev_2025-03-14T08-20-00.bmp").map(|(id, _)| id),
            Some("my_dev".to_string())
        );
    }

    #[test]
    fn test_setup_response() {
        let state = state(false);
        let response = setup_response(
            &state,
            &headers(&[("id", "aa:bb:cc:dd:ee:ff"), ("host", "paper.local:8084")]),
            now(),
        )
        .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.api_key, "AABBCCDDEEFF");
        assert_eq!(response.friendly_id, "AABBCCDDEEFF");
        assert_eq!(response.filename, "AABBCCDDEEFF_2025-03-14T08-20-00.bmp");
        assert_eq!(
            response.image_url,
            "http://paper.local:8084/AABBCCDDEEFF_2025-03-14T08-20-00.bmp"
        );
    }

    #[test]
    fn test_display_records_telemetry_and_schedules() {
        let state = state(false);
        let response = display_response(
            &state,
            &headers(&[
                ("id", "aa:bb:cc:dd:ee:ff"),
                ("battery-voltage", "3.35"),
                ("rssi", "-60"),
                ("fw-version", "1.5.2"),
            ]),
            now(),
        )
        .unwrap();

        let readings = state.telemetry.get("AABBCCDDEEFF");
        assert_eq!(readings.battery.percentage, Some(15));
        assert_eq!(readings.wireless.percentage, Some(50));

        // 15% battery stretches the 600 s interval to 900 s
        assert_eq!(response.filename, "AABBCCDDEEFF_2025-03-14T08-15-00.bmp");
        assert_eq!(response.refresh_rate, 900 - 365);
        assert_eq!(response.status, 0);
        assert_eq!(response.firmware_url, None);
    }

    #[test]
    fn test_non_finite_voltage_is_ignored() {
        let state = state(false);
        let response = display_response(
            &state,
            &headers(&[("id", "aa:bb:cc:dd:ee:ff"), ("battery-voltage", "NaN")]),
            now(),
        )
        .unwrap();

        assert_eq!(state.telemetry.battery("AABBCCDDEEFF").percentage, None);
        // normal 600 s interval, no critical back-off
        assert_eq!(response.filename, "AABBCCDDEEFF_2025-03-14T08-20-00.bmp");
        assert_eq!(response.refresh_rate, 535);
    }

    #[test]
    fn test_display_json_shape() {
        let state = state(false);
        let response = display_response(&state, &headers(&[("id", "AABBCCDDEEFF")]), now()).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], 0);
        assert_eq!(json["refresh_rate"], 535);
        assert_eq!(json["reset_firmware"], false);
        assert_eq!(json["update_firmware"], false);
        assert!(json["firmware_url"].is_null());
        assert_eq!(json["special_function"], "none");
        assert_eq!(json["image_url"], "http://localhost/AABBCCDDEEFF_2025-03-14T08-20-00.bmp");
    }

    #[test]
    fn test_unknown_device_and_missing_id() {
        let state = state(false);
        let unknown = headers(&[("id", "11:22:33:44:55:66")]);
        assert_eq!(display_response(&state, &unknown, now()), Err(StatusCode::NOT_FOUND));
        assert_eq!(display_response(&state, &HeaderMap::new(), now()), Err(StatusCode::BAD_REQUEST));

        let state = self::state(true);
        let response = display_response(&state, &unknown, now()).unwrap();
        // wildcard definition uses a 1800 s interval
        assert_eq!(response.filename, "112233445566_2025-03-14T08-00-00.bmp");
    }

    #[test]
    fn test_image_response() {
        let state = state(false);
        let bytes = image_response(&state, "/AABBCCDDEEFF_2025-03-14T08-20-00.bmp").unwrap();
        assert_eq!(&bytes[..2], b"BM");
        assert_eq!(
            bytes,
            image_response(&state, "/AABBCCDDEEFF_2025-03-14T08-20-00.bmp").unwrap()
        );

        assert_eq!(
            image_response(&state, "/112233445566_2025-03-14T08-20-00.bmp"),
            Err(StatusCode::NOT_FOUND)
        );
        assert_eq!(image_response(&state, "/favicon.ico"), Err(StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        serve("127.0.0.1", 0, state(false), async {}).await.unwrap();
    }
}
