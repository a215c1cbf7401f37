//! # Device Telemetry
//!
//! Last-known battery and wireless readings per device, kept in memory for the
//! lifetime of the process. Devices report these values as request headers
//! when they poll; the compositor reads them back to annotate the next image.
//!
//! Device ids are compared case-insensitively and the last write wins.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

/// Voltage above which a device is assumed to be on external power.
const CHARGING_VOLTAGE: f64 = 4.5;
/// Voltage mapped to 0% (linear up to 4.2 V = 100%).
const EMPTY_VOLTAGE: f64 = 3.2;

const MIN_RSSI: i32 = -90;
const MAX_RSSI: i32 = -30;

/// Battery state derived from a single voltage reading.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatteryLevel {
    /// Raw voltage; `None` while charging or when nothing was reported
    pub voltage: Option<f64>,
    /// Charge percentage in `0..=100`; `None` while charging or unknown
    pub percentage: Option<u8>,
    pub charging: bool,
}

impl BatteryLevel {
    /// Derive a battery level from a voltage reading.
    ///
    /// # Example
    /// ```
    /// use paperboard::telemetry::BatteryLevel;
    ///
    /// assert_eq!(BatteryLevel::from_voltage(Some(3.7)).percentage, Some(50));
    /// assert!(BatteryLevel::from_voltage(Some(4.8)).charging);
    /// assert_eq!(BatteryLevel::from_voltage(None), BatteryLevel::default());
    /// assert_eq!(BatteryLevel::from_voltage(Some(f64::NAN)), BatteryLevel::default());
    /// ```
    pub fn from_voltage(voltage: Option<f64>) -> Self {
        match voltage {
            Some(v) if !v.is_finite() => Self::default(),
            Some(v) if v > CHARGING_VOLTAGE => Self {
                voltage: None,
                percentage: None,
                charging: true,
            },
            Some(v) => Self {
                voltage: Some(v),
                percentage: Some(clamp_percent((v - EMPTY_VOLTAGE) * 100.0)),
                charging: false,
            },
            None => Self::default(),
        }
    }
}

/// Wireless signal quality derived from an RSSI reading in dBm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WirelessLevel {
    pub rssi: Option<i32>,
    pub percentage: Option<u8>,
}

impl WirelessLevel {
    pub fn from_rssi(rssi: Option<i32>) -> Self {
        match rssi {
            Some(r) => Self {
                rssi: Some(r),
                percentage: Some(clamp_percent(
                    100.0 * (f64::from(r) - f64::from(MIN_RSSI)) / f64::from(MAX_RSSI - MIN_RSSI),
                )),
            },
            None => Self::default(),
        }
    }
}

/// Round half to even, then clamp into `0..=100`.
fn clamp_percent(value: f64) -> u8 {
    value.round_ties_even().clamp(0.0, 100.0) as u8
}

/// Everything known about one device.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeviceTelemetry {
    pub battery: BatteryLevel,
    pub wireless: WirelessLevel,
}

/// Process-wide telemetry map behind a single lock.
///
/// Reads never hold the lock for longer than a map lookup and a copy, so
/// concurrent renders do not contend with each other in any meaningful way.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    devices: RwLock<HashMap<String, DeviceTelemetry>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a battery voltage and return the derived level.
    pub fn record_battery(&self, device_id: &str, voltage: f64) -> BatteryLevel {
        let level = BatteryLevel::from_voltage(Some(voltage));
        debug!(
            device = device_id,
            voltage,
            percentage = ?level.percentage,
            charging = level.charging,
            "recorded battery"
        );
        self.update(device_id, |t| t.battery = level);
        level
    }

    /// Record a wireless RSSI and return the derived level.
    pub fn record_wireless(&self, device_id: &str, rssi: i32) -> WirelessLevel {
        let level = WirelessLevel::from_rssi(Some(rssi));
        debug!(device = device_id, rssi, percentage = ?level.percentage, "recorded wireless");
        self.update(device_id, |t| t.wireless = level);
        level
    }

    /// Current readings for a device; unknown devices get all-undefined values.
    pub fn get(&self, device_id: &str) -> DeviceTelemetry {
        let devices = self.devices.read().unwrap_or_else(PoisonError::into_inner);
        devices
            .get(&device_id.to_lowercase())
            .copied()
            .unwrap_or_default()
    }

    pub fn battery(&self, device_id: &str) -> BatteryLevel {
        self.get(device_id).battery
    }

    pub fn wireless(&self, device_id: &str) -> WirelessLevel {
        self.get(device_id).wireless
    }

    fn update(&self, device_id: &str, apply: impl FnOnce(&mut DeviceTelemetry)) {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        apply(devices.entry(device_id.to_lowercase()).or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_band_edges() {
        assert_eq!(BatteryLevel::from_voltage(Some(3.2)).percentage, Some(0));
        assert_eq!(BatteryLevel::from_voltage(Some(4.2)).percentage, Some(100));
        assert_eq!(BatteryLevel::from_voltage(Some(3.85)).percentage, Some(65));
    }

    #[test]
    fn test_battery_clamped_outside_band() {
        assert_eq!(BatteryLevel::from_voltage(Some(2.5)).percentage, Some(0));
        assert_eq!(BatteryLevel::from_voltage(Some(4.4)).percentage, Some(100));
        assert_eq!(BatteryLevel::from_voltage(Some(4.5)).percentage, Some(100));
        assert!(!BatteryLevel::from_voltage(Some(4.5)).charging);
    }

    #[test]
    fn test_battery_charging() {
        let level = BatteryLevel::from_voltage(Some(4.51));
        assert!(level.charging);
        assert_eq!(level.percentage, None);
        assert_eq!(level.voltage, None);
    }

    #[test]
    fn test_battery_unknown() {
        let level = BatteryLevel::from_voltage(None);
        assert!(!level.charging);
        assert_eq!(level.percentage, None);
        assert_eq!(level.voltage, None);
    }

    #[test]
    fn test_battery_non_finite_is_no_reading() {
        for voltage in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert_eq!(BatteryLevel::from_voltage(Some(voltage)), BatteryLevel::default());
        }
    }

    #[test]
    fn test_wireless_percentages() {
        assert_eq!(WirelessLevel::from_rssi(Some(-90)).percentage, Some(0));
        assert_eq!(WirelessLevel::from_rssi(Some(-120)).percentage, Some(0));
        assert_eq!(WirelessLevel::from_rssi(Some(-30)).percentage, Some(100));
        assert_eq!(WirelessLevel::from_rssi(Some(-10)).percentage, Some(100));
        assert_eq!(WirelessLevel::from_rssi(Some(-60)).percentage, Some(50));
        assert_eq!(WirelessLevel::from_rssi(Some(-75)).percentage, Some(25));
        assert_eq!(WirelessLevel::from_rssi(Some(i32::MAX)).percentage, Some(100));
        assert_eq!(WirelessLevel::from_rssi(Some(i32::MIN)).percentage, Some(0));
        assert_eq!(WirelessLevel::from_rssi(None).percentage, None);
    }

    #[test]
    fn test_store_is_case_insensitive_and_last_write_wins() {
        let store = TelemetryStore::new();
        store.record_battery("AABBCC", 3.5);
        store.record_battery("aabbcc", 4.0);
        store.record_wireless("AaBbCc", -60);

        let t = store.get("AABBCC");
        assert_eq!(t.battery.percentage, Some(80));
        assert_eq!(t.wireless.rssi, Some(-60));
        assert_eq!(store.get("unknown"), DeviceTelemetry::default());
    }
}
