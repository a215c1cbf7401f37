//! # Refresh Scheduling
//!
//! Decides which instant a device's next image shows and how long the device
//! should sleep before polling again. Render instants are aligned to
//! multiples of the refresh interval since the Unix epoch, so every request
//! inside one interval maps to the same instant (and the same image file).
//!
//! Low batteries stretch the interval: below 30% it is at least 15 minutes,
//! below 10% at least an hour.
//!
//! A device that would wake up less than a minute from now is instead sent
//! the next interval's image, with its sleep padded by 30 seconds so it
//! wakes just after that image's instant rather than just before it.

use chrono::{DateTime, Utc};

const LOW_BATTERY_PERCENT: u8 = 30;
const CRITICAL_BATTERY_PERCENT: u8 = 10;
const LOW_BATTERY_INTERVAL_SECS: u32 = 900;
const CRITICAL_BATTERY_INTERVAL_SECS: u32 = 3600;

/// Polls closer than this to the next boundary skip ahead one interval.
const MIN_POLL_SECS: i64 = 60;
/// Extra sleep added when skipping ahead.
const SKIP_PADDING_SECS: i64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    /// Instant the served image depicts
    pub render_instant: DateTime<Utc>,
    /// Seconds the device should wait before polling again
    pub next_poll_secs: u32,
}

/// Interval after applying the battery floors.
pub fn effective_interval(interval_secs: u32, battery_percentage: Option<u8>) -> u32 {
    match battery_percentage {
        Some(p) if p < CRITICAL_BATTERY_PERCENT => interval_secs.max(CRITICAL_BATTERY_INTERVAL_SECS),
        Some(p) if p < LOW_BATTERY_PERCENT => interval_secs.max(LOW_BATTERY_INTERVAL_SECS),
        _ => interval_secs,
    }
}

/// Schedule for a device polling at `now`.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use paperboard::scheduler::next_instant;
///
/// let now = Utc.timestamp_opt(650, 0).unwrap();
/// let schedule = next_instant(now, 600, None);
/// assert_eq!(schedule.render_instant.timestamp(), 600);
/// assert_eq!(schedule.next_poll_secs, 550);
/// ```
pub fn next_instant(now: DateTime<Utc>, interval_secs: u32, battery_percentage: Option<u8>) -> Schedule {
    let interval = i64::from(effective_interval(interval_secs, battery_percentage).max(1));
    let now_secs = now.timestamp();

    let mut render_secs = now_secs.div_euclid(interval) * interval;
    let mut poll_secs = render_secs + interval - now_secs;
    if poll_secs < MIN_POLL_SECS {
        render_secs += interval;
        poll_secs = interval + SKIP_PADDING_SECS;
    }

    Schedule {
        render_instant: DateTime::from_timestamp(render_secs, 0).unwrap_or(now),
        next_poll_secs: u32::try_from(poll_secs).unwrap_or(u32::MAX),
    }
}
