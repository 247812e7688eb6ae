//! MS-DOS and extended timestamp resolution.
//!
//! ZIP carries no authoritative time zone. The DOS fields are decoded as
//! UTC; when an extra field supplies a real instant, the delta between the
//! two is taken as the writer's UTC offset.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

use super::structures::TimeSource;

const OFFSET_STEP: i64 = 15 * 60; // E.g., Nepal at +5:45
const MIN_OFFSET: i64 = -12 * 3600; // E.g., Baker island at -12:00
const MAX_OFFSET: i64 = 14 * 3600; // E.g., Line island at +14:00

/// Seconds between 1601-01-01 and 1970-01-01.
const NTFS_EPOCH_DELTA: i64 = 11_644_473_600;

/// Decodes MS-DOS date and time fields at 2 second resolution.
///
/// Out of range fields carry over the way a calendar normalisation would
/// (month 0 is December of the previous year, day 0 the last day of the
/// previous month), so every bit pattern yields an instant.
pub fn dos_to_naive(dos_date: u16, dos_time: u16) -> NaiveDateTime {
    // date bits 0-4: day of month; 5-8: month; 9-15: years since 1980
    let year = (dos_date >> 9) as i32 + 1980;
    let month = ((dos_date >> 5) & 0xf) as i32;
    let day = (dos_date & 0x1f) as i64;

    // time bits 0-4: second/2; 5-10: minute; 11-15: hour
    let hour = (dos_time >> 11) as i64;
    let minute = ((dos_time >> 5) & 0x3f) as i64;
    let second = ((dos_time & 0x1f) * 2) as i64;

    let months = year * 12 + month - 1;
    let first_of_month =
        NaiveDate::from_ymd_opt(months.div_euclid(12), months.rem_euclid(12) as u32 + 1, 1)
            .unwrap_or_default()
            .and_time(Default::default());

    first_of_month
        + Duration::days(day - 1)
        + Duration::seconds(hour * 3600 + minute * 60 + second)
}

/// Converts 100 ns ticks since 1601-01-01 UTC.
pub fn from_ntfs_ticks(ticks: u64) -> Option<DateTime<Utc>> {
    let ticks = ticks as i64;
    let secs = ticks.div_euclid(10_000_000) - NTFS_EPOCH_DELTA;
    let nanos = (ticks.rem_euclid(10_000_000) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Converts seconds since the Unix epoch.
pub fn from_unix(secs: u32) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs as i64, 0)
}

/// Rounds `delta` to the nearest 15 minutes, collapsing anything outside
/// [-12h, +14h] to zero.
pub fn offset_from_delta(delta: Duration) -> FixedOffset {
    let secs = delta.num_seconds();
    let half = OFFSET_STEP / 2;
    let rounded = if secs >= 0 {
        (secs + half) / OFFSET_STEP * OFFSET_STEP
    } else {
        -((-secs + half) / OFFSET_STEP * OFFSET_STEP)
    };
    let rounded = if (MIN_OFFSET..=MAX_OFFSET).contains(&rounded) {
        rounded
    } else {
        0
    };
    FixedOffset::east_opt(rounded as i32).unwrap_or_else(|| Utc.fix())
}

/// Picks the final modification time for an entry.
pub fn resolve_modified(
    dos_date: u16,
    dos_time: u16,
    extended: Option<DateTime<Utc>>,
) -> (DateTime<FixedOffset>, TimeSource) {
    let dos = Utc.from_utc_datetime(&dos_to_naive(dos_date, dos_time));
    match extended {
        None => (dos.fixed_offset(), TimeSource::Dos),
        Some(modified) if dos_date == 0 && dos_time == 0 => {
            (modified.fixed_offset(), TimeSource::Extended)
        }
        Some(modified) => {
            // The DOS fields hold local wall time, so their distance from
            // the real instant is the writer's offset.
            let offset = offset_from_delta(dos - modified);
            (modified.with_timezone(&offset), TimeSource::Extended)
        }
    }
}
