//! Civil time for the clinic's fixed UTC+7 calendar.
//!
//! Every wall-clock rule in the scheduling engine is expressed in clinic
//! civil time and converted to absolute instants through this module. The
//! offset is fixed and has no daylight-saving transitions, so every
//! conversion is total and the host timezone is never consulted.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc, Weekday};

/// Fixed clinic offset: UTC+7.
pub const CLINIC_OFFSET_SECONDS: i32 = 7 * 3600;

fn clinic_offset() -> FixedOffset {
    // A 7-hour offset is always representable.
    FixedOffset::east_opt(CLINIC_OFFSET_SECONDS).unwrap()
}

/// Instant of clinic-local midnight on the given civil date.
pub fn midnight_instant(date: NaiveDate) -> DateTime<Utc> {
    combine(date, NaiveTime::MIN)
}

/// Combine a civil date and wall-clock time into an absolute instant.
pub fn combine(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    // A fixed offset maps every local datetime to exactly one instant.
    date.and_time(time)
        .and_local_timezone(clinic_offset())
        .unwrap()
        .with_timezone(&Utc)
}

/// Civil date an instant falls on in clinic time.
pub fn local_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&clinic_offset()).date_naive()
}

/// Wall-clock time of an instant in clinic time.
pub fn local_time(instant: DateTime<Utc>) -> NaiveTime {
    instant.with_timezone(&clinic_offset()).time()
}

/// Weekday code for a civil date: 1 = Sunday .. 7 = Saturday.
///
/// Computed directly from the calendar date, never by converting an
/// instant back through the offset, so day boundaries cannot skew it.
pub fn weekday_code(date: NaiveDate) -> u8 {
    match date.weekday() {
        Weekday::Sun => 1,
        Weekday::Mon => 2,
        Weekday::Tue => 3,
        Weekday::Wed => 4,
        Weekday::Thu => 5,
        Weekday::Fri => 6,
        Weekday::Sat => 7,
    }
}

/// Minutes since local midnight.
pub fn minute_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) / 60
}

/// Wall-clock time for a minute-of-day value. Values outside a single
/// day are clamped to the last minute.
pub fn time_from_minute(minute: i64) -> NaiveTime {
    let clamped = minute.clamp(0, 24 * 60 - 1) as u32;
    NaiveTime::from_hms_opt(clamped / 60, clamped % 60, 0).unwrap()
}

pub fn parse_ymd(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
