//! Booking draft: form validation, local time composition, day count and price.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NOTE_MAX_CHARS: usize = 140;

// Allowed time-of-day window, minutes after midnight
const EARLIEST_MINUTE: u32 = 60;
const LATEST_MINUTE: u32 = 23 * 60 + 59;
const DEFAULT_TIME: &str = "01:00";

const SECONDS_PER_DAY: i64 = 86_400;

// Per-day extras, THB
pub const CHILD_SEAT_PER_DAY: f64 = 150.0;
pub const GPS_PER_DAY: f64 = 100.0;
pub const FULL_INSURANCE_PER_DAY: f64 = 300.0;

const SUMMARY_PATH: &str = "/booking/summary";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("กรุณากรอกข้อมูลให้ครบ: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("วันหรือเวลาไม่ถูกต้อง")]
    InvalidDateTime,

    #[error("เวลาคืนรถต้องหลังเวลารับรถ")]
    ReturnNotAfterPickup,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Extras {
    pub child_seat: bool,
    pub gps: bool,
    pub full_insurance: bool,
}

impl Extras {
    pub fn per_day_total(&self) -> f64 {
        [
            (self.child_seat, CHILD_SEAT_PER_DAY),
            (self.gps, GPS_PER_DAY),
            (self.full_insurance, FULL_INSURANCE_PER_DAY),
        ]
        .iter()
        .filter(|(selected, _)| *selected)
        .map(|(_, price)| price)
        .sum()
    }

    pub fn codes(&self) -> Vec<&'static str> {
        let mut codes = Vec::new();
        if self.child_seat {
            codes.push("child_seat");
        }
        if self.gps {
            codes.push("gps");
        }
        if self.full_insurance {
            codes.push("full_insurance");
        }
        codes
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingDraft {
    pub pickup_location: String,
    pub return_location: String,
    pub pickup_date: String,
    pub pickup_time: String,
    pub return_date: String,
    pub return_time: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub extras: Extras,
    pub note: String,
}

/// Validated booking window in absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    pub pickup_at: DateTime<Utc>,
    pub return_at: DateTime<Utc>,
}

impl BookingWindow {
    pub fn days(&self) -> i64 {
        day_count(self.pickup_at, self.return_at)
    }
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
}

fn parse_time(time: &str) -> Option<NaiveTime> {
    let time = time.trim();
    NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .ok()
}

/// Combines a local date and time in `tz` into an absolute instant.
/// Missing or malformed parts give `None`; nothing is guessed.
pub fn compose_instant(date: &str, time: &str, tz: &FixedOffset) -> Option<DateTime<Utc>> {
    let date = parse_date(date)?;
    let time = parse_time(time)?;
    tz.from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
        .map(|local| local.with_timezone(&Utc))
}

/// Clamps an `HH:MM` time of day into `[01:00, 23:59]`. Malformed input gives `01:00`.
pub fn clamp_time(time: &str) -> String {
    let parts: Vec<&str> = time.trim().split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return DEFAULT_TIME.to_string();
    }
    let numbers: Option<Vec<u32>> = parts
        .iter()
        .map(|p| (!p.is_empty() && p.len() <= 2).then(|| p.parse::<u32>().ok()).flatten())
        .collect();
    let Some(numbers) = numbers else {
        return DEFAULT_TIME.to_string();
    };
    let (hours, minutes) = (numbers[0], numbers[1]);
    if minutes >= 60 || numbers.get(2).is_some_and(|s| *s >= 60) {
        return DEFAULT_TIME.to_string();
    }
    let total = (hours * 60 + minutes).clamp(EARLIEST_MINUTE, LATEST_MINUTE);
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Whole rental days, rounded up, never less than one.
pub fn day_count(pickup_at: DateTime<Utc>, return_at: DateTime<Utc>) -> i64 {
    let seconds = (return_at - pickup_at).num_seconds();
    if seconds <= 0 {
        return 1;
    }
    ((seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY).max(1)
}

pub fn total_price(daily_price: f64, days: i64, extras: &Extras) -> f64 {
    let days = days as f64;
    daily_price * days + extras.per_day_total() * days
}

impl BookingDraft {
    /// Labels of the required fields that are still empty.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("pickup_location", &self.pickup_location),
            ("pickup_date", &self.pickup_date),
            ("pickup_time", &self.pickup_time),
            ("return_date", &self.return_date),
            ("return_time", &self.return_time),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(label, _)| label)
        .collect()
    }

    pub fn can_submit(&self) -> bool {
        self.missing_required().is_empty()
    }

    pub fn pickup_instant(&self, tz: &FixedOffset) -> Option<DateTime<Utc>> {
        compose_instant(&self.pickup_date, &self.pickup_time, tz)
    }

    pub fn return_instant(&self, tz: &FixedOffset) -> Option<DateTime<Utc>> {
        compose_instant(&self.return_date, &self.return_time, tz)
    }

    /// Clamps both times of day, then pushes the return date to the day after
    /// pickup when return is not strictly later. Returns whether the return
    /// date moved.
    pub fn normalize_window(&mut self, tz: &FixedOffset) -> bool {
        if !self.pickup_time.trim().is_empty() {
            self.pickup_time = clamp_time(&self.pickup_time);
        }
        if !self.return_time.trim().is_empty() {
            self.return_time = clamp_time(&self.return_time);
        }
        self.note = cap_note(&self.note).0;

        let (Some(pickup), Some(ret)) = (self.pickup_instant(tz), self.return_instant(tz)) else {
            return false;
        };
        if ret > pickup {
            return false;
        }
        let Some(next_day) = parse_date(&self.pickup_date).and_then(|d| d.checked_add_signed(Duration::days(1))) else {
            return false;
        };
        tracing::debug!(
            pickup_date = %self.pickup_date,
            old_return_date = %self.return_date,
            new_return_date = %next_day,
            "Return was not after pickup, moving it forward a day"
        );
        self.return_date = next_day.format("%Y-%m-%d").to_string();
        true
    }

    /// Submit-time validation. No clamping happens here.
    pub fn validate(&self, tz: &FixedOffset) -> Result<BookingWindow, BookingError> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(BookingError::MissingFields(missing));
        }
        let pickup_at = self.pickup_instant(tz).ok_or(BookingError::InvalidDateTime)?;
        let return_at = self.return_instant(tz).ok_or(BookingError::InvalidDateTime)?;
        if return_at <= pickup_at {
            return Err(BookingError::ReturnNotAfterPickup);
        }
        Ok(BookingWindow { pickup_at, return_at })
    }
}

/// Note text capped at `NOTE_MAX_CHARS`; the flag says whether anything was cut.
pub fn cap_note(text: &str) -> (String, bool) {
    let mut chars = text.chars();
    let kept: String = chars.by_ref().take(NOTE_MAX_CHARS).collect();
    let truncated = chars.next().is_some();
    (kept, truncated)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteUpdate {
    pub truncated: bool,
    // True only the first time the cap is hit
    pub notify_limit: bool,
}

/// Free-text note with a hard character cap and a one-time "limit reached" notice.
#[derive(Debug, Clone, Default)]
pub struct NoteField {
    text: String,
    limit_notified: bool,
}

impl NoteField {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the whole value (typing).
    pub fn input(&mut self, proposed: &str) -> NoteUpdate {
        let (kept, truncated) = cap_note(proposed);
        self.text = kept;
        let notify_limit = truncated && !self.limit_notified;
        if notify_limit {
            self.limit_notified = true;
        }
        NoteUpdate {
            truncated,
            notify_limit,
        }
    }

    /// Appends pasted text at the end of the current value.
    pub fn paste(&mut self, pasted: &str) -> NoteUpdate {
        let combined = format!("{}{}", self.text, pasted);
        self.input(&combined)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarSelection {
    pub key: String,
    pub name: String,
    pub price_per_day: f64,
}

/// Serializes the chosen car and booking window into the summary page URL.
pub fn summary_url(car: &CarSelection, draft: &BookingDraft, window: &BookingWindow) -> String {
    let days = window.days();
    let total = total_price(car.price_per_day, days, &draft.extras);

    // Base only anchors the relative path; it never leaves this function.
    let Ok(mut url) = Url::parse("http://storefront.invalid") else {
        return SUMMARY_PATH.to_string();
    };
    url.set_path(SUMMARY_PATH);
    url.query_pairs_mut()
        .append_pair("car", &car.key)
        .append_pair("name", &car.name)
        .append_pair("price", &car.price_per_day.to_string())
        .append_pair("pickup_at", &window.pickup_at.to_rfc3339())
        .append_pair("return_at", &window.return_at.to_rfc3339())
        .append_pair("pickup_location", &draft.pickup_location)
        .append_pair("return_location", &draft.return_location)
        .append_pair("extras", &draft.extras.codes().join(","))
        .append_pair("days", &days.to_string())
        .append_pair("total", &total.to_string());

    match url.query() {
        Some(query) => format!("{SUMMARY_PATH}?{query}"),
        None => SUMMARY_PATH.to_string(),
    }
}
