use chrono::{Datelike, NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::model::OpeningHours;

/// Day keys of the weekly `{day: {open, close}}` shape, Sunday first.
pub const DAY_KEYS: [&str; 7] = [
    "domingo", "segunda", "terca", "quarta", "quinta", "sexta", "sabado",
];

/// Day prefixes of Google's `weekday_descriptions`, Sunday first.
const WEEKDAY_NAMES: [&str; 7] = [
    "domingo",
    "segunda-feira",
    "terça-feira",
    "quarta-feira",
    "quinta-feira",
    "sexta-feira",
    "sábado",
];

static RANGE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[–-]\s*").expect("valid range separator regex"));
static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}):(\d{2})").expect("valid clock regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenStatus {
    pub is_open: bool,
    pub opens_at: Option<String>,
    pub closes_at: Option<String>,
}

impl OpenStatus {
    fn closed() -> Self {
        Self {
            is_open: false,
            opens_at: None,
            closes_at: None,
        }
    }
}

fn clock_minutes(s: &str) -> Option<u32> {
    let caps = CLOCK.captures(s)?;
    let h: u32 = caps[1].parse().ok()?;
    let m: u32 = caps[2].parse().ok()?;
    Some(h * 60 + m)
}

/// `HH:MM` with `HH <= 24` and `MM < 60`, anything else is malformed.
fn strict_minutes(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.parse().ok().filter(|h| *h <= 24)?;
    let m: u32 = m.parse().ok().filter(|m| *m < 60)?;
    Some(h * 60 + m)
}

/// `close <= open` is an overnight range that wraps midnight.
fn in_range(now: u32, open: u32, close: u32) -> bool {
    if close > open {
        now >= open && now < close
    } else {
        now >= open || now < close
    }
}

/// Whether a restaurant is open at `at` (local wall-clock time).
///
/// Malformed hours never fail: they read as closed.
pub fn open_status(hours: &OpeningHours, at: NaiveDateTime) -> OpenStatus {
    let day_idx = at.weekday().num_days_from_sunday() as usize;
    let now = at.hour() * 60 + at.minute();

    if let Some(descriptions) = &hours.weekday_descriptions {
        return described_status(descriptions, hours.open_now, day_idx, now);
    }

    let Some(day) = hours.day(DAY_KEYS[day_idx]) else {
        return OpenStatus::closed();
    };
    if day.open.is_empty() || day.close.is_empty() {
        return OpenStatus::closed();
    }

    let is_open = match (strict_minutes(&day.open), strict_minutes(&day.close)) {
        (Some(open), Some(close)) => in_range(now, open, close),
        _ => false,
    };

    OpenStatus {
        is_open,
        opens_at: Some(day.open),
        closes_at: Some(day.close),
    }
}

fn described_status(
    descriptions: &[String],
    open_now: Option<bool>,
    day_idx: usize,
    now: u32,
) -> OpenStatus {
    let today = WEEKDAY_NAMES[day_idx];
    let Some(description) = descriptions
        .iter()
        .find(|d| d.to_lowercase().starts_with(today))
    else {
        return OpenStatus {
            is_open: open_now.unwrap_or(false),
            opens_at: None,
            closes_at: None,
        };
    };

    let Some((_, times)) = description.split_once(':') else {
        return OpenStatus::closed();
    };
    let times = times.trim();
    let lowered = times.to_lowercase();
    if lowered.contains("fechado") || lowered.contains("closed") {
        return OpenStatus::closed();
    }

    let mut first_open: Option<String> = None;
    let mut last_close: Option<String> = None;

    for range in times.split(',').map(str::trim) {
        let parts: Vec<&str> = RANGE_SEPARATOR.split(range).collect();
        if parts.len() != 2 {
            continue;
        }

        let open_time = parts[0].trim();
        let close_time = parts[1].trim();
        if first_open.is_none() {
            first_open = Some(open_time.to_string());
        }
        last_close = Some(close_time.to_string());

        if let (Some(open), Some(close)) = (clock_minutes(open_time), clock_minutes(close_time)) {
            if in_range(now, open, close) {
                return OpenStatus {
                    is_open: true,
                    opens_at: Some(open_time.to_string()),
                    closes_at: Some(close_time.to_string()),
                };
            }
        }
    }

    OpenStatus {
        is_open: false,
        opens_at: first_open,
        closes_at: last_close,
    }
}
