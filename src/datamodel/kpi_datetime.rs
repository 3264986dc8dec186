use crate::error::{KpiError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

pub type KpiDateTime = hifitime::Epoch;

const SECONDS_PER_MINUTE: i64 = 60;

static CALENDAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})[T ](\d{2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?\s*(?:Z|UTC|[+-]00:?00)?$",
    )
    .expect("calendar timestamp regex must compile")
});

/// An absolute UTC instant aligned on a whole minute.
///
/// Stored as unix seconds so that it can be used as an ordered map key.
/// Raw collector timestamps are rounded to the nearest minute, with ties
/// going to the even minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Minute(i64);

impl Minute {
    /// `None` when the instant does not fit in whole-minute unix seconds.
    pub fn from_unix_seconds(seconds: f64) -> Option<Self> {
        let minutes = (seconds / SECONDS_PER_MINUTE as f64).round_ties_even();
        if !minutes.is_finite() || minutes.abs() >= i64::MAX as f64 {
            return None;
        }
        (minutes as i64).checked_mul(SECONDS_PER_MINUTE).map(Minute)
    }

    pub fn from_unix_seconds_i64(seconds: i64) -> Self {
        let quotient = seconds.div_euclid(SECONDS_PER_MINUTE);
        let remainder = seconds.rem_euclid(SECONDS_PER_MINUTE);
        let half = SECONDS_PER_MINUTE / 2;
        let minutes = if remainder > half || (remainder == half && quotient % 2 != 0) {
            quotient + 1
        } else {
            quotient
        };
        Minute(minutes * SECONDS_PER_MINUTE)
    }

    pub fn unix_seconds(self) -> i64 {
        self.0
    }

    pub fn to_datetime(self) -> KpiDateTime {
        KpiDateTime::from_unix_seconds(self.0 as f64)
    }

    pub fn from_datetime(datetime: KpiDateTime) -> Option<Self> {
        Self::from_unix_seconds(datetime.to_unix_seconds())
    }

    /// Parse either epoch seconds or a calendar timestamp such as
    /// `2023-06-01 12:34:00`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Ok(seconds) = text.parse::<i64>() {
            if seconds.checked_abs().is_none_or(|abs| abs > i64::MAX - SECONDS_PER_MINUTE) {
                return Err(KpiError::invalid_data_format("timestamp out of range", text));
            }
            return Ok(Self::from_unix_seconds_i64(seconds));
        }
        if let Ok(seconds) = text.parse::<f64>() {
            if seconds.is_finite() {
                return Self::from_unix_seconds(seconds)
                    .ok_or_else(|| KpiError::invalid_data_format("timestamp out of range", text));
            }
        }

        let captures = CALENDAR_REGEX
            .captures(text)
            .ok_or_else(|| KpiError::invalid_data_format("unrecognised timestamp", text))?;
        let field = |i: usize| -> u32 {
            captures
                .get(i)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(0)
        };
        let (year, month, day) = (field(1) as i32, field(2), field(3));
        let (hour, minute, second) = (field(4), field(5), field(6));
        if !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
            || hour > 23
            || minute > 59
            || second > 60
        {
            return Err(KpiError::invalid_data_format(
                "timestamp out of range",
                text,
            ));
        }

        let datetime = KpiDateTime::from_gregorian_utc_hms(
            year,
            month as u8,
            day as u8,
            hour as u8,
            minute as u8,
            second as u8,
        );
        Self::from_datetime(datetime)
            .ok_or_else(|| KpiError::invalid_data_format("timestamp out of range", text))
    }
}

impl fmt::Display for Minute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (year, month, day, hour, minute, second, _) = self.to_datetime().to_gregorian_utc();
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            year, month, day, hour, minute, second
        )
    }
}
