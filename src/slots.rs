//! Slot arithmetic for the booking calendar.
//!
//! Everything here is pure: callers load the business window, booked
//! appointments and blocked windows for a day and hand them in as
//! [`Interval`]s. Intervals are half-open, `[start, end)`.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of one bookable slot in minutes.
pub const SLOT_MINUTES: u16 = 30;

const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("invalid time '{0}', expected HH:MM")]
    Malformed(String),
    #[error("appointment would run past midnight")]
    PastMidnight,
    #[error("end time must be after start time")]
    EmptyInterval,
}

/// Minutes since midnight, rendered as `HH:MM`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Adds `minutes`, refusing to roll over into the next day.
    pub fn checked_add(self, minutes: u16) -> Result<Self, TimeError> {
        self.0
            .checked_add(minutes)
            .and_then(Self::from_minutes)
            .ok_or(TimeError::PastMidnight)
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || TimeError::Malformed(value.to_string());
        let (hours, minutes) = value.trim().split_once(':').ok_or_else(malformed)?;
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
            return Err(malformed());
        }
        // `u16::from_str` alone would take a leading `+`.
        if !digits(hours) || !digits(minutes) {
            return Err(malformed());
        }
        let hours: u16 = hours.parse().map_err(|_| malformed())?;
        let minutes: u16 = minutes.parse().map_err(|_| malformed())?;
        if hours >= 24 || minutes >= 60 {
            return Err(malformed());
        }
        Ok(Self(hours * 60 + minutes))
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Interval {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, TimeError> {
        if start >= end {
            return Err(TimeError::EmptyInterval);
        }
        Ok(Self { start, end })
    }

    pub fn with_duration(start: TimeOfDay, minutes: u16) -> Result<Self, TimeError> {
        Self::new(start, start.checked_add(minutes)?)
    }

    /// Parses a stored `(start, end)` pair of `HH:MM` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, TimeError> {
        Self::new(start.parse()?, end.parse()?)
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Weekday index used by schedules: 0 is Sunday, 6 is Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Walks the business window in [`SLOT_MINUTES`] steps from opening time and
/// keeps every start whose slot fits before closing and overlaps nothing in
/// `busy`. A missing window means the shop is closed.
pub fn available_slots(window: Option<Interval>, busy: &[Interval]) -> Vec<TimeOfDay> {
    let Some(window) = window else {
        return Vec::new();
    };

    let mut slots = Vec::new();
    let mut start = window.start;
    while let Ok(slot) = Interval::with_duration(start, SLOT_MINUTES) {
        if slot.end > window.end {
            break;
        }
        if !busy.iter().any(|taken| taken.overlaps(&slot)) {
            slots.push(slot.start);
        }
        start = slot.end;
    }
    slots
}

/// True when `proposed` overlaps any of the `booked` intervals.
pub fn has_conflict(booked: &[Interval], proposed: &Interval) -> bool {
    booked.iter().any(|taken| taken.overlaps(proposed))
}
