use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::user::UserId;

/// Wall-clock firing time of a job, normalized to a whole minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobFireTime(NaiveTime);

impl JobFireTime {
    pub fn new(inner: NaiveTime) -> Self {
        let normalized_time = inner
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .expect("Will never fail.");
        Self(normalized_time)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// The zero-padded `HHMM` form used in command input and persisted documents.
    pub fn storage_key(&self) -> String {
        format!("{:02}{:02}", self.hour(), self.minute())
    }
}

impl fmt::Display for JobFireTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected a 4-digit time in 24h format")]
pub struct FireTimeParseError;

impl FromStr for JobFireTime {
    type Err = FireTimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FireTimeParseError);
        }

        let hour = s[..2].parse::<u32>().map_err(|_| FireTimeParseError)?;
        let minute = s[2..].parse::<u32>().map_err(|_| FireTimeParseError)?;

        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(JobFireTime::new)
            .ok_or(FireTimeParseError)
    }
}

impl Serialize for JobFireTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.storage_key())
    }
}

impl<'de> Deserialize<'de> for JobFireTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Whole-hour UTC offset attached to a user and frozen into each job at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub struct TzOffset(i8);

impl TzOffset {
    pub const MIN_HOURS: i8 = -12;
    pub const MAX_HOURS: i8 = 14;

    /// Offset assumed for accounts that never ran /settimezone.
    pub const DEFAULT: TzOffset = TzOffset(8);

    pub fn new(hours: i8) -> Option<Self> {
        (Self::MIN_HOURS..=Self::MAX_HOURS)
            .contains(&hours)
            .then_some(Self(hours))
    }

    pub fn hours(self) -> i8 {
        self.0
    }
}

impl fmt::Display for TzOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

#[derive(Debug, Error)]
#[error("timezone offset must be an integer between -12 and 14")]
pub struct OffsetOutOfRange;

impl TryFrom<i8> for TzOffset {
    type Error = OffsetOutOfRange;

    fn try_from(hours: i8) -> Result<Self, Self::Error> {
        TzOffset::new(hours).ok_or(OffsetOutOfRange)
    }
}

impl From<TzOffset> for i8 {
    fn from(offset: TzOffset) -> Self {
        offset.0
    }
}

/// UTC minute-of-day a job fires in, used as the trigger index key.
///
/// Kept as plain minutes internally; the zero-padded `HHMM` string only
/// appears at the store boundary via `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey(u16);

impl BucketKey {
    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Self((instant.hour() * 60 + instant.minute()) as u16)
    }

    pub fn for_job(fire_at: JobFireTime, tz: TzOffset) -> Self {
        let utc_hour = (24 + fire_at.hour() as i32 - tz.hours() as i32).rem_euclid(24) as u16;
        Self(utc_hour * 60 + fire_at.minute() as u16)
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}", self.hour(), self.minute())
    }
}

/// One recurring reminder. Absent day/date/month lists mean the job fires
/// every day at `fire_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "time")]
    pub fire_at: JobFireTime,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<Vec<u8>>,
    pub tz: TzOffset,
}

impl Job {
    pub fn bucket_key(&self) -> BucketKey {
        BucketKey::for_job(self.fire_at, self.tz)
    }
}

/// A parsed /set command, before the owning user's offset is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub fire_at: JobFireTime,
    pub message: String,
    pub day: Option<Vec<u8>>,
    pub date: Option<Vec<u8>>,
    pub month: Option<Vec<u8>>,
}

impl NewJob {
    pub fn into_job(self, tz: TzOffset) -> Job {
        Job {
            fire_at: self.fire_at,
            message: self.message,
            day: self.day,
            date: self.date,
            month: self.month,
            tz,
        }
    }
}

/// Contents of one trigger bucket: every job firing in that UTC minute,
/// grouped by owning user.
pub type TriggerBucket = HashMap<UserId, Vec<Job>>;
