//! Day keys, the day index, and the day filter.

use crate::config::DayIndexConfig;
use crate::error::{Error, Result};
use crate::photos::PhotoRecord;
use crate::tracks::TrackReference;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A calendar day within the single-season dataset, as four digits `MMDD`.
///
/// Keys compare lexically, which is also chronological order within a year.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(String);

impl DayKey {
    /// Extract the day from a `YYYY-MM-DDThh:mm:ss...` timestamp.
    ///
    /// Month is taken from characters 6-7 and day from 9-10 (1-based).
    /// Returns `None` when those positions are missing or not digits.
    pub fn from_timestamp(timestamp: &str) -> Option<Self> {
        let month = timestamp.get(5..7)?;
        let day = timestamp.get(8..10)?;
        Self::parse(&format!("{}{}", month, day)).ok()
    }

    /// Day of an 8-digit `YYYYMMDD` date token: its last four digits.
    pub fn from_date_token(token: &str) -> Option<Self> {
        if token.len() != 8 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Self::parse(&token[4..]).ok()
    }

    pub fn from_date(date: NaiveDate) -> Self {
        DayKey(date.format("%m%d").to_string())
    }

    pub fn parse(s: &str) -> Result<Self> {
        if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(DayKey(s.to_string()))
        } else {
            Err(Error::InvalidDayKey(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DayKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DayKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DayKey> for String {
    fn from(key: DayKey) -> Self {
        key.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ordered set of selectable days.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayIndex {
    days: Vec<DayKey>,
}

impl DayIndex {
    /// Every day in `start..=end`, regardless of data presence.
    pub fn fixed_range(start: NaiveDate, end: NaiveDate) -> Self {
        let days = start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(DayKey::from_date)
            .collect();
        Self { days }
    }

    /// Exactly the days present in either dataset, ascending.
    pub fn derived(photos: &[PhotoRecord], tracks: &[TrackReference]) -> Self {
        let set: BTreeSet<DayKey> = photos
            .iter()
            .map(|p| p.day_key.clone())
            .chain(tracks.iter().map(|t| t.day_key.clone()))
            .collect();
        Self {
            days: set.into_iter().collect(),
        }
    }

    pub fn from_config(
        config: &DayIndexConfig,
        photos: &[PhotoRecord],
        tracks: &[TrackReference],
    ) -> Self {
        match config {
            DayIndexConfig::FixedRange { start, end } => Self::fixed_range(*start, *end),
            DayIndexConfig::Derived => Self::derived(photos, tracks),
        }
    }

    pub fn days(&self) -> &[DayKey] {
        &self.days
    }

    pub fn first(&self) -> Option<&DayKey> {
        self.days.first()
    }

    /// Fixed ranges are in calendar order, which is not key order when the
    /// range crosses a new year, so this is a linear scan.
    pub fn contains(&self, day: &DayKey) -> bool {
        self.days.contains(day)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }
}

/// One day's share of both datasets.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySlice<'a> {
    pub day: DayKey,
    pub photos: Vec<&'a PhotoRecord>,
    pub tracks: Vec<&'a TrackReference>,
}

impl DaySlice<'_> {
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty() && self.tracks.is_empty()
    }
}

/// Select the photos and track references whose day key equals `day`.
///
/// Exact match only; input order is preserved.
pub fn filter_day<'a>(
    photos: &'a [PhotoRecord],
    tracks: &'a [TrackReference],
    day: &DayKey,
) -> DaySlice<'a> {
    DaySlice {
        day: day.clone(),
        photos: photos.iter().filter(|p| &p.day_key == day).collect(),
        tracks: tracks.iter().filter(|t| &t.day_key == day).collect(),
    }
}
