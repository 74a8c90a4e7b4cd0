//! Calendar arithmetic for the daily planning horizon.
//!
//! The planner is strictly day-granular, so days are stored as an ordinal
//! count from the Common Era epoch. That makes horizon offsets O(1) integer
//! arithmetic and keeps graph node keys small, cheaply hashable and ordered.
//! `chrono::NaiveDate` appears only at the I/O boundary; serialization uses
//! the ISO-8601 date form.

use crate::error::{VltError, VltResult};
use chrono::{Datelike, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// A calendar day as a day count from CE (see `chrono::Datelike::num_days_from_ce`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Day(i32);

/// Day of week, Monday = 1 through Sunday = 7.
///
/// Used as part of the capacity-history bucket key: the same physical truck
/// slot recurs weekly, so observations are pooled per weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

impl Day {
    #[inline]
    pub fn from_date(date: NaiveDate) -> Self {
        Day(date.num_days_from_ce())
    }

    /// Convenience constructor, mostly for tests and fixtures.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> VltResult<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Day::from_date)
            .ok_or_else(|| {
                VltError::Validation(format!(
                    "invalid calendar date {year:04}-{month:02}-{day:02}"
                ))
            })
    }

    /// Fails only when arithmetic has pushed the ordinal outside the range
    /// chrono can represent.
    #[inline]
    pub fn to_date(self) -> VltResult<NaiveDate> {
        NaiveDate::from_num_days_from_ce_opt(self.0).ok_or_else(|| {
            VltError::Validation(format!(
                "day ordinal {} outside the supported calendar range",
                self.0
            ))
        })
    }

    /// Raw ordinal value, useful as a dense index offset.
    #[inline]
    pub fn ordinal(self) -> i32 {
        self.0
    }

    #[inline]
    pub fn succ(self) -> Day {
        Day(self.0 + 1)
    }

    #[inline]
    pub fn pred(self) -> Day {
        Day(self.0 - 1)
    }

    pub fn weekday(self) -> VltResult<Weekday> {
        Ok(match self.to_date()?.weekday() {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        })
    }

    /// Inclusive iterator over `[self, last]`.
    pub fn range_inclusive(self, last: Day) -> impl Iterator<Item = Day> {
        (self.0..=last.0).map(Day)
    }
}

impl Add<i32> for Day {
    type Output = Day;
    fn add(self, rhs: i32) -> Day {
        Day(self.0 + rhs)
    }
}

impl AddAssign<i32> for Day {
    fn add_assign(&mut self, rhs: i32) {
        self.0 += rhs;
    }
}

impl Sub<i32> for Day {
    type Output = Day;
    fn sub(self, rhs: i32) -> Day {
        Day(self.0 - rhs)
    }
}

impl SubAssign<i32> for Day {
    fn sub_assign(&mut self, rhs: i32) {
        self.0 -= rhs;
    }
}

/// Difference between two days, in days.
impl Sub<Day> for Day {
    type Output = i32;
    fn sub(self, rhs: Day) -> i32 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Out-of-range ordinals fall back to the raw count; Display must not
        // fail and such a day cannot be spelled as a date anyway.
        match NaiveDate::from_num_days_from_ce_opt(self.0) {
            Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            None => write!(f, "day#{}", self.0),
        }
    }
}

impl FromStr for Day {
    type Err = chrono::ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Day::from_date)
    }
}

impl Serialize for Day {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Day {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
