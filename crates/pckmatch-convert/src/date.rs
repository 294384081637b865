use std::fmt;
use std::str::FromStr;

use crate::error::{ConvertError, Result};

const SECONDS_PER_DAY: i64 = 86_400;

/// Proleptic Gregorian calendar date.
///
/// Only what the BCD date codec and the index version stamp need: validated
/// construction, Unix-day conversion and `YYYYMMDD` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    year: i32,
    month: u8,
    day: u8,
}

impl Date {
    /// 1970-01-01.
    pub const UNIX_EPOCH: Date = Date {
        year: 1970,
        month: 1,
        day: 1,
    };

    /// Build a date, rejecting impossible month/day combinations.
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self> {
        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return Err(ConvertError::InvalidDate(format!(
                "{year:04}-{month:02}-{day:02}"
            )));
        }
        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// Date `days` after 1970-01-01 (negative goes back).
    pub fn from_unix_days(days: i64) -> Self {
        // Shift the era to start on 0000-03-01 so leap days fall last.
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z.rem_euclid(146_097);
        let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
        let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
        let year = yoe + era * 400 + i64::from(month <= 2);
        Self {
            year: year as i32,
            month,
            day,
        }
    }

    /// Days since 1970-01-01.
    pub fn to_unix_days(&self) -> i64 {
        let month = i64::from(self.month);
        let year = i64::from(self.year) - i64::from(month <= 2);
        let era = year.div_euclid(400);
        let yoe = year.rem_euclid(400);
        let mp = if month > 2 { month - 3 } else { month + 9 };
        let doy = (153 * mp + 2) / 5 + i64::from(self.day) - 1;
        let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
        era * 146_097 + doe - 719_468
    }

    /// UTC date of a Unix timestamp in seconds.
    pub fn from_timestamp(secs: i64) -> Self {
        Self::from_unix_days(secs.div_euclid(SECONDS_PER_DAY))
    }

    /// Unix timestamp of midnight UTC.
    pub fn to_timestamp(&self) -> i64 {
        self.to_unix_days() * SECONDS_PER_DAY
    }

    /// Compact `YYYYMMDD` form used on the wire.
    pub fn to_compact(&self) -> String {
        format!("{:04}{:02}{:02}", self.year, self.month, self.day)
    }

    /// Parse the compact `YYYYMMDD` form.
    pub fn parse_compact(text: &str) -> Result<Self> {
        let invalid = || ConvertError::InvalidDate(text.to_owned());
        if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year = text[..4].parse().map_err(|_| invalid())?;
        let month = text[4..6].parse().map_err(|_| invalid())?;
        let day = text[6..].parse().map_err(|_| invalid())?;
        Self::new(year, month, day)
    }
}

impl Default for Date {
    fn default() -> Self {
        Self::UNIX_EPOCH
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for Date {
    type Err = ConvertError;

    /// Accepts `YYYY-MM-DD` or `YYYYMMDD`.
    fn from_str(text: &str) -> Result<Self> {
        if text.len() == 10 && text.as_bytes()[4] == b'-' && text.as_bytes()[7] == b'-' {
            return Self::parse_compact(&text.replace('-', ""));
        }
        Self::parse_compact(text)
    }
}

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}
