//! Precision-carrying date and time values
//!
//! FHIRPath temporal literals record how much of the value was written:
//! `@2020-01` is a month-precision date, not January 1st. Strict equality is
//! only decidable when both operands carry the same precision; ordering and
//! equivalence compare at the common precision. Calendar arithmetic clamps
//! day-of-month on month/year steps.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::cmp::Ordering;
use std::fmt;

/// How much of a temporal value was specified
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemporalPrecision {
    /// Year only
    Year,
    /// Year and month
    Month,
    /// Full date
    Day,
    /// Hour
    Hour,
    /// Hour and minute
    Minute,
    /// Down to seconds
    Second,
    /// Fractional seconds
    Millisecond,
}

/// Date with declared precision; unspecified components default to 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    /// Underlying date, padded with month/day 1 as needed
    pub date: NaiveDate,
    /// Declared precision (Year, Month or Day)
    pub precision: TemporalPrecision,
}

/// Time-of-day with declared precision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    /// Underlying time, padded with zeroes as needed
    pub time: NaiveTime,
    /// Declared precision (Hour through Millisecond)
    pub precision: TemporalPrecision,
}

/// Date-and-time with declared precision and optional timezone offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    /// Underlying civil datetime, padded as needed
    pub datetime: NaiveDateTime,
    /// Timezone offset when one was written
    pub offset: Option<FixedOffset>,
    /// Declared precision
    pub precision: TemporalPrecision,
}

impl Date {
    /// Parse a date literal tier: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.splitn(3, '-');
        let year: i32 = parts.next()?.parse().ok()?;
        let (month, precision) = match parts.next() {
            Some(m) => (m.parse::<u32>().ok()?, TemporalPrecision::Month),
            None => (1, TemporalPrecision::Year),
        };
        let (day, precision) = match parts.next() {
            Some(d) => (d.parse::<u32>().ok()?, TemporalPrecision::Day),
            None => (1, precision),
        };
        Some(Self {
            date: NaiveDate::from_ymd_opt(year, month, day)?,
            precision,
        })
    }

    /// Calendar addition; `amount` may be negative
    pub fn add(&self, unit: CalendarUnit, amount: i64) -> Option<Date> {
        let date = add_to_date(self.date, unit, amount)?;
        Some(Date {
            date,
            precision: self.precision,
        })
    }
}

impl Time {
    /// Parse a time literal tier: `hh`, `hh:mm`, `hh:mm:ss`, `hh:mm:ss.fff`
    pub fn parse(text: &str) -> Option<Self> {
        let (hms, fraction) = match text.split_once('.') {
            Some((h, f)) => (h, Some(f)),
            None => (text, None),
        };
        let mut parts = hms.splitn(3, ':');
        let hour: u32 = parts.next()?.parse().ok()?;
        let (minute, precision) = match parts.next() {
            Some(m) => (m.parse::<u32>().ok()?, TemporalPrecision::Minute),
            None => (0, TemporalPrecision::Hour),
        };
        let (second, precision) = match parts.next() {
            Some(s) => (s.parse::<u32>().ok()?, TemporalPrecision::Second),
            None => (0, precision),
        };
        let (milli, precision) = match fraction {
            Some(f) if precision == TemporalPrecision::Second => {
                let padded = format!("{f:0<3}");
                (padded[..3].parse::<u32>().ok()?, TemporalPrecision::Millisecond)
            }
            Some(_) => return None,
            None => (0, precision),
        };
        Some(Self {
            time: NaiveTime::from_hms_milli_opt(hour, minute, second, milli)?,
            precision,
        })
    }

    /// Add a sub-day amount of time; calendar units above hours are rejected
    /// by the caller
    pub fn add(&self, unit: CalendarUnit, amount: i64) -> Option<Time> {
        let duration = unit.fixed_duration()?.checked_mul(i32::try_from(amount).ok()?)?;
        Some(Time {
            time: self.time + duration,
            precision: self.precision,
        })
    }
}

impl DateTime {
    /// Parse a datetime literal: date tier, optional `T` time tier, optional
    /// `Z`/`±hh:mm` offset
    pub fn parse(text: &str) -> Option<Self> {
        let (date_part, rest) = match text.split_once('T') {
            Some((d, r)) => (d, Some(r)),
            None => (text, None),
        };
        let date = Date::parse(date_part)?;

        let Some(rest) = rest else {
            return Some(Self {
                datetime: date.date.and_hms_opt(0, 0, 0)?,
                offset: None,
                precision: date.precision,
            });
        };

        // Split the timezone suffix off the time tier
        let (time_part, offset) = if let Some(stripped) = rest.strip_suffix('Z') {
            (stripped, Some(FixedOffset::east_opt(0)?))
        } else if let Some(idx) = rest.rfind(['+', '-']) {
            let (t, tz) = rest.split_at(idx);
            (t, Some(parse_offset(tz)?))
        } else {
            (rest, None)
        };

        if time_part.is_empty() {
            return Some(Self {
                datetime: date.date.and_hms_opt(0, 0, 0)?,
                offset,
                precision: date.precision,
            });
        }

        let time = Time::parse(time_part)?;
        Some(Self {
            datetime: date.date.and_time(time.time),
            offset,
            precision: time.precision,
        })
    }

    /// Calendar addition; `amount` may be negative
    pub fn add(&self, unit: CalendarUnit, amount: i64) -> Option<DateTime> {
        let datetime = match unit {
            CalendarUnit::Year | CalendarUnit::Month | CalendarUnit::Week | CalendarUnit::Day => {
                add_to_date(self.datetime.date(), unit, amount)?.and_time(self.datetime.time())
            }
            _ => {
                let duration = unit.fixed_duration()?.checked_mul(i32::try_from(amount).ok()?)?;
                self.datetime.checked_add_signed(duration)?
            }
        };
        Some(DateTime {
            datetime,
            offset: self.offset,
            precision: self.precision,
        })
    }

    /// Civil datetime normalized to UTC when an offset is present
    fn normalized(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => self.datetime - Duration::seconds(offset.local_minus_utc() as i64),
            None => self.datetime,
        }
    }
}

/// Calendar units used by quantity literals and date arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarUnit {
    /// Years
    Year,
    /// Months
    Month,
    /// Weeks
    Week,
    /// Days
    Day,
    /// Hours
    Hour,
    /// Minutes
    Minute,
    /// Seconds
    Second,
    /// Milliseconds
    Millisecond,
}

impl CalendarUnit {
    /// Recognize a calendar word (singular or plural) or its UCUM code
    pub fn from_unit(unit: &str) -> Option<Self> {
        match unit {
            "year" | "years" | "a" => Some(Self::Year),
            "month" | "months" | "mo" => Some(Self::Month),
            "week" | "weeks" | "wk" => Some(Self::Week),
            "day" | "days" | "d" => Some(Self::Day),
            "hour" | "hours" | "h" => Some(Self::Hour),
            "minute" | "minutes" | "min" => Some(Self::Minute),
            "second" | "seconds" | "s" => Some(Self::Second),
            "millisecond" | "milliseconds" | "ms" => Some(Self::Millisecond),
            _ => None,
        }
    }

    /// UCUM code for this unit
    pub fn code(&self) -> &'static str {
        match self {
            Self::Year => "a",
            Self::Month => "mo",
            Self::Week => "wk",
            Self::Day => "d",
            Self::Hour => "h",
            Self::Minute => "min",
            Self::Second => "s",
            Self::Millisecond => "ms",
        }
    }

    /// Fixed-length duration, where one exists (years and months do not)
    fn fixed_duration(&self) -> Option<Duration> {
        match self {
            Self::Week => Some(Duration::weeks(1)),
            Self::Day => Some(Duration::days(1)),
            Self::Hour => Some(Duration::hours(1)),
            Self::Minute => Some(Duration::minutes(1)),
            Self::Second => Some(Duration::seconds(1)),
            Self::Millisecond => Some(Duration::milliseconds(1)),
            Self::Year | Self::Month => None,
        }
    }

    /// Whether this unit is hours or finer, and thus applicable to times
    pub fn is_sub_day(&self) -> bool {
        matches!(self, Self::Hour | Self::Minute | Self::Second | Self::Millisecond)
    }
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let seconds = sign * (hours.parse::<i32>().ok()? * 3600 + minutes.parse::<i32>().ok()? * 60);
    FixedOffset::east_opt(seconds)
}

fn add_to_date(date: NaiveDate, unit: CalendarUnit, amount: i64) -> Option<NaiveDate> {
    match unit {
        CalendarUnit::Year => clamped_ymd(date, date.year() + i32::try_from(amount).ok()?, date.month()),
        CalendarUnit::Month => {
            let total = date.year() as i64 * 12 + date.month0() as i64 + amount;
            let year = i32::try_from(total.div_euclid(12)).ok()?;
            let month = (total.rem_euclid(12)) as u32 + 1;
            clamped_ymd(date, year, month)
        }
        CalendarUnit::Week => date.checked_add_signed(Duration::weeks(amount)),
        CalendarUnit::Day => date.checked_add_signed(Duration::days(amount)),
        // Sub-day amounts shift the date only when they cross midnight;
        // the DateTime path handles that, a bare Date rejects it
        _ => None,
    }
}

/// Keep the day-of-month, clamping to the end of the target month
/// (Jan 31 + 1 month = Feb 28/29)
fn clamped_ymd(original: NaiveDate, year: i32, month: u32) -> Option<NaiveDate> {
    let day = original.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Compare two temporal values that expose (normalized value, precision).
/// Returns `None` when they agree up to the common precision but one is more
/// precise, which FHIRPath treats as unknown.
fn precision_compare<T: Ord + Copy>(
    a: T,
    ap: TemporalPrecision,
    b: T,
    bp: TemporalPrecision,
    truncate: impl Fn(T, TemporalPrecision) -> T,
) -> Option<Ordering> {
    let common = ap.min(bp);
    let ta = truncate(a, common);
    let tb = truncate(b, common);
    match ta.cmp(&tb) {
        Ordering::Equal if ap != bp => None,
        ordering => Some(ordering),
    }
}

fn truncate_date(date: NaiveDate, precision: TemporalPrecision) -> NaiveDate {
    match precision {
        TemporalPrecision::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        TemporalPrecision::Month => {
            NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
        }
        _ => date,
    }
}

fn truncate_time(time: NaiveTime, precision: TemporalPrecision) -> NaiveTime {
    let (h, m, s) = (time.hour(), time.minute(), time.second());
    match precision {
        TemporalPrecision::Hour => NaiveTime::from_hms_opt(h, 0, 0),
        TemporalPrecision::Minute => NaiveTime::from_hms_opt(h, m, 0),
        TemporalPrecision::Second => NaiveTime::from_hms_opt(h, m, s),
        _ => return time,
    }
    .unwrap_or(time)
}

fn truncate_datetime(dt: NaiveDateTime, precision: TemporalPrecision) -> NaiveDateTime {
    match precision {
        TemporalPrecision::Year | TemporalPrecision::Month => {
            truncate_date(dt.date(), precision).and_hms_opt(0, 0, 0).unwrap_or(dt)
        }
        TemporalPrecision::Day => dt.date().and_hms_opt(0, 0, 0).unwrap_or(dt),
        _ => dt.date().and_time(truncate_time(dt.time(), precision)),
    }
}

impl Date {
    /// Three-way comparison honoring precision; `None` means unknown
    pub fn compare(&self, other: &Date) -> Option<Ordering> {
        precision_compare(
            self.date,
            self.precision,
            other.date,
            other.precision,
            truncate_date,
        )
    }

    /// Equivalence: equal at the common precision
    pub fn equivalent(&self, other: &Date) -> bool {
        let common = self.precision.min(other.precision);
        truncate_date(self.date, common) == truncate_date(other.date, common)
    }
}

impl Time {
    /// Three-way comparison honoring precision; `None` means unknown
    pub fn compare(&self, other: &Time) -> Option<Ordering> {
        precision_compare(
            self.time,
            self.precision,
            other.time,
            other.precision,
            truncate_time,
        )
    }

    /// Equivalence: equal at the common precision
    pub fn equivalent(&self, other: &Time) -> bool {
        let common = self.precision.min(other.precision);
        truncate_time(self.time, common) == truncate_time(other.time, common)
    }
}

impl DateTime {
    /// Three-way comparison honoring precision; `None` means unknown
    pub fn compare(&self, other: &DateTime) -> Option<Ordering> {
        precision_compare(
            self.normalized(),
            self.precision,
            other.normalized(),
            other.precision,
            truncate_datetime,
        )
    }

    /// Equivalence: equal at the common precision
    pub fn equivalent(&self, other: &DateTime) -> bool {
        let common = self.precision.min(other.precision);
        truncate_datetime(self.normalized(), common) == truncate_datetime(other.normalized(), common)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            TemporalPrecision::Year => write!(f, "{:04}", self.date.year()),
            TemporalPrecision::Month => {
                write!(f, "{:04}-{:02}", self.date.year(), self.date.month())
            }
            _ => write!(f, "{}", self.date.format("%Y-%m-%d")),
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            TemporalPrecision::Hour => write!(f, "{:02}", self.time.hour()),
            TemporalPrecision::Minute => {
                write!(f, "{:02}:{:02}", self.time.hour(), self.time.minute())
            }
            TemporalPrecision::Second => write!(f, "{}", self.time.format("%H:%M:%S")),
            _ => write!(f, "{}", self.time.format("%H:%M:%S%.3f")),
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = Date {
            date: self.datetime.date(),
            precision: self.precision.min(TemporalPrecision::Day),
        };
        if self.precision <= TemporalPrecision::Day {
            write!(f, "{date}")?;
        } else {
            let time = Time {
                time: self.datetime.time(),
                precision: self.precision,
            };
            write!(f, "{date}T{time}")?;
        }
        if let Some(offset) = self.offset {
            if offset.local_minus_utc() == 0 {
                write!(f, "Z")?;
            } else {
                write!(f, "{offset}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tiers() {
        assert_eq!(Date::parse("2020").unwrap().precision, TemporalPrecision::Year);
        assert_eq!(
            Date::parse("2020-02").unwrap().precision,
            TemporalPrecision::Month
        );
        assert_eq!(
            Date::parse("2020-02-29").unwrap().precision,
            TemporalPrecision::Day
        );
        assert!(Date::parse("2021-02-29").is_none());
        assert_eq!(Time::parse("14").unwrap().precision, TemporalPrecision::Hour);
        assert_eq!(
            Time::parse("14:30:15.250").unwrap().precision,
            TemporalPrecision::Millisecond
        );
        let dt = DateTime::parse("2020-03-14T13:45+02:00").unwrap();
        assert_eq!(dt.precision, TemporalPrecision::Minute);
        assert_eq!(dt.offset.unwrap().local_minus_utc(), 7200);
    }

    #[test]
    fn test_precision_equality_rules() {
        let month = Date::parse("2020-01").unwrap();
        let day = Date::parse("2020-01-01").unwrap();
        // Same prefix, different precision: unknown
        assert_eq!(month.compare(&day), None);
        // Different prefix: decidable regardless of precision
        let other = Date::parse("2021-05-01").unwrap();
        assert_eq!(month.compare(&other), Some(Ordering::Less));
        // Equivalence compares at the common precision
        assert!(month.equivalent(&day));
    }

    #[test]
    fn test_month_clamping() {
        let date = Date::parse("2020-01-31").unwrap();
        let plus_one = date.add(CalendarUnit::Month, 1).unwrap();
        assert_eq!(plus_one.to_string(), "2020-02-29");
        let plus_thirteen = date.add(CalendarUnit::Month, 13).unwrap();
        assert_eq!(plus_thirteen.to_string(), "2021-02-28");
    }

    #[test]
    fn test_leap_year_add() {
        let date = Date::parse("2020-02-29").unwrap();
        assert_eq!(date.add(CalendarUnit::Year, 1).unwrap().to_string(), "2021-02-28");
        assert_eq!(date.add(CalendarUnit::Year, 4).unwrap().to_string(), "2024-02-29");
    }

    #[test]
    fn test_day_overflow_into_next_month() {
        let date = Date::parse("2023-01-30").unwrap();
        assert_eq!(date.add(CalendarUnit::Day, 5).unwrap().to_string(), "2023-02-04");
    }

    #[test]
    fn test_negative_amounts() {
        let date = Date::parse("2020-03-31").unwrap();
        assert_eq!(date.add(CalendarUnit::Month, -1).unwrap().to_string(), "2020-02-29");
    }

    #[test]
    fn test_datetime_offset_normalization() {
        let a = DateTime::parse("2020-01-01T12:00:00+02:00").unwrap();
        let b = DateTime::parse("2020-01-01T10:00:00Z").unwrap();
        assert_eq!(a.compare(&b), Some(Ordering::Equal));
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["2020", "2020-02", "2020-02-29"] {
            assert_eq!(Date::parse(text).unwrap().to_string(), text);
        }
        for text in ["14", "14:30", "14:30:15", "14:30:15.250"] {
            assert_eq!(Time::parse(text).unwrap().to_string(), text);
        }
        assert_eq!(
            DateTime::parse("2020-03-14T13:45:30.123Z").unwrap().to_string(),
            "2020-03-14T13:45:30.123Z"
        );
    }
}
