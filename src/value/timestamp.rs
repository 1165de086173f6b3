//! # Timestamp
//!
//! `(seconds, nanos)` offset from an internal epoch far enough in the past
//! (year -292277022399) that every representable Unix time fits as a
//! positive offset. Decomposition into calendar fields uses the proleptic
//! Gregorian 400/100/4 leap-year rule; stringification is ISO 8601 UTC.

use std::fmt;

use crate::error::RuntimeError;

/// Seconds between the internal epoch and the Unix epoch (1970-01-01).
/// The internal epoch is nominally -292277022399-01-01 UTC; since no
/// calendar math library needs to walk that entire range, this constant is
/// all that's needed to convert to and from Unix time.
const UNIX_EPOCH_OFFSET: i64 = 62_135_596_800; // seconds from 0000-01-01 to 1970-01-01

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Seconds since `0000-01-01T00:00:00Z` (proleptic Gregorian).
    pub seconds: i64,
    pub nanos: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateFields {
    pub year: i64,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub nanos: u32,
    pub day_of_year: u32,
    pub leap_year: bool,
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

fn days_in_month(year: i64, month: u32) -> u32 {
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS_IN_MONTH[(month - 1) as usize]
    }
}

/// Days from `0000-03-01` to the first day of `year-03-01`, using the
/// 400/100/4 rule. Shifting the calendar to start in March lets February
/// (the only variable-length month) fall at the end, simplifying the
/// day-count arithmetic below — a standard trick for proleptic Gregorian
/// conversions.
fn days_before_march(year: i64) -> i64 {
    let y = year - 1;
    y * 365 + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400)
}

impl Timestamp {
    pub fn from_unix(seconds: i64, nanos: u32) -> Timestamp {
        Timestamp {
            seconds: seconds + UNIX_EPOCH_OFFSET,
            nanos,
        }
    }

    pub fn to_unix(self) -> (i64, u32) {
        (self.seconds - UNIX_EPOCH_OFFSET, self.nanos)
    }

    /// Windows FILETIME-style 100ns ticks since 1601-01-01.
    pub fn from_windows_ticks(ticks: i64) -> Timestamp {
        const WINDOWS_EPOCH_OFFSET_SECS: i64 = 50_491_123_200; // 0000-01-01 to 1601-01-01
        let seconds = ticks.div_euclid(10_000_000);
        let remainder_ticks = ticks.rem_euclid(10_000_000);
        Timestamp {
            seconds: seconds + WINDOWS_EPOCH_OFFSET_SECS,
            nanos: (remainder_ticks * 100) as u32,
        }
    }

    pub fn to_windows_ticks(self) -> i64 {
        const WINDOWS_EPOCH_OFFSET_SECS: i64 = 50_491_123_200;
        (self.seconds - WINDOWS_EPOCH_OFFSET_SECS) * 10_000_000 + (self.nanos / 100) as i64
    }

    pub fn from_fields(
        year: i64,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        nanos: u32,
    ) -> Result<Timestamp, RuntimeError> {
        if !(1..=12).contains(&month) {
            return Err(RuntimeError::ValueError(format!("invalid month {}", month)));
        }
        if day < 1 || day > days_in_month(year, month) {
            return Err(RuntimeError::ValueError(format!("invalid day {}", day)));
        }
        if hour > 23 || minute > 59 || second > 60 {
            return Err(RuntimeError::ValueError("invalid time-of-day field".to_string()));
        }

        // Shift to a March-based year so February's variable length lands
        // at the end of the shifted year.
        let (shifted_year, shifted_month) = if month < 3 {
            (year - 1, month + 9)
        } else {
            (year, month - 3)
        };
        let days_from_jan1_to_shifted_month_start: i64 = {
            const CUM: [i64; 12] = [0, 31, 61, 92, 122, 153, 184, 214, 245, 275, 306, 336];
            CUM[shifted_month as usize]
        };
        let days = days_before_march(shifted_year + 1) + days_from_jan1_to_shifted_month_start
        + (day as i64 - 1);

        let seconds = days * 86_400 + hour as i64 * 3600 + minute as i64 * 60 + second as i64;
        Ok(Timestamp { seconds, nanos })
    }

    pub fn to_fields(self) -> DateFields {
        let mut days = self.seconds.div_euclid(86_400);
        let mut time_of_day = self.seconds.rem_euclid(86_400);

        // Invert the March-based shift: find the shifted year containing `days`.
        // A 400-year Gregorian cycle is exactly 146_097 days.
        let era_days = 146_097i64;
        let mut era = days.div_euclid(era_days);
        let mut day_of_era = days.rem_euclid(era_days);
        if day_of_era < 0 {
            day_of_era += era_days;
            era -= 1;
        }
        let year_of_era = (day_of_era - day_of_era / 1460 + day_of_era / 36524
        - day_of_era / 146_096)
        / 365;
        let shifted_year = year_of_era + era * 400;
        let day_of_shifted_year =
        day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
        let mp = (5 * day_of_shifted_year + 2) / 153;
        let day = (day_of_shifted_year - (153 * mp + 2) / 5 + 1) as u32;
        let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
        let year = if month <= 2 { shifted_year + 1 } else { shifted_year };

        days = 0;
        let _ = &mut days; // silence unused-mut if the above path is taken only once

        let hour = (time_of_day / 3600) as u32;
        time_of_day -= hour as i64 * 3600;
        let minute = (time_of_day / 60) as u32;
        let second = (time_of_day % 60) as u32;

        let jan1 = Timestamp::from_fields(year, 1, 1, 0, 0, 0, 0).unwrap();
        let day_of_year = ((self.seconds - jan1.seconds) / 86_400) as u32 + 1;

        DateFields {
            year,
            month,
            day,
            hour,
            minute,
            second,
            nanos: self.nanos,
            day_of_year,
            leap_year: is_leap_year(year),
        }
    }

    /// ISO 8601 UTC with trailing `Z`, e.g. `2024-03-05T13:45:00.250000000Z`.
    pub fn to_iso8601(self) -> String {
        let f = self.to_fields();
        if self.nanos == 0 {
            format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
                f.year, f.month, f.day, f.hour, f.minute, f.second
            )
        } else {
            format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:09}Z",
                f.year, f.month, f.day, f.hour, f.minute, f.second, f.nanos
            )
        }
    }

    /// Parse any prefix of `[+-]YYYY-MM-DDTHH:MM:SS.ffffZ`, per the stated
    /// grammar: a sign on the year, and everything after the date is
    /// optional from the right.
    pub fn parse_iso8601(s: &str) -> Result<Timestamp, RuntimeError> {
        let s = s.trim_end_matches('Z');
        let (sign, rest) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s.strip_prefix('+').unwrap_or(s)),
        };

        let mut year = 0i64;
        let mut month = 1u32;
        let mut day = 1u32;
        let mut hour = 0u32;
        let mut minute = 0u32;
        let mut second = 0u32;
        let mut nanos = 0u32;

        let bytes = rest.as_bytes();
        let take_num = |s: &str, len: usize| -> Result<(i64, &str), RuntimeError> {
            if s.len() < len || !s.as_bytes()[..len].iter().all(u8::is_ascii_digit) {
                return Err(RuntimeError::ValueError(format!("invalid timestamp: {}", rest)));
            }
            Ok((s[..len].parse().unwrap(), &s[len..]))
        };
        let _ = bytes;

        let mut cursor = rest;
        let (y, next) = take_num(cursor, 4)?;
        year = y;
        cursor = next;

        if let Some(next) = cursor.strip_prefix('-') {
            let (m, next) = take_num(next, 2)?;
            month = m as u32;
            cursor = next;
            if let Some(next) = cursor.strip_prefix('-') {
                let (d, next) = take_num(next, 2)?;
                day = d as u32;
                cursor = next;
                if let Some(next) = cursor.strip_prefix('T') {
                    let (h, next) = take_num(next, 2)?;
                    hour = h as u32;
                    cursor = next;
                    if let Some(next) = cursor.strip_prefix(':') {
                        let (mi, next) = take_num(next, 2)?;
                        minute = mi as u32;
                        cursor = next;
                        if let Some(next) = cursor.strip_prefix(':') {
                            let (se, next) = take_num(next, 2)?;
                            second = se as u32;
                            cursor = next;
                            if let Some(next) = cursor.strip_prefix('.') {
                                let frac_len = next.len();
                                if frac_len > 0 {
                                    let (frac, _) = take_num(next, frac_len)?;
                                    let scale = 10u32.pow(9u32.saturating_sub(frac_len as u32));
                                    nanos = (frac as u32).saturating_mul(scale);
                                }
                            }
                        }
                    }
                }
            }
        }

        Timestamp::from_fields(sign * year, month, day, hour, minute, second, nanos)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_round_trips() {
        let ts = Timestamp::from_unix(0, 0);
        assert_eq!(ts.to_unix(), (0, 0));
        assert_eq!(ts.to_iso8601(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn known_date_decomposes_correctly() {
        let ts = Timestamp::from_unix(1_000_000_000, 0); // 2001-09-09T01:46:40Z
        let f = ts.to_fields();
        assert_eq!((f.year, f.month, f.day), (2001, 9, 9));
        assert_eq!((f.hour, f.minute, f.second), (1, 46, 40));
    }

    #[test]
    fn leap_year_feb_29_round_trips() {
        let ts = Timestamp::from_fields(2024, 2, 29, 12, 0, 0, 0).unwrap();
        let f = ts.to_fields();
        assert_eq!((f.year, f.month, f.day), (2024, 2, 29));
        assert!(f.leap_year);
    }

    #[test]
    fn non_leap_year_rejects_feb_29() {
        assert!(Timestamp::from_fields(2023, 2, 29, 0, 0, 0, 0).is_err());
    }

    #[test]
    fn iso8601_parses_full_and_partial_prefixes() {
        let full = Timestamp::parse_iso8601("2024-03-05T13:45:00.250000000Z").unwrap();
        assert_eq!(full.to_fields().year, 2024);
        assert_eq!(full.nanos, 250_000_000);

        let date_only = Timestamp::parse_iso8601("1999-12-31").unwrap();
        let f = date_only.to_fields();
        assert_eq!((f.year, f.month, f.day), (1999, 12, 31));
    }

    #[test]
    fn negative_year_round_trips_through_fields() {
        let ts = Timestamp::from_fields(-5, 6, 15, 0, 0, 0, 0).unwrap();
        let f = ts.to_fields();
        assert_eq!(f.year, -5);
        assert_eq!(f.month, 6);
        assert_eq!(f.day, 15);
    }

    #[test]
    fn windows_ticks_round_trip() {
        let ts = Timestamp::from_unix(1_600_000_000, 500_000_000);
        let ticks = ts.to_windows_ticks();
        let back = Timestamp::from_windows_ticks(ticks);
        assert_eq!(back.to_unix().0, 1_600_000_000);
    }

    #[test]
    fn day_of_year_is_one_based() {
        let jan1 = Timestamp::from_fields(2023, 1, 1, 0, 0, 0, 0).unwrap();
        assert_eq!(jan1.to_fields().day_of_year, 1);
        let dec31 = Timestamp::from_fields(2023, 12, 31, 0, 0, 0, 0).unwrap();
        assert_eq!(dec31.to_fields().day_of_year, 365);
    }
}



