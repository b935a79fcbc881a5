/* Copyright 2025 The NeoShell Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Datetime output and input formats. A format is either an integer epoch in one of the units
//! `ns`, `us`, `ms`, and `s`, or a layout written with the reference time
//! `Mon Jan 2 15:04:05 MST 2006` where each component of the reference time is a token, e.g.,
//! `2006-01-02 15:04:05.999`. Symbolic names such as `RFC3339` expand to fixed layouts.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use crate::error::{NeoShellCodecError, Result};
use crate::zone::Zone;

/// The layout used when no format is given.
pub const DEFAULT_LAYOUT: &str = "2006-01-02 15:04:05.999";

/// Symbolic layout names and the layouts they expand to.
pub const SYMBOLIC_LAYOUTS: &[(&str, &str)] = &[
    ("Default", DEFAULT_LAYOUT),
    ("Numeric", "01/02 03:04:05PM '06 -0700"),
    ("Ansic", "Mon Jan _2 15:04:05 2006"),
    ("Unix", "Mon Jan _2 15:04:05 MST 2006"),
    ("Ruby", "Mon Jan 02 15:04:05 -0700 2006"),
    ("RFC822", "02 Jan 06 15:04 MST"),
    ("RFC822Z", "02 Jan 06 15:04 -0700"),
    ("RFC850", "Monday, 02-Jan-06 15:04:05 MST"),
    ("RFC1123", "Mon, 02 Jan 2006 15:04:05 MST"),
    ("RFC1123Z", "Mon, 02 Jan 2006 15:04:05 -0700"),
    ("RFC3339", "2006-01-02T15:04:05Z07:00"),
    ("RFC3339Nano", "2006-01-02T15:04:05.999999999Z07:00"),
    ("Kitchen", "3:04:05PM"),
    ("Stamp", "Jan _2 15:04:05"),
    ("StampMilli", "Jan _2 15:04:05.000"),
    ("StampMicro", "Jan _2 15:04:05.000000"),
    ("StampNano", "Jan _2 15:04:05.000000000"),
];

const SHORT_MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const LONG_MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const SHORT_DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const LONG_DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Unit of an integer epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpochUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl EpochUnit {
    fn nanoseconds_per_unit(&self) -> i128 {
        match self {
            Self::Seconds => 1_000_000_000,
            Self::Milliseconds => 1_000_000,
            Self::Microseconds => 1_000,
            Self::Nanoseconds => 1,
        }
    }

    fn token(&self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "us",
            Self::Nanoseconds => "ns",
        }
    }

    /// Return the number of whole units between the Unix epoch and `time`. Instants before the
    /// epoch are rounded towards negative infinity so decoding truncates consistently.
    pub fn encode(&self, time: &DateTime<Utc>) -> i128 {
        let nanoseconds =
            time.timestamp() as i128 * 1_000_000_000 + time.timestamp_subsec_nanos() as i128;
        nanoseconds.div_euclid(self.nanoseconds_per_unit())
    }

    /// Return the instant `epoch` units after the Unix epoch.
    pub fn decode(&self, epoch: i64) -> Option<DateTime<Utc>> {
        let nanoseconds = epoch as i128 * self.nanoseconds_per_unit();
        let seconds = nanoseconds.div_euclid(1_000_000_000);
        let subsec_nanoseconds = nanoseconds.rem_euclid(1_000_000_000);
        DateTime::from_timestamp(i64::try_from(seconds).ok()?, subsec_nanoseconds as u32)
    }
}

/// Output and input format of datetime cells.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeFormat {
    Epoch(EpochUnit),
    Layout(Layout),
}

impl TimeFormat {
    pub fn is_epoch(&self) -> bool {
        matches!(self, Self::Epoch(_))
    }

    /// Format `time` as an integer epoch or with the layout in `zone`.
    pub fn format(&self, time: &DateTime<Utc>, zone: &Zone) -> String {
        match self {
            Self::Epoch(unit) => unit.encode(time).to_string(),
            Self::Layout(layout) => layout.format(time, zone),
        }
    }

    /// Parse `text` as an integer epoch or with the layout in `zone`.
    pub fn parse(&self, text: &str, zone: &Zone) -> Result<DateTime<Utc>> {
        match self {
            Self::Epoch(unit) => {
                let epoch: i64 = text.trim().parse().map_err(|_| {
                    NeoShellCodecError::InvalidArgument(format!(
                        "'{text}' is not an epoch in {}.",
                        unit.token()
                    ))
                })?;
                unit.decode(epoch).ok_or_else(|| {
                    NeoShellCodecError::InvalidArgument(format!("epoch '{text}' is out of range."))
                })
            }
            Self::Layout(layout) => layout.parse(text, zone),
        }
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        Self::Layout(Layout::new(DEFAULT_LAYOUT))
    }
}

impl Display for TimeFormat {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Epoch(unit) => f.write_str(unit.token()),
            Self::Layout(layout) => f.write_str(&layout.source),
        }
    }
}

impl FromStr for TimeFormat {
    type Err = NeoShellCodecError;

    fn from_str(token: &str) -> Result<Self> {
        match token {
            "ns" => return Ok(Self::Epoch(EpochUnit::Nanoseconds)),
            "us" => return Ok(Self::Epoch(EpochUnit::Microseconds)),
            "ms" => return Ok(Self::Epoch(EpochUnit::Milliseconds)),
            "s" => return Ok(Self::Epoch(EpochUnit::Seconds)),
            "" | "-" => return Ok(Self::default()),
            _ => (),
        }

        // StampMili is accepted as it is the spelling used by older help texts.
        let symbolic = if token.eq_ignore_ascii_case("StampMili") {
            Some("Jan _2 15:04:05.000")
        } else {
            SYMBOLIC_LAYOUTS
                .iter()
                .find(|(name, _layout)| name.eq_ignore_ascii_case(token))
                .map(|(_name, layout)| *layout)
        };

        Ok(Self::Layout(Layout::new(symbolic.unwrap_or(token))))
    }
}

/// A single component of a layout.
#[derive(Clone, Debug, PartialEq)]
enum Chunk {
    Literal(String),
    LongMonth,
    Month,
    NumMonth,
    ZeroMonth,
    LongWeekDay,
    WeekDay,
    Day,
    UnderDay,
    ZeroDay,
    ZeroYearDay,
    Hour,
    Hour12,
    ZeroHour12,
    Minute,
    ZeroMinute,
    Second,
    ZeroSecond,
    LongYear,
    Year,
    UpperPm,
    LowerPm,
    TimeZone,
    /// Numeric offset such as `-0700`, `Z` is written for UTC if `iso` is set.
    NumTimeZone {
        iso: bool,
        colon: bool,
        minutes: bool,
        seconds: bool,
    },
    /// Fractional seconds with `digits` digits, trailing zeros are removed if `trim` is set.
    Fraction {
        separator: char,
        digits: usize,
        trim: bool,
    },
}

/// A layout compiled into its chunks.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    source: String,
    chunks: Vec<Chunk>,
}

impl Layout {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_owned(),
            chunks: tokenize(source),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Format `time` with the layout after converting it to the wall clock of `zone`.
    pub fn format(&self, time: &DateTime<Utc>, zone: &Zone) -> String {
        let (local, abbreviation) = zone.localize(time);
        let offset_seconds = local.offset().local_minus_utc();
        let mut output = String::with_capacity(self.source.len() + 8);

        for chunk in &self.chunks {
            match chunk {
                Chunk::Literal(text) => output.push_str(text),
                Chunk::LongMonth => output.push_str(LONG_MONTH_NAMES[local.month0() as usize]),
                Chunk::Month => output.push_str(SHORT_MONTH_NAMES[local.month0() as usize]),
                Chunk::NumMonth => output.push_str(&local.month().to_string()),
                Chunk::ZeroMonth => output.push_str(&format!("{:02}", local.month())),
                Chunk::LongWeekDay => output.push_str(
                    LONG_DAY_NAMES[local.weekday().num_days_from_monday() as usize],
                ),
                Chunk::WeekDay => output.push_str(
                    SHORT_DAY_NAMES[local.weekday().num_days_from_monday() as usize],
                ),
                Chunk::Day => output.push_str(&local.day().to_string()),
                Chunk::UnderDay => output.push_str(&format!("{:>2}", local.day())),
                Chunk::ZeroDay => output.push_str(&format!("{:02}", local.day())),
                Chunk::ZeroYearDay => output.push_str(&format!("{:03}", local.ordinal())),
                Chunk::Hour => output.push_str(&format!("{:02}", local.hour())),
                Chunk::Hour12 => output.push_str(&local.hour12().1.to_string()),
                Chunk::ZeroHour12 => output.push_str(&format!("{:02}", local.hour12().1)),
                Chunk::Minute => output.push_str(&local.minute().to_string()),
                Chunk::ZeroMinute => output.push_str(&format!("{:02}", local.minute())),
                Chunk::Second => output.push_str(&local.second().to_string()),
                Chunk::ZeroSecond => output.push_str(&format!("{:02}", local.second())),
                Chunk::LongYear => output.push_str(&format!("{:04}", local.year())),
                Chunk::Year => output.push_str(&format!("{:02}", local.year().rem_euclid(100))),
                Chunk::UpperPm => output.push_str(if local.hour() >= 12 { "PM" } else { "AM" }),
                Chunk::LowerPm => output.push_str(if local.hour() >= 12 { "pm" } else { "am" }),
                Chunk::TimeZone => {
                    if abbreviation.is_empty() {
                        output.push_str(&format_offset(offset_seconds, false, true, false));
                    } else {
                        output.push_str(&abbreviation);
                    }
                }
                Chunk::NumTimeZone {
                    iso,
                    colon,
                    minutes,
                    seconds,
                } => {
                    if *iso && offset_seconds == 0 {
                        output.push('Z');
                    } else {
                        output.push_str(&format_offset(offset_seconds, *colon, *minutes, *seconds));
                    }
                }
                Chunk::Fraction {
                    separator,
                    digits,
                    trim,
                } => {
                    let nanoseconds = format!("{:09}", local.nanosecond() % 1_000_000_000);
                    let mut fraction = &nanoseconds[..*digits.min(&9)];
                    if *trim {
                        fraction = fraction.trim_end_matches('0');
                    }
                    if !fraction.is_empty() {
                        output.push(*separator);
                        output.push_str(fraction);
                    }
                }
            }
        }

        output
    }

    /// Parse `text` with the layout. If `text` does not contain an offset the time is interpreted
    /// as a wall clock time in `zone`.
    pub fn parse(&self, text: &str, zone: &Zone) -> Result<DateTime<Utc>> {
        let error = |reason: &str| {
            NeoShellCodecError::InvalidArgument(format!(
                "cannot parse '{text}' as '{}': {reason}.",
                self.source
            ))
        };

        let mut parsed = ParsedTime::default();
        let mut rest = text;

        for (index, chunk) in self.chunks.iter().enumerate() {
            match chunk {
                Chunk::Literal(literal) => {
                    rest = rest
                        .strip_prefix(literal.as_str())
                        .ok_or_else(|| error(&format!("expected '{literal}'")))?;
                }
                Chunk::LongMonth => {
                    let (month, remaining) =
                        lookup_name(rest, &LONG_MONTH_NAMES).ok_or_else(|| error("bad month"))?;
                    parsed.month = Some(month as u32 + 1);
                    rest = remaining;
                }
                Chunk::Month => {
                    let (month, remaining) =
                        lookup_name(rest, &SHORT_MONTH_NAMES).ok_or_else(|| error("bad month"))?;
                    parsed.month = Some(month as u32 + 1);
                    rest = remaining;
                }
                Chunk::NumMonth | Chunk::ZeroMonth => {
                    let fixed = *chunk == Chunk::ZeroMonth;
                    let (month, remaining) =
                        parse_number(rest, 2, fixed).ok_or_else(|| error("bad month"))?;
                    parsed.month = Some(month);
                    rest = remaining;
                }
                Chunk::LongWeekDay => {
                    rest = lookup_name(rest, &LONG_DAY_NAMES)
                        .ok_or_else(|| error("bad day of week"))?
                        .1;
                }
                Chunk::WeekDay => {
                    rest = lookup_name(rest, &SHORT_DAY_NAMES)
                        .ok_or_else(|| error("bad day of week"))?
                        .1;
                }
                Chunk::Day | Chunk::UnderDay | Chunk::ZeroDay => {
                    if *chunk == Chunk::UnderDay {
                        rest = rest.strip_prefix(' ').unwrap_or(rest);
                    }
                    let fixed = *chunk == Chunk::ZeroDay;
                    let (day, remaining) =
                        parse_number(rest, 2, fixed).ok_or_else(|| error("bad day"))?;
                    parsed.day = Some(day);
                    rest = remaining;
                }
                Chunk::ZeroYearDay => {
                    let (year_day, remaining) =
                        parse_number(rest, 3, true).ok_or_else(|| error("bad day of year"))?;
                    parsed.year_day = Some(year_day);
                    rest = remaining;
                }
                Chunk::Hour => {
                    let (hour, remaining) =
                        parse_number(rest, 2, false).ok_or_else(|| error("bad hour"))?;
                    parsed.hour = hour;
                    rest = remaining;
                }
                Chunk::Hour12 | Chunk::ZeroHour12 => {
                    let fixed = *chunk == Chunk::ZeroHour12;
                    let (hour, remaining) =
                        parse_number(rest, 2, fixed).ok_or_else(|| error("bad hour"))?;
                    if !(1..=12).contains(&hour) {
                        return Err(error("hour out of range"));
                    }
                    parsed.hour = hour;
                    rest = remaining;
                }
                Chunk::Minute | Chunk::ZeroMinute => {
                    let fixed = *chunk == Chunk::ZeroMinute;
                    let (minute, remaining) =
                        parse_number(rest, 2, fixed).ok_or_else(|| error("bad minute"))?;
                    parsed.minute = minute;
                    rest = remaining;
                }
                Chunk::Second | Chunk::ZeroSecond => {
                    let fixed = *chunk == Chunk::ZeroSecond;
                    let (second, remaining) =
                        parse_number(rest, 2, fixed).ok_or_else(|| error("bad second"))?;
                    parsed.second = second;
                    rest = remaining;

                    // Fractional seconds are accepted after seconds even if the layout has none.
                    let next_is_fraction =
                        matches!(self.chunks.get(index + 1), Some(Chunk::Fraction { .. }));
                    if !next_is_fraction {
                        if let Some((nanosecond, remaining)) = parse_fraction(rest, None) {
                            parsed.nanosecond = nanosecond;
                            rest = remaining;
                        }
                    }
                }
                Chunk::LongYear => {
                    let (year, remaining) =
                        parse_number(rest, 4, true).ok_or_else(|| error("bad year"))?;
                    parsed.year = year as i32;
                    rest = remaining;
                }
                Chunk::Year => {
                    let (year, remaining) =
                        parse_number(rest, 2, true).ok_or_else(|| error("bad year"))?;
                    parsed.year = if year >= 69 { 1900 } else { 2000 } + year as i32;
                    rest = remaining;
                }
                Chunk::UpperPm | Chunk::LowerPm => {
                    let marker = rest.get(..2).ok_or_else(|| error("bad AM/PM"))?;
                    match marker.to_ascii_uppercase().as_str() {
                        "AM" => parsed.pm = Some(false),
                        "PM" => parsed.pm = Some(true),
                        _ => return Err(error("bad AM/PM")),
                    }
                    rest = &rest[2..];
                }
                Chunk::TimeZone => {
                    let length = rest
                        .find(|c: char| !c.is_ascii_alphabetic())
                        .unwrap_or(rest.len());
                    if length < 3 {
                        return Err(error("bad time zone"));
                    }
                    let abbreviation = &rest[..length];
                    if ["UTC", "GMT", "Z"].contains(&abbreviation) {
                        parsed.offset = Some(0);
                    }
                    rest = &rest[length..];
                }
                Chunk::NumTimeZone {
                    iso,
                    colon,
                    minutes,
                    seconds,
                } => {
                    if *iso && rest.starts_with('Z') {
                        parsed.offset = Some(0);
                        rest = &rest[1..];
                    } else {
                        let (offset, remaining) = parse_offset(rest, *colon, *minutes, *seconds)
                            .ok_or_else(|| error("bad time zone offset"))?;
                        parsed.offset = Some(offset);
                        rest = remaining;
                    }
                }
                Chunk::Fraction { digits, trim, .. } => {
                    let expected = if *trim { None } else { Some(*digits) };
                    match parse_fraction(rest, expected) {
                        Some((nanosecond, remaining)) => {
                            parsed.nanosecond = nanosecond;
                            rest = remaining;
                        }
                        None if *trim => (),
                        None => return Err(error("bad fractional seconds")),
                    }
                }
            }
        }

        if !rest.is_empty() {
            return Err(error(&format!("extra text '{rest}'")));
        }

        parsed.into_utc(zone).ok_or_else(|| error("value out of range"))
    }
}

/// The fields collected while parsing. Missing date fields default to January 1 of year 0.
struct ParsedTime {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    year_day: Option<u32>,
    hour: u32,
    minute: u32,
    second: u32,
    nanosecond: u32,
    pm: Option<bool>,
    offset: Option<i32>,
}

impl Default for ParsedTime {
    fn default() -> Self {
        Self {
            year: 0,
            month: None,
            day: None,
            year_day: None,
            hour: 0,
            minute: 0,
            second: 0,
            nanosecond: 0,
            pm: None,
            offset: None,
        }
    }
}

impl ParsedTime {
    fn into_utc(self, zone: &Zone) -> Option<DateTime<Utc>> {
        let date = match (self.month, self.day, self.year_day) {
            (None, None, Some(year_day)) => NaiveDate::from_yo_opt(self.year, year_day)?,
            (month, day, _) => {
                NaiveDate::from_ymd_opt(self.year, month.unwrap_or(1), day.unwrap_or(1))?
            }
        };

        let hour = match self.pm {
            Some(true) if self.hour < 12 => self.hour + 12,
            Some(false) if self.hour == 12 => 0,
            _ => self.hour,
        };

        let time = NaiveTime::from_hms_nano_opt(hour, self.minute, self.second, self.nanosecond)?;
        let naive = date.and_time(time);

        match self.offset {
            Some(offset) => FixedOffset::east_opt(offset)?
                .from_local_datetime(&naive)
                .single()
                .map(|time| time.with_timezone(&Utc)),
            None => zone.from_local(&naive),
        }
    }
}

/// Split `layout` into chunks. Reference tokens are recognized the same way as by the reference
/// time notation, e.g., `_2006` is an underscore followed by a four digit year and a run of `0`
/// or `9` after `.` or `,` is only a fraction if it is not followed by another digit.
fn tokenize(layout: &str) -> Vec<Chunk> {
    let bytes = layout.as_bytes();
    let mut chunks = vec![];
    let mut literal_start = 0;
    let mut index = 0;

    while index < bytes.len() {
        let rest = &layout[index..];
        let matched: Option<(Chunk, usize)> = match bytes[index] {
            b'J' if rest.starts_with("January") => Some((Chunk::LongMonth, 7)),
            b'J' if rest.starts_with("Jan") => Some((Chunk::Month, 3)),
            b'M' if rest.starts_with("Monday") => Some((Chunk::LongWeekDay, 6)),
            b'M' if rest.starts_with("Mon") => Some((Chunk::WeekDay, 3)),
            b'M' if rest.starts_with("MST") => Some((Chunk::TimeZone, 3)),
            b'0' if rest.starts_with("002") => Some((Chunk::ZeroYearDay, 3)),
            b'0' => match bytes.get(index + 1) {
                Some(b'1') => Some((Chunk::ZeroMonth, 2)),
                Some(b'2') => Some((Chunk::ZeroDay, 2)),
                Some(b'3') => Some((Chunk::ZeroHour12, 2)),
                Some(b'4') => Some((Chunk::ZeroMinute, 2)),
                Some(b'5') => Some((Chunk::ZeroSecond, 2)),
                Some(b'6') => Some((Chunk::Year, 2)),
                _ => None,
            },
            b'1' if rest.starts_with("15") => Some((Chunk::Hour, 2)),
            b'1' => Some((Chunk::NumMonth, 1)),
            b'2' if rest.starts_with("2006") => Some((Chunk::LongYear, 4)),
            b'2' => Some((Chunk::Day, 1)),
            b'_' if rest.starts_with("_2") && !rest.starts_with("_2006") => {
                Some((Chunk::UnderDay, 2))
            }
            b'3' => Some((Chunk::Hour12, 1)),
            b'4' => Some((Chunk::Minute, 1)),
            b'5' => Some((Chunk::Second, 1)),
            b'P' if rest.starts_with("PM") => Some((Chunk::UpperPm, 2)),
            b'p' if rest.starts_with("pm") => Some((Chunk::LowerPm, 2)),
            b'-' | b'Z' => {
                let iso = bytes[index] == b'Z';
                let body = &rest[1..];
                if body.starts_with("07:00:00") {
                    Some((numeric_zone(iso, true, true, true), 9))
                } else if body.starts_with("070000") {
                    Some((numeric_zone(iso, false, true, true), 7))
                } else if body.starts_with("07:00") {
                    Some((numeric_zone(iso, true, true, false), 6))
                } else if body.starts_with("0700") {
                    Some((numeric_zone(iso, false, true, false), 5))
                } else if body.starts_with("07") {
                    Some((numeric_zone(iso, false, false, false), 3))
                } else {
                    None
                }
            }
            b'.' | b',' => match bytes.get(index + 1) {
                Some(digit @ (b'0' | b'9')) => {
                    let run = bytes[index + 1..]
                        .iter()
                        .take_while(|byte| *byte == digit)
                        .count();
                    let next_is_digit = bytes
                        .get(index + 1 + run)
                        .is_some_and(|byte| byte.is_ascii_digit());
                    if next_is_digit {
                        None
                    } else {
                        Some((
                            Chunk::Fraction {
                                separator: bytes[index] as char,
                                digits: run,
                                trim: *digit == b'9',
                            },
                            run + 1,
                        ))
                    }
                }
                _ => None,
            },
            _ => None,
        };

        match matched {
            Some((chunk, length)) => {
                if literal_start < index {
                    chunks.push(Chunk::Literal(layout[literal_start..index].to_owned()));
                }
                chunks.push(chunk);
                index += length;
                literal_start = index;
            }
            None => index += rest.chars().next().map_or(1, char::len_utf8),
        }
    }

    if literal_start < bytes.len() {
        chunks.push(Chunk::Literal(layout[literal_start..].to_owned()));
    }

    chunks
}

fn numeric_zone(iso: bool, colon: bool, minutes: bool, seconds: bool) -> Chunk {
    Chunk::NumTimeZone {
        iso,
        colon,
        minutes,
        seconds,
    }
}

fn format_offset(offset_seconds: i32, colon: bool, minutes: bool, seconds: bool) -> String {
    let sign = if offset_seconds < 0 { '-' } else { '+' };
    let absolute = offset_seconds.unsigned_abs();
    let separator = if colon { ":" } else { "" };

    let mut output = format!("{sign}{:02}", absolute / 3600);
    if minutes {
        output.push_str(&format!("{separator}{:02}", absolute / 60 % 60));
    }
    if seconds {
        output.push_str(&format!("{separator}{:02}", absolute % 60));
    }
    output
}

/// Parse an unsigned number of exactly `width` digits if `fixed` is set and otherwise of one to
/// `width` digits.
fn parse_number(text: &str, width: usize, fixed: bool) -> Option<(u32, &str)> {
    let digits = text
        .bytes()
        .take(width)
        .take_while(|byte| byte.is_ascii_digit())
        .count();

    if digits == 0 || (fixed && digits != width) {
        return None;
    }

    Some((text[..digits].parse().ok()?, &text[digits..]))
}

/// Parse a `.` or `,` followed by fractional seconds and return them as nanoseconds. If
/// `expected_digits` is set exactly that many digits must be present.
fn parse_fraction(text: &str, expected_digits: Option<usize>) -> Option<(u32, &str)> {
    let body = text.strip_prefix(['.', ','])?;
    let digits = body.bytes().take_while(|byte| byte.is_ascii_digit()).count();

    if digits == 0 || expected_digits.is_some_and(|expected| expected != digits) {
        return None;
    }

    let mut nanoseconds = body[..digits.min(9)].to_owned();
    while nanoseconds.len() < 9 {
        nanoseconds.push('0');
    }

    Some((nanoseconds.parse().ok()?, &body[digits..]))
}

fn parse_offset(text: &str, colon: bool, minutes: bool, seconds: bool) -> Option<(i32, &str)> {
    let sign = match text.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };

    let (hours, mut rest) = parse_number(&text[1..], 2, true)?;
    let mut offset = hours as i32 * 3600;

    for (enabled, multiplier) in [(minutes, 60), (seconds, 1)] {
        if enabled {
            if colon {
                rest = rest.strip_prefix(':')?;
            }
            let (value, remaining) = parse_number(rest, 2, true)?;
            offset += value as i32 * multiplier;
            rest = remaining;
        }
    }

    Some((sign * offset, rest))
}

/// Match one of `names` case-insensitively at the start of `text` and return its index.
fn lookup_name<'a>(text: &'a str, names: &[&str]) -> Option<(usize, &'a str)> {
    names.iter().enumerate().find_map(|(index, name)| {
        let candidate = text.get(..name.len())?;
        candidate
            .eq_ignore_ascii_case(name)
            .then(|| (index, &text[name.len()..]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap() + chrono::Duration::milliseconds(120)
    }

    // Tests for TimeFormat::from_str().
    #[test]
    fn test_parse_epoch_tokens() {
        assert_eq!(
            TimeFormat::Epoch(EpochUnit::Nanoseconds),
            "ns".parse().unwrap()
        );
        assert_eq!(TimeFormat::Epoch(EpochUnit::Seconds), "s".parse().unwrap());
    }

    #[test]
    fn test_parse_symbolic_name() {
        let format: TimeFormat = "rfc3339".parse().unwrap();
        assert_eq!("2006-01-02T15:04:05Z07:00", format.to_string());
    }

    #[test]
    fn test_parse_default_token() {
        assert_eq!(TimeFormat::default(), "Default".parse().unwrap());
        assert_eq!(TimeFormat::default(), "-".parse().unwrap());
    }

    // Tests for Layout::format().
    #[test]
    fn test_format_default_layout_trims_fraction() {
        let format = TimeFormat::default();
        assert_eq!(
            "2025-01-02 03:04:05.12",
            format.format(&reference_time(), &Zone::Utc)
        );

        let whole_second = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            "2025-01-02 03:04:05",
            format.format(&whole_second, &Zone::Utc)
        );
    }

    #[test]
    fn test_format_fixed_fraction() {
        let layout = Layout::new("15:04:05.000000");
        assert_eq!(
            "03:04:05.120000",
            layout.format(&reference_time(), &Zone::Utc)
        );
    }

    #[test]
    fn test_format_rfc3339_in_named_zone() {
        let format: TimeFormat = "RFC3339".parse().unwrap();
        let zone: Zone = "Asia/Seoul".parse().unwrap();
        assert_eq!(
            "2025-01-02T12:04:05+09:00",
            format.format(&reference_time(), &zone)
        );
        assert_eq!(
            "2025-01-02T03:04:05Z",
            format.format(&reference_time(), &Zone::Utc)
        );
    }

    #[test]
    fn test_format_names_and_twelve_hour_clock() {
        let layout = Layout::new("Monday, January _2 3:04PM");
        assert_eq!(
            "Thursday, January  2 3:04AM",
            layout.format(&reference_time(), &Zone::Utc)
        );
    }

    #[test]
    fn test_format_time_of_day_label() {
        let layout = Layout::new("15:04:05");
        assert_eq!("03:04:05", layout.format(&reference_time(), &Zone::Utc));
    }

    #[test]
    fn test_format_long_year_after_underscore() {
        let layout = Layout::new("_2006");
        assert_eq!("_2025", layout.format(&reference_time(), &Zone::Utc));
    }

    // Tests for Layout::parse().
    #[test]
    fn test_parse_default_layout() {
        let format = TimeFormat::default();
        assert_eq!(
            reference_time(),
            format.parse("2025-01-02 03:04:05.12", &Zone::Utc).unwrap()
        );
    }

    #[test]
    fn test_parse_in_named_zone() {
        let format = TimeFormat::default();
        let zone: Zone = "Asia/Seoul".parse().unwrap();
        assert_eq!(
            reference_time(),
            format.parse("2025-01-02 12:04:05.120", &zone).unwrap()
        );
    }

    #[test]
    fn test_parse_offset_overrides_zone() {
        let format: TimeFormat = "RFC3339".parse().unwrap();
        let zone: Zone = "Asia/Seoul".parse().unwrap();
        assert_eq!(
            Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            format.parse("2025-01-02T05:04:05+02:00", &zone).unwrap()
        );
    }

    #[test]
    fn test_parse_kitchen() {
        let format: TimeFormat = "Kitchen".parse().unwrap();
        let parsed = format.parse("3:04:05PM", &Zone::Utc).unwrap();
        assert_eq!(15, parsed.hour());
        assert_eq!(0, parsed.year());
    }

    #[test]
    fn test_parse_rejects_extra_text() {
        let format = TimeFormat::default();
        assert!(
            format
                .parse("2025-01-02 03:04:05 trailing", &Zone::Utc)
                .is_err()
        );
    }

    #[test]
    fn test_parse_rejects_invalid_date() {
        let format = TimeFormat::default();
        assert!(format.parse("2025-02-30 03:04:05", &Zone::Utc).is_err());
    }

    // Tests for EpochUnit.
    #[test]
    fn test_encode_epoch_units() {
        let time = reference_time();
        assert_eq!(1735787045, EpochUnit::Seconds.encode(&time));
        assert_eq!(1735787045120, EpochUnit::Milliseconds.encode(&time));
        assert_eq!(1735787045120000, EpochUnit::Microseconds.encode(&time));
        assert_eq!(1735787045120000000, EpochUnit::Nanoseconds.encode(&time));
    }

    #[test]
    fn test_decode_epoch_milliseconds_multiplies_by_unit() {
        let format: TimeFormat = "ms".parse().unwrap();
        assert_eq!(
            reference_time(),
            format.parse("1735787045120", &Zone::Utc).unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_non_integer_epoch() {
        let format: TimeFormat = "s".parse().unwrap();
        assert!(format.parse("17357.5", &Zone::Utc).is_err());
    }

    proptest! {
        #[test]
        fn test_epoch_encoding_truncates_to_unit(
            nanoseconds in -4_000_000_000_000_000_000i64..4_000_000_000_000_000_000i64
        ) {
            let time = DateTime::from_timestamp_nanos(nanoseconds);
            for (unit, per_unit) in [
                (EpochUnit::Nanoseconds, 1i64),
                (EpochUnit::Microseconds, 1_000),
                (EpochUnit::Milliseconds, 1_000_000),
                (EpochUnit::Seconds, 1_000_000_000),
            ] {
                let encoded = unit.encode(&time);
                prop_assert_eq!(nanoseconds.div_euclid(per_unit) as i128, encoded);

                let decoded = unit.decode(encoded as i64).unwrap();
                let truncated = DateTime::from_timestamp_nanos(
                    nanoseconds.div_euclid(per_unit) * per_unit
                );
                prop_assert_eq!(truncated, decoded);
            }
        }

        #[test]
        fn test_default_layout_round_trips_milliseconds(milliseconds in 0i64..4_102_444_800_000i64) {
            let time = DateTime::from_timestamp_millis(milliseconds).unwrap();
            let format = TimeFormat::default();
            let text = format.format(&time, &Zone::Utc);
            prop_assert_eq!(time, format.parse(&text, &Zone::Utc).unwrap());
        }
    }
}
