//! # Timestamps and timestamp patterns
//!
//! [`Timestamp`] is a UTC wall-clock instant with sub-second precision, backed by a
//! [`hifitime::Epoch`]. Arithmetic is done in **Unix seconds** (`f64`), so the delta
//! between two timestamps ignores leap seconds exactly like the Unix clock does.
//!
//! ## Patterns
//!
//! Parsing and formatting use fixed-width field codes: a width digit followed by a
//! field letter. Every other character is a literal.
//!
//! | Code | Field |
//! |------|-------|
//! | `Y`  | year |
//! | `M`  | month |
//! | `D`  | day |
//! | `h`  | hour |
//! | `m`  | minute |
//! | `s`  | second |
//! | `z`  | fraction of second (`3z` = milliseconds) |
//! | `Z`  | time-zone designator, skipped on read, printed as `Z` |
//!
//! For instance `"4Y-2M-2DT2h:2m:2s.3z1Z"` reads `2018-01-31T11:17:46.160Z`.
//!
//! A [`FormatContext`] carries the read and print patterns explicitly. A thread-local
//! default context backs the convenience entry points ([`Timestamp::parse`],
//! `Display`); change it with [`set_read_format`] / [`set_print_format`] at startup.
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use hifitime::Epoch;
use nom::{
    branch::alt,
    character::complete::{anychar, one_of, satisfy},
    combinator::map,
    multi::many0,
    sequence::pair,
    IResult, Parser,
};

use crate::constants::{Seconds, DEFAULT_PRINT_PATTERN, DEFAULT_READ_PATTERN};
use crate::tracklib_errors::TrackError;

/// Read and print patterns used by timestamp parsing and formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatContext {
    pub read_pattern: String,
    pub print_pattern: String,
}

impl Default for FormatContext {
    fn default() -> Self {
        FormatContext {
            read_pattern: DEFAULT_READ_PATTERN.to_string(),
            print_pattern: DEFAULT_PRINT_PATTERN.to_string(),
        }
    }
}

impl FormatContext {
    pub fn new(read_pattern: &str, print_pattern: &str) -> Self {
        FormatContext {
            read_pattern: read_pattern.to_string(),
            print_pattern: print_pattern.to_string(),
        }
    }

    /// Parse `s` with this context's read pattern.
    pub fn parse(&self, s: &str) -> Result<Timestamp, TrackError> {
        Timestamp::parse_with(s, &self.read_pattern)
    }

    /// Parse `s` with the read pattern, falling back to a number of Unix seconds.
    pub fn parse_or_unix(&self, s: &str) -> Result<Timestamp, TrackError> {
        self.parse(s).or_else(|e| {
            s.trim()
                .parse::<Seconds>()
                .map(Timestamp::from_unix)
                .map_err(|_| e)
        })
    }

    /// Format `t` with this context's print pattern.
    pub fn format(&self, t: &Timestamp) -> String {
        t.format_with(&self.print_pattern)
    }
}

thread_local! {
    static DEFAULT_FORMAT: RefCell<FormatContext> = RefCell::new(FormatContext::default());
}

/// Set the default read pattern of the current thread.
pub fn set_read_format(pattern: &str) {
    DEFAULT_FORMAT.with(|f| f.borrow_mut().read_pattern = pattern.to_string());
}

/// Set the default print pattern of the current thread.
pub fn set_print_format(pattern: &str) {
    DEFAULT_FORMAT.with(|f| f.borrow_mut().print_pattern = pattern.to_string());
}

/// Snapshot of the current thread's default [`FormatContext`].
pub fn default_format() -> FormatContext {
    DEFAULT_FORMAT.with(|f| f.borrow().clone())
}

// -------------------------------------------------------------------------------------------------
// Pattern tokens
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Fraction,
    Zone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Field(Field, usize),
    Literal(char),
}

fn field_token(input: &str) -> IResult<&str, Token> {
    map(
        pair(satisfy(|c| c.is_ascii_digit()), one_of("YMDhmszZ")),
        |(width, code)| {
            let field = match code {
                'Y' => Field::Year,
                'M' => Field::Month,
                'D' => Field::Day,
                'h' => Field::Hour,
                'm' => Field::Minute,
                's' => Field::Second,
                'z' => Field::Fraction,
                _ => Field::Zone,
            };
            Token::Field(field, width.to_digit(10).unwrap_or(0) as usize)
        },
    )
    .parse(input)
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let parsed: IResult<&str, Vec<Token>> =
        many0(alt((field_token, map(anychar, Token::Literal)))).parse(pattern);
    match parsed {
        Ok((_, tokens)) => tokens,
        Err(_) => pattern.chars().map(Token::Literal).collect(),
    }
}

// -------------------------------------------------------------------------------------------------
// Timestamp
// -------------------------------------------------------------------------------------------------

/// UTC timestamp with sub-second precision.
#[derive(Clone, Copy)]
pub struct Timestamp {
    epoch: Epoch,
}

impl Timestamp {
    /// Build a timestamp from calendar components.
    ///
    /// Arguments
    /// -----------------
    /// * `year`, `month`, `day`, `hour`, `minute`, `second` – civil UTC components.
    /// * `nanos` – sub-second part in nanoseconds.
    ///
    /// Return
    /// ----------
    /// * The timestamp, or [`TrackError::WrongArgument`] if the components do not form a
    ///   valid Gregorian date.
    pub fn new(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        nanos: u32,
    ) -> Result<Self, TrackError> {
        Epoch::maybe_from_gregorian_utc(year, month, day, hour, minute, second, nanos)
            .map(|epoch| Timestamp { epoch })
            .map_err(|e| {
                TrackError::wrong(format!(
                    "invalid date {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}: {e}"
                ))
            })
    }

    /// Timestamp at `seconds` after 1970-01-01T00:00:00 UTC.
    pub fn from_unix(seconds: Seconds) -> Self {
        Timestamp {
            epoch: Epoch::from_unix_seconds(seconds),
        }
    }

    /// The Unix epoch, used as default timestamp by readers without a time column.
    pub fn zero() -> Self {
        Self::from_unix(0.0)
    }

    pub fn from_epoch(epoch: Epoch) -> Self {
        Timestamp { epoch }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Seconds since the Unix epoch.
    pub fn to_unix(&self) -> Seconds {
        self.epoch.to_unix_seconds()
    }

    /// Calendar components `(year, month, day, hour, minute, second, nanos)`.
    pub fn components(&self) -> (i32, u8, u8, u8, u8, u8, u32) {
        self.epoch.to_gregorian_utc()
    }

    pub fn year(&self) -> i32 {
        self.components().0
    }

    pub fn month(&self) -> u8 {
        self.components().1
    }

    pub fn day(&self) -> u8 {
        self.components().2
    }

    pub fn hour(&self) -> u8 {
        self.components().3
    }

    pub fn minute(&self) -> u8 {
        self.components().4
    }

    pub fn second(&self) -> u8 {
        self.components().5
    }

    /// Sub-second part in seconds, in `[0, 1)`.
    pub fn subsecond(&self) -> f64 {
        self.components().6 as f64 * 1e-9
    }

    /// New timestamp `seconds` later (negative values go back in time).
    pub fn add_seconds(&self, seconds: Seconds) -> Self {
        Self::from_unix(self.to_unix() + seconds)
    }

    /// Signed delta `self - other` in seconds.
    pub fn seconds_since(&self, other: &Timestamp) -> Seconds {
        self.to_unix() - other.to_unix()
    }

    /// Parse with the thread's default read pattern.
    pub fn parse(s: &str) -> Result<Self, TrackError> {
        default_format().parse(s)
    }

    /// Parse `s` with an explicit pattern.
    ///
    /// Literal characters of the pattern consume exactly one input character without
    /// being compared, so `"2D/2M/4Y"` reads `31-01-2018` as well.
    ///
    /// Return
    /// ----------
    /// * The parsed timestamp, or [`TrackError::WrongArgument`] if a field is not numeric,
    ///   the input is too short or the date is invalid.
    pub fn parse_with(s: &str, pattern: &str) -> Result<Self, TrackError> {
        let chars: Vec<char> = s.trim().chars().collect();
        let mut pos = 0usize;

        let (mut year, mut month, mut day) = (1970i32, 1u8, 1u8);
        let (mut hour, mut minute, mut second) = (0u8, 0u8, 0u8);
        let mut nanos = 0u32;

        for token in tokenize(pattern) {
            match token {
                Token::Literal(_) => pos += 1,
                Token::Field(field, width) => {
                    if pos + width > chars.len() {
                        return Err(TrackError::wrong(format!(
                            "timestamp '{s}' too short for pattern '{pattern}'"
                        )));
                    }
                    let raw: String = chars[pos..pos + width].iter().collect();
                    pos += width;
                    if field == Field::Zone {
                        continue;
                    }
                    let value: u32 = raw.trim().parse().map_err(|_| {
                        TrackError::wrong(format!("invalid field '{raw}' in timestamp '{s}'"))
                    })?;
                    match field {
                        Field::Year => year = value as i32,
                        Field::Month => month = value as u8,
                        Field::Day => day = value as u8,
                        Field::Hour => hour = value as u8,
                        Field::Minute => minute = value as u8,
                        Field::Second => second = value as u8,
                        Field::Fraction => nanos = value * 10u32.pow(9 - width.min(9) as u32),
                        Field::Zone => {}
                    }
                }
            }
        }

        Self::new(year, month, day, hour, minute, second, nanos)
    }

    /// Format with an explicit pattern.
    pub fn format_with(&self, pattern: &str) -> String {
        let (year, month, day, hour, minute, second, nanos) = self.components();
        let mut out = String::with_capacity(pattern.len() + 8);
        for token in tokenize(pattern) {
            match token {
                Token::Literal(c) => out.push(c),
                Token::Field(field, width) => {
                    let value: u64 = match field {
                        Field::Year => year as u64,
                        Field::Month => month as u64,
                        Field::Day => day as u64,
                        Field::Hour => hour as u64,
                        Field::Minute => minute as u64,
                        Field::Second => second as u64,
                        Field::Fraction => nanos as u64 / 10u64.pow(9 - width.min(9) as u32),
                        Field::Zone => {
                            out.push('Z');
                            continue;
                        }
                    };
                    out.push_str(&format!("{value:0width$}"));
                }
            }
        }
        out
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.to_unix() == other.to_unix()
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.to_unix().partial_cmp(&other.to_unix())
    }
}

impl Sub for Timestamp {
    type Output = Seconds;

    fn sub(self, rhs: Timestamp) -> Seconds {
        self.seconds_since(&rhs)
    }
}

impl Add<Seconds> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Seconds) -> Timestamp {
        self.add_seconds(rhs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", default_format().format(self))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.format_with("4Y-2M-2DT2h:2m:2s.3z"))
    }
}
