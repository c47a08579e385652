use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, ZipviewError};

static DURATION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)([a-zA-Zµ]+)").expect("duration token pattern is valid"));

const MICROS_PER_MILLI: u64 = 1_000;

/// Units accepted in duration tokens such as `500us` or `2h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Micros,
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Years,
}

impl DurationUnit {
    pub const ALL: [DurationUnit; 8] = [
        Self::Micros,
        Self::Millis,
        Self::Seconds,
        Self::Minutes,
        Self::Hours,
        Self::Days,
        Self::Weeks,
        Self::Years,
    ];

    /// Length of one unit in microseconds. A year is 365 days.
    pub fn micros(self) -> u64 {
        match self {
            Self::Micros => 1,
            Self::Millis => 1_000,
            Self::Seconds => 1_000_000,
            Self::Minutes => 60 * 1_000_000,
            Self::Hours => 60 * 60 * 1_000_000,
            Self::Days => 24 * 60 * 60 * 1_000_000,
            Self::Weeks => 7 * 24 * 60 * 60 * 1_000_000,
            Self::Years => 365 * 24 * 60 * 60 * 1_000_000,
        }
    }
}

impl FromStr for DurationUnit {
    type Err = ZipviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "us" | "µs" => Ok(Self::Micros),
            "ms" => Ok(Self::Millis),
            "s" => Ok(Self::Seconds),
            "m" => Ok(Self::Minutes),
            "h" => Ok(Self::Hours),
            "d" => Ok(Self::Days),
            "w" => Ok(Self::Weeks),
            "y" => Ok(Self::Years),
            _ => Err(ZipviewError::Parse(format!("unknown duration unit: {s}"))),
        }
    }
}

/// Parses the first `<digits><unit>` token in `token` into milliseconds.
///
/// With `nano_mode` the exact microsecond count is returned, which is what
/// Zipkin expects for `minDuration`/`maxDuration`. Otherwise the value is
/// truncated to whole milliseconds.
/// Anything unparseable, overflowing or non-positive yields `None`.
pub fn parse_duration(token: Option<&str>, nano_mode: bool) -> Option<u64> {
    let token = token.filter(|t| !t.is_empty())?;
    let caps = DURATION_TOKEN.captures(token)?;

    let amount = caps[1].parse::<u64>().ok()?;
    let unit = DurationUnit::from_str(&caps[2]).ok()?;
    let micros = amount.checked_mul(unit.micros())?;

    let value = if nano_mode {
        micros
    } else {
        micros / MICROS_PER_MILLI
    };

    (value > 0).then_some(value)
}
