//! Value representation policies fixed when a client is constructed.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Errors encountered while parsing a representation policy from text.
pub type RepresentationParseError = strum::ParseError;

/// How packed-decimal (BCD) fields are surfaced on decode.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BcdRepresentation {
    /// Exact decimal values.
    #[default]
    Decimal,
    /// Decimal literal text such as `-12.50`.
    Text,
    /// Binary floating point. Also the only policy that accepts floats on encode.
    Float,
}

/// How date fields are surfaced on decode.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DateRepresentation {
    /// The literal `YYYYMMDD` digits.
    #[default]
    Text,
    /// A calendar date when the digits form one.
    Native,
}

/// How time fields are surfaced on decode.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TimeRepresentation {
    /// The literal `HHMMSS` digits.
    #[default]
    Text,
    /// A time of day when the digits form one.
    Native,
}

/// Client-wide value policies. Immutable once a client has been built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Strip trailing spaces from fixed-length text on decode.
    pub rstrip: bool,
    /// Packed-decimal representation.
    pub bcd: BcdRepresentation,
    /// Date representation.
    pub date: DateRepresentation,
    /// Time representation.
    pub time: TimeRepresentation,
}

impl ClientOptions {
    /// Returns a copy with trailing-space stripping switched on or off.
    #[must_use]
    pub const fn with_rstrip(mut self, rstrip: bool) -> Self {
        self.rstrip = rstrip;
        self
    }

    /// Returns a copy using the given packed-decimal representation.
    #[must_use]
    pub const fn with_bcd(mut self, bcd: BcdRepresentation) -> Self {
        self.bcd = bcd;
        self
    }

    /// Returns a copy using the given date representation.
    #[must_use]
    pub const fn with_date(mut self, date: DateRepresentation) -> Self {
        self.date = date;
        self
    }

    /// Returns a copy using the given time representation.
    #[must_use]
    pub const fn with_time(mut self, time: TimeRepresentation) -> Self {
        self.time = time;
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            rstrip: true,
            bcd: BcdRepresentation::default(),
            date: DateRepresentation::default(),
            time: TimeRepresentation::default(),
        }
    }
}
