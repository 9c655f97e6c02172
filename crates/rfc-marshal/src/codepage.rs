//! Character encodings negotiated per session.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::MarshalError;

/// Codepages the marshaller can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codepage {
    /// `4103`: UTF-16 little endian, two bytes per unit.
    Utf16Le,
    /// `4110`: UTF-8, one byte per unit.
    Utf8,
    /// `1100`: ISO-8859-1, one byte per unit.
    Latin1,
}

impl Codepage {
    /// Numeric identifier used on the wire and in connection info.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Utf16Le => 4103,
            Self::Utf8 => 4110,
            Self::Latin1 => 1100,
        }
    }

    /// Maps a numeric identifier to a supported codepage.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            4103 => Some(Self::Utf16Le),
            4110 => Some(Self::Utf8),
            1100 => Some(Self::Latin1),
            _ => None,
        }
    }

    /// Bytes per character unit.
    #[must_use]
    pub const fn unit_width(self) -> usize {
        match self {
            Self::Utf16Le => 2,
            Self::Utf8 | Self::Latin1 => 1,
        }
    }

    /// Appends `text` to `out`, returning the number of units written.
    ///
    /// Returns `None` when a character has no representation.
    pub(crate) fn encode_into(self, text: &str, out: &mut BytesMut) -> Option<usize> {
        match self {
            Self::Utf16Le => {
                let mut units = 0_usize;
                for unit in text.encode_utf16() {
                    out.put_u16_le(unit);
                    units += 1;
                }
                Some(units)
            }
            Self::Utf8 => {
                out.put_slice(text.as_bytes());
                Some(text.len())
            }
            Self::Latin1 => {
                let mut units = 0_usize;
                for ch in text.chars() {
                    out.put_u8(u8::try_from(u32::from(ch)).ok()?);
                    units += 1;
                }
                Some(units)
            }
        }
    }

    /// Number of units `text` occupies, or `None` when unrepresentable.
    pub(crate) fn units_of(self, text: &str) -> Option<usize> {
        match self {
            Self::Utf16Le => Some(text.encode_utf16().count()),
            Self::Utf8 => Some(text.len()),
            Self::Latin1 => text
                .chars()
                .all(|ch| u32::from(ch) <= 0xFF)
                .then(|| text.chars().count()),
        }
    }

    /// Decodes a whole buffer of this codepage.
    pub(crate) fn decode(self, raw: &[u8]) -> Result<String, String> {
        match self {
            Self::Utf16Le => {
                let pairs = raw.chunks_exact(2);
                if !pairs.remainder().is_empty() {
                    return Err("odd number of bytes for UTF-16".to_owned());
                }
                char::decode_utf16(pairs.map(|mut pair| pair.get_u16_le()))
                    .collect::<Result<String, _>>()
                    .map_err(|err| err.to_string())
            }
            Self::Utf8 => String::from_utf8(raw.to_vec()).map_err(|err| err.to_string()),
            Self::Latin1 => Ok(raw.iter().copied().map(char::from).collect()),
        }
    }
}

impl fmt::Display for Codepage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Codepage {
    type Err = MarshalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u16>()
            .ok()
            .and_then(Self::from_code)
            .ok_or_else(|| MarshalError::UnsupportedCodepage {
                codepage: s.to_owned(),
            })
    }
}
