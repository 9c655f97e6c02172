//! Packed decimal (BCD) encoding.
//!
//! Two decimal digits share a byte; the low nibble of the last byte holds the
//! sign. A field of `length` bytes therefore carries `2 * length - 1` digits.
//!
//! Example: `+123.45` in a 4-byte field with two decimals
//! - digits: `0012345`
//! - bytes: `0x00 0x12 0x34 0x5C`

use rust_decimal::Decimal;
use thiserror::Error;

const POSITIVE: u8 = 0x0C;
const NEGATIVE: u8 = 0x0D;

/// Why a value could not be packed or unpacked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum PackError {
    #[error("{actual} fraction digits exceed the {allowed} declared")]
    Scale { actual: u32, allowed: u32 },
    #[error("{digits} digits exceed the {capacity} that fit")]
    Precision { digits: usize, capacity: usize },
    #[error("field has no room for a sign nibble")]
    Empty,
    #[error("invalid digit nibble 0x{0:X}")]
    Digit(u8),
    #[error("invalid sign nibble 0x{0:X}")]
    Sign(u8),
    #[error("value exceeds the decimal range")]
    Overflow,
}

/// Packs `value` into `length` bytes with `decimals` fraction digits.
///
/// Trailing fractional zeros beyond `decimals` are dropped; any other excess
/// precision is an error rather than a rounding.
pub(crate) fn pack(value: Decimal, length: usize, decimals: u32) -> Result<Vec<u8>, PackError> {
    if length == 0 {
        return Err(PackError::Empty);
    }
    let normalized = value.normalize();
    if normalized.scale() > decimals {
        return Err(PackError::Scale {
            actual: normalized.scale(),
            allowed: decimals,
        });
    }
    let factor = 10_u128
        .checked_pow(decimals - normalized.scale())
        .ok_or(PackError::Overflow)?;
    let magnitude = normalized
        .mantissa()
        .unsigned_abs()
        .checked_mul(factor)
        .ok_or(PackError::Overflow)?;

    let digits = magnitude.to_string();
    let capacity = length * 2 - 1;
    if digits.len() > capacity {
        return Err(PackError::Precision {
            digits: digits.len(),
            capacity,
        });
    }

    let sign = if normalized.is_sign_negative() && !normalized.is_zero() {
        NEGATIVE
    } else {
        POSITIVE
    };
    let nibbles: Vec<u8> = std::iter::repeat_n(0_u8, capacity - digits.len())
        .chain(digits.bytes().map(|digit| digit - b'0'))
        .chain(std::iter::once(sign))
        .collect();

    Ok(nibbles
        .chunks_exact(2)
        .map(|pair| match pair {
            [high, low] => (high << 4) | low,
            _ => 0,
        })
        .collect())
}

/// Unpacks a BCD field with `decimals` fraction digits.
///
/// Sign nibbles `C`, `A`, `E` and `F` read as positive, `D` and `B` as
/// negative.
pub(crate) fn unpack(bytes: &[u8], decimals: u32) -> Result<Decimal, PackError> {
    let Some((last, leading)) = bytes.split_last() else {
        return Err(PackError::Empty);
    };

    let mut magnitude = 0_i128;
    let digits = leading
        .iter()
        .flat_map(|byte| [byte >> 4, byte & 0x0F])
        .chain(std::iter::once(last >> 4));
    for digit in digits {
        if digit > 9 {
            return Err(PackError::Digit(digit));
        }
        magnitude = magnitude
            .checked_mul(10)
            .and_then(|shifted| shifted.checked_add(i128::from(digit)))
            .ok_or(PackError::Overflow)?;
    }

    let signed = match last & 0x0F {
        0x0C | 0x0A | 0x0E | 0x0F => magnitude,
        0x0D | 0x0B => -magnitude,
        other => return Err(PackError::Sign(other)),
    };
    Decimal::try_from_i128_with_scale(signed, decimals).map_err(|_| PackError::Overflow)
}
