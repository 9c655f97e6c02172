//! Encoding and decoding of single typed fields.
//!
//! Every field is written in its declared layout. Fixed-length fields occupy
//! exactly their declared width, variable-length fields carry a `u32` length
//! prefix, and structures and tables recurse. A value whose variant does not
//! suit the declared type is rejected, never converted.

use std::borrow::Cow;
use std::str::FromStr;

use bytes::{Buf, BufMut, BytesMut};
use rfc_config::{BcdRepresentation, ClientOptions, DateRepresentation, TimeRepresentation};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use time::{Date, Month, Time};

use crate::codepage::Codepage;
use crate::error::MarshalError;
use crate::packed::{self, PackError};
use crate::schema::{FieldType, StructureType};
use crate::value::{FieldValue, Structure};
use crate::wire::{put_len, read_len, read_u8, take};

const DATE_DIGITS: usize = 8;
const TIME_DIGITS: usize = 6;

/// Field encoder bound to one session's codepage and the client's options.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldCodec {
    codepage: Codepage,
    options: ClientOptions,
}

impl FieldCodec {
    pub(crate) const fn new(codepage: Codepage, options: ClientOptions) -> Self {
        Self { codepage, options }
    }

    pub(crate) const fn codepage(&self) -> Codepage {
        self.codepage
    }

    pub(crate) const fn options(&self) -> ClientOptions {
        self.options
    }

    /// Appends `value` to `out` in the layout of `field_type`.
    pub(crate) fn encode(
        &self,
        field_type: &FieldType,
        value: &FieldValue,
        path: &str,
        out: &mut BytesMut,
    ) -> Result<(), MarshalError> {
        match (field_type, value) {
            (FieldType::Char { length }, FieldValue::Text(text)) => {
                self.put_fixed_text(field_type, text, *length, path, out)
            }
            (FieldType::Num { length }, FieldValue::Text(text)) => {
                require_digits(field_type, text, path)?;
                let padded = format!("{text:0>width$}", width = *length);
                self.put_fixed_text(field_type, &padded, *length, path, out)
            }
            (FieldType::Date, FieldValue::Text(text)) => {
                self.put_digit_field(field_type, text, DATE_DIGITS, path, out)
            }
            (FieldType::Date, FieldValue::Date(date)) => {
                let digits = date_digits(*date).ok_or_else(|| out_of_range(
                    field_type,
                    path,
                    format!("year {} has no four-digit form", date.year()),
                ))?;
                self.put_digit_field(field_type, &digits, DATE_DIGITS, path, out)
            }
            (FieldType::Time, FieldValue::Text(text)) => {
                self.put_digit_field(field_type, text, TIME_DIGITS, path, out)
            }
            (FieldType::Time, FieldValue::Time(time)) => {
                let digits = time_digits(*time);
                self.put_digit_field(field_type, &digits, TIME_DIGITS, path, out)
            }
            (FieldType::Bytes { length }, FieldValue::Bytes(bytes)) => {
                if bytes.len() > *length {
                    return Err(out_of_range(
                        field_type,
                        path,
                        format!("{} bytes exceed {length}", bytes.len()),
                    ));
                }
                out.put_slice(bytes);
                out.put_bytes(0, *length - bytes.len());
                Ok(())
            }
            (FieldType::String, FieldValue::Text(text)) => {
                let mut encoded = BytesMut::new();
                self.codepage
                    .encode_into(text, &mut encoded)
                    .ok_or_else(|| self.unrepresentable(path))?;
                put_len(out, encoded.len(), path)?;
                out.put_slice(&encoded);
                Ok(())
            }
            (FieldType::XString, FieldValue::Bytes(bytes)) => {
                put_len(out, bytes.len(), path)?;
                out.put_slice(bytes);
                Ok(())
            }
            (FieldType::Int1, FieldValue::Integer(number)) => {
                let narrow = u8::try_from(*number)
                    .map_err(|_| out_of_range(field_type, path, format!("{number} outside 0..=255")))?;
                out.put_u8(narrow);
                Ok(())
            }
            (FieldType::Int2, FieldValue::Integer(number)) => {
                let narrow = i16::try_from(*number)
                    .map_err(|_| out_of_range(field_type, path, format!("{number} outside i16")))?;
                out.put_i16_le(narrow);
                Ok(())
            }
            (FieldType::Int4, FieldValue::Integer(number)) => {
                let narrow = i32::try_from(*number)
                    .map_err(|_| out_of_range(field_type, path, format!("{number} outside i32")))?;
                out.put_i32_le(narrow);
                Ok(())
            }
            (FieldType::Int8, FieldValue::Integer(number)) => {
                out.put_i64_le(*number);
                Ok(())
            }
            (FieldType::Float, FieldValue::Float(number)) => {
                out.put_f64_le(*number);
                Ok(())
            }
            (FieldType::Bcd { length, decimals }, _) => {
                let decimal = self.bcd_input(field_type, value, path)?;
                let packed = packed::pack(decimal, *length, *decimals)
                    .map_err(|err| pack_error(field_type, path, &err))?;
                out.put_slice(&packed);
                Ok(())
            }
            (FieldType::Structure(structure), FieldValue::Structure(fields)) => {
                self.encode_structure(structure, fields, path, out)
            }
            (FieldType::Table(structure), FieldValue::Table(rows)) => {
                put_len(out, rows.len(), path)?;
                for (index, row) in rows.iter().enumerate() {
                    self.encode_structure(structure, row, &format!("{path}[{index}]"), out)?;
                }
                Ok(())
            }
            _ => Err(mismatch(field_type, value, path)),
        }
    }

    /// Reads one value of `field_type` from the front of `input`.
    pub(crate) fn decode(
        &self,
        field_type: &FieldType,
        input: &mut &[u8],
        path: &str,
    ) -> Result<FieldValue, MarshalError> {
        match field_type {
            FieldType::Char { length } => {
                let text = self.read_fixed_text(field_type, input, *length, path)?;
                if self.options.rstrip {
                    Ok(FieldValue::Text(text.trim_end_matches(' ').to_owned()))
                } else {
                    Ok(FieldValue::Text(text))
                }
            }
            FieldType::Num { length } => self
                .read_fixed_text(field_type, input, *length, path)
                .map(FieldValue::Text),
            FieldType::Date => {
                let digits = self.read_fixed_text(field_type, input, DATE_DIGITS, path)?;
                let native = match self.options.date {
                    DateRepresentation::Native => parse_date(&digits),
                    DateRepresentation::Text => None,
                };
                Ok(native.map_or(FieldValue::Text(digits), FieldValue::Date))
            }
            FieldType::Time => {
                let digits = self.read_fixed_text(field_type, input, TIME_DIGITS, path)?;
                let native = match self.options.time {
                    TimeRepresentation::Native => parse_time(&digits),
                    TimeRepresentation::Text => None,
                };
                Ok(native.map_or(FieldValue::Text(digits), FieldValue::Time))
            }
            FieldType::Bytes { length } => {
                Ok(FieldValue::Bytes(take(input, *length, path)?.to_vec()))
            }
            FieldType::String => {
                let len = read_len(input, path)?;
                let raw = take(input, len, path)?;
                self.codepage
                    .decode(raw)
                    .map(FieldValue::Text)
                    .map_err(|reason| invalid_data(field_type, path, reason))
            }
            FieldType::XString => {
                let len = read_len(input, path)?;
                Ok(FieldValue::Bytes(take(input, len, path)?.to_vec()))
            }
            FieldType::Int1 => Ok(FieldValue::Integer(i64::from(read_u8(input, path)?))),
            FieldType::Int2 => {
                let mut raw = take(input, 2, path)?;
                Ok(FieldValue::Integer(i64::from(raw.get_i16_le())))
            }
            FieldType::Int4 => {
                let mut raw = take(input, 4, path)?;
                Ok(FieldValue::Integer(i64::from(raw.get_i32_le())))
            }
            FieldType::Int8 => {
                let mut raw = take(input, 8, path)?;
                Ok(FieldValue::Integer(raw.get_i64_le()))
            }
            FieldType::Float => {
                let mut raw = take(input, 8, path)?;
                Ok(FieldValue::Float(raw.get_f64_le()))
            }
            FieldType::Bcd { length, decimals } => {
                let raw = take(input, *length, path)?;
                let decimal = packed::unpack(raw, *decimals)
                    .map_err(|err| invalid_data(field_type, path, err.to_string()))?;
                self.bcd_output(field_type, decimal, path)
            }
            FieldType::Structure(structure) => self
                .decode_structure(structure, input, path)
                .map(FieldValue::Structure),
            FieldType::Table(structure) => {
                let count = read_len(input, path)?;
                let mut rows = Vec::new();
                for index in 0..count {
                    rows.push(self.decode_structure(structure, input, &format!("{path}[{index}]"))?);
                }
                Ok(FieldValue::Table(rows))
            }
        }
    }

    fn encode_structure(
        &self,
        structure: &StructureType,
        fields: &Structure,
        path: &str,
        out: &mut BytesMut,
    ) -> Result<(), MarshalError> {
        if let Some(unknown) = fields.names().find(|name| structure.field(name).is_none()) {
            return Err(MarshalError::UnknownField {
                structure: structure.name().to_owned(),
                field: unknown.to_owned(),
                path: path.to_owned(),
            });
        }
        for descriptor in structure.fields() {
            let declared = descriptor.field_type();
            let value = fields
                .get(descriptor.name())
                .map_or_else(|| Cow::Owned(declared.initial_value()), Cow::Borrowed);
            self.encode(declared, &value, &format!("{path}.{}", descriptor.name()), out)?;
        }
        Ok(())
    }

    fn decode_structure(
        &self,
        structure: &StructureType,
        input: &mut &[u8],
        path: &str,
    ) -> Result<Structure, MarshalError> {
        let mut fields = Structure::new();
        for descriptor in structure.fields() {
            let child = format!("{path}.{}", descriptor.name());
            let value = self.decode(descriptor.field_type(), input, &child)?;
            fields.insert(descriptor.name(), value);
        }
        Ok(fields)
    }

    fn put_fixed_text(
        &self,
        field_type: &FieldType,
        text: &str,
        length: usize,
        path: &str,
        out: &mut BytesMut,
    ) -> Result<(), MarshalError> {
        let units = self
            .codepage
            .units_of(text)
            .ok_or_else(|| self.unrepresentable(path))?;
        if units > length {
            return Err(out_of_range(
                field_type,
                path,
                format!("{units} characters exceed {length}"),
            ));
        }
        self.codepage
            .encode_into(text, out)
            .ok_or_else(|| self.unrepresentable(path))?;
        self.codepage
            .encode_into(&" ".repeat(length - units), out)
            .ok_or_else(|| self.unrepresentable(path))?;
        Ok(())
    }

    fn put_digit_field(
        &self,
        field_type: &FieldType,
        digits: &str,
        width: usize,
        path: &str,
        out: &mut BytesMut,
    ) -> Result<(), MarshalError> {
        require_digits(field_type, digits, path)?;
        if digits.len() != width {
            return Err(out_of_range(
                field_type,
                path,
                format!("expected exactly {width} digits, got {}", digits.len()),
            ));
        }
        self.put_fixed_text(field_type, digits, width, path, out)
    }

    fn read_fixed_text(
        &self,
        field_type: &FieldType,
        input: &mut &[u8],
        units: usize,
        path: &str,
    ) -> Result<String, MarshalError> {
        let raw = take(input, units * self.codepage.unit_width(), path)?;
        self.codepage
            .decode(raw)
            .map_err(|reason| invalid_data(field_type, path, reason))
    }

    fn bcd_input(
        &self,
        field_type: &FieldType,
        value: &FieldValue,
        path: &str,
    ) -> Result<Decimal, MarshalError> {
        match value {
            FieldValue::PackedDecimal(decimal) => Ok(*decimal),
            FieldValue::Integer(number) => Ok(Decimal::from(*number)),
            FieldValue::Text(text) => Decimal::from_str(text.trim()).map_err(|_| {
                MarshalError::TypeMismatch {
                    path: path.to_owned(),
                    expected: format!("{field_type} as a decimal literal"),
                    actual: "non-numeric text",
                }
            }),
            FieldValue::Float(number) if self.options.bcd == BcdRepresentation::Float => {
                Decimal::from_str(&number.to_string()).map_err(|_| {
                    out_of_range(field_type, path, format!("{number} has no decimal form"))
                })
            }
            _ => Err(mismatch(field_type, value, path)),
        }
    }

    fn bcd_output(
        &self,
        field_type: &FieldType,
        decimal: Decimal,
        path: &str,
    ) -> Result<FieldValue, MarshalError> {
        match self.options.bcd {
            BcdRepresentation::Decimal => Ok(FieldValue::PackedDecimal(decimal)),
            BcdRepresentation::Text => Ok(FieldValue::Text(decimal.to_string())),
            BcdRepresentation::Float => decimal.to_f64().map(FieldValue::Float).ok_or_else(|| {
                invalid_data(field_type, path, format!("{decimal} has no float form"))
            }),
        }
    }

    fn unrepresentable(&self, path: &str) -> MarshalError {
        MarshalError::Unrepresentable {
            path: path.to_owned(),
            codepage: self.codepage.code(),
        }
    }
}

fn require_digits(field_type: &FieldType, text: &str, path: &str) -> Result<(), MarshalError> {
    if text.bytes().all(|byte| byte.is_ascii_digit()) {
        Ok(())
    } else {
        Err(MarshalError::TypeMismatch {
            path: path.to_owned(),
            expected: format!("{field_type} digits"),
            actual: "non-digit text",
        })
    }
}

fn date_digits(date: Date) -> Option<String> {
    let year = date.year();
    (0..=9999).contains(&year).then(|| {
        format!("{year:04}{:02}{:02}", u8::from(date.month()), date.day())
    })
}

fn time_digits(time: Time) -> String {
    format!("{:02}{:02}{:02}", time.hour(), time.minute(), time.second())
}

fn parse_date(digits: &str) -> Option<Date> {
    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let month: u8 = digits.get(4..6)?.parse().ok()?;
    let day: u8 = digits.get(6..8)?.parse().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

fn parse_time(digits: &str) -> Option<Time> {
    let hour: u8 = digits.get(0..2)?.parse().ok()?;
    let minute: u8 = digits.get(2..4)?.parse().ok()?;
    let second: u8 = digits.get(4..6)?.parse().ok()?;
    Time::from_hms(hour, minute, second).ok()
}

fn mismatch(field_type: &FieldType, value: &FieldValue, path: &str) -> MarshalError {
    MarshalError::TypeMismatch {
        path: path.to_owned(),
        expected: field_type.to_string(),
        actual: value.kind(),
    }
}

fn out_of_range(field_type: &FieldType, path: &str, reason: String) -> MarshalError {
    MarshalError::OutOfRange {
        path: path.to_owned(),
        expected: field_type.to_string(),
        reason,
    }
}

fn invalid_data(field_type: &FieldType, path: &str, reason: String) -> MarshalError {
    MarshalError::InvalidData {
        path: path.to_owned(),
        expected: field_type.to_string(),
        reason,
    }
}

fn pack_error(field_type: &FieldType, path: &str, err: &PackError) -> MarshalError {
    out_of_range(field_type, path, err.to_string())
}
