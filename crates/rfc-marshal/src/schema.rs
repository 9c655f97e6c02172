//! Declared schema of remote function modules.
//!
//! A [`FunctionSignature`] is published by the remote side and fetched
//! through the metadata boundary before a call is encoded. Structure and
//! table types are shared behind `Arc` because one type is usually
//! referenced from several parameters and signatures.

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use strum::Display;

use crate::value::{FieldValue, Structure};

/// Wire type of a field or parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Fixed-length character field of `length` codepage units.
    Char {
        /// Units occupied on the wire.
        length: usize,
    },
    /// Fixed-length numeric text, digits only.
    Num {
        /// Digits occupied on the wire.
        length: usize,
    },
    /// Fixed-length raw bytes.
    Bytes {
        /// Bytes occupied on the wire.
        length: usize,
    },
    /// Variable-length text.
    String,
    /// Variable-length raw bytes.
    XString,
    /// Unsigned one-byte integer.
    Int1,
    /// Signed two-byte integer.
    Int2,
    /// Signed four-byte integer.
    Int4,
    /// Signed eight-byte integer.
    Int8,
    /// IEEE 754 double.
    Float,
    /// Packed decimal of `length` bytes with `decimals` fraction digits.
    Bcd {
        /// Bytes occupied on the wire.
        length: usize,
        /// Digits after the decimal point.
        decimals: u32,
    },
    /// `YYYYMMDD` date.
    Date,
    /// `HHMMSS` time.
    Time,
    /// Nested structure.
    Structure(Arc<StructureType>),
    /// Table of structure rows.
    Table(Arc<StructureType>),
}

impl FieldType {
    /// Value a field takes when the caller omits it.
    #[must_use]
    pub fn initial_value(&self) -> FieldValue {
        match self {
            Self::Char { .. } | Self::String => FieldValue::Text(String::new()),
            Self::Num { length } => FieldValue::Text("0".repeat(*length)),
            Self::Bytes { .. } | Self::XString => FieldValue::Bytes(Vec::new()),
            Self::Int1 | Self::Int2 | Self::Int4 | Self::Int8 => FieldValue::Integer(0),
            Self::Float => FieldValue::Float(0.0),
            Self::Bcd { .. } => FieldValue::PackedDecimal(Decimal::ZERO),
            Self::Date => FieldValue::Text("00000000".to_owned()),
            Self::Time => FieldValue::Text("000000".to_owned()),
            Self::Structure(structure) => FieldValue::Structure(structure.initial_value()),
            Self::Table(_) => FieldValue::Table(Vec::new()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char { length } => write!(f, "CHAR{length}"),
            Self::Num { length } => write!(f, "NUMC{length}"),
            Self::Bytes { length } => write!(f, "RAW{length}"),
            Self::String => f.write_str("STRING"),
            Self::XString => f.write_str("XSTRING"),
            Self::Int1 => f.write_str("INT1"),
            Self::Int2 => f.write_str("INT2"),
            Self::Int4 => f.write_str("INT4"),
            Self::Int8 => f.write_str("INT8"),
            Self::Float => f.write_str("FLOAT"),
            Self::Bcd { length, decimals } => write!(f, "BCD{length}.{decimals}"),
            Self::Date => f.write_str("DATS"),
            Self::Time => f.write_str("TIMS"),
            Self::Structure(structure) => write!(f, "structure {}", structure.name()),
            Self::Table(structure) => write!(f, "table of {}", structure.name()),
        }
    }
}

/// One named field of a structure type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
}

impl FieldDescriptor {
    /// Declares a field.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Declared type.
    #[must_use]
    pub const fn field_type(&self) -> &FieldType {
        &self.field_type
    }
}

/// A named, ordered list of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureType {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl StructureType {
    /// Declares a structure type.
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Type name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Fields in declared order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        self.fields.as_slice()
    }

    /// Looks a field up by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// A structure holding every field's initial value.
    #[must_use]
    pub fn initial_value(&self) -> Structure {
        self.fields
            .iter()
            .map(|field| (field.name.clone(), field.field_type.initial_value()))
            .collect()
    }
}

/// Which way a parameter travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ParameterDirection {
    /// Caller to remote.
    Import,
    /// Remote to caller.
    Export,
    /// Both ways; the remote returns the changed value.
    Changing,
    /// Table parameter, both ways.
    Tables,
}

impl ParameterDirection {
    /// Whether a caller may supply the parameter.
    #[must_use]
    pub const fn accepts_input(self) -> bool {
        !matches!(self, Self::Export)
    }

    /// Whether the remote returns the parameter.
    #[must_use]
    pub const fn returns_output(self) -> bool {
        !matches!(self, Self::Import)
    }
}

/// One parameter of a function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    name: String,
    direction: ParameterDirection,
    field_type: FieldType,
}

impl ParameterDescriptor {
    /// Declares a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, direction: ParameterDirection, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            direction,
            field_type,
        }
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Direction.
    #[must_use]
    pub const fn direction(&self) -> ParameterDirection {
        self.direction
    }

    /// Declared type.
    #[must_use]
    pub const fn field_type(&self) -> &FieldType {
        &self.field_type
    }
}

/// Published interface of one remote function module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    name: String,
    parameters: Vec<ParameterDescriptor>,
}

impl FunctionSignature {
    /// Declares a signature with parameters in published order.
    #[must_use]
    pub fn new(name: impl Into<String>, parameters: Vec<ParameterDescriptor>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    /// Function name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Parameters in published order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        self.parameters.as_slice()
    }

    /// Looks a parameter up by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }
}
