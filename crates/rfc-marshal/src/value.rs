//! Caller-facing value model.

use rust_decimal::Decimal;
use time::{Date, Time};

/// A single parameter or field value.
///
/// The variant set is closed; the marshaller rejects a variant that does not
/// suit the declared field type instead of converting it.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Character data (`Char`, `Num`, `String`, and the digit forms of `Date`
    /// and `Time`).
    Text(String),
    /// Raw bytes (`Bytes` and `XString`), compared byte for byte.
    Bytes(Vec<u8>),
    /// Signed integer for the `Int*` types and packed decimals without
    /// fraction digits.
    Integer(i64),
    /// Binary floating point.
    Float(f64),
    /// Exact decimal for packed (BCD) fields.
    PackedDecimal(Decimal),
    /// Calendar date.
    Date(Date),
    /// Time of day.
    Time(Time),
    /// Ordered named fields.
    Structure(Structure),
    /// Ordered rows of one structure type.
    Table(Vec<Structure>),
}

impl FieldValue {
    /// Short label of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::PackedDecimal(_) => "packed decimal",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Structure(_) => "structure",
            Self::Table(_) => "table",
        }
    }

    /// Borrows the text of a `Text` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Borrows the bytes of a `Bytes` value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    /// Returns the integer of an `Integer` value.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the float of a `Float` value.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the decimal of a `PackedDecimal` value.
    #[must_use]
    pub const fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::PackedDecimal(value) => Some(*value),
            _ => None,
        }
    }

    /// Borrows the fields of a `Structure` value.
    #[must_use]
    pub const fn as_structure(&self) -> Option<&Structure> {
        match self {
            Self::Structure(structure) => Some(structure),
            _ => None,
        }
    }

    /// Borrows the rows of a `Table` value.
    #[must_use]
    pub fn as_table(&self) -> Option<&[Structure]> {
        match self {
            Self::Table(rows) => Some(rows.as_slice()),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        Self::PackedDecimal(value)
    }
}

impl From<Date> for FieldValue {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

impl From<Time> for FieldValue {
    fn from(value: Time) -> Self {
        Self::Time(value)
    }
}

impl From<Structure> for FieldValue {
    fn from(value: Structure) -> Self {
        Self::Structure(value)
    }
}

impl From<Vec<Structure>> for FieldValue {
    fn from(value: Vec<Structure>) -> Self {
        Self::Table(value)
    }
}

/// Named values kept in insertion order.
///
/// Names are unique: inserting an existing name replaces its value in place,
/// so the original position is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    fields: Vec<(String, FieldValue)>,
}

impl Structure {
    /// An empty structure.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builder form of [`Structure::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets `name` to `value`, returning the value it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        let key = name.into();
        let new_value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            return Some(std::mem::replace(&mut slot.1, new_value));
        }
        self.fields.push((key, new_value));
        None
    }

    /// Borrows the value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Mutably borrows the value stored under `name`.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields
            .iter_mut()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Removes `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let position = self.fields.iter().position(|(existing, _)| existing == name)?;
        Some(self.fields.remove(position).1)
    }

    /// Whether `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Structure {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut structure = Self::new();
        for (name, value) in iter {
            structure.insert(name, value);
        }
        structure
    }
}

impl IntoIterator for Structure {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// A function name plus its input parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallRequest {
    function: String,
    parameters: Structure,
}

impl CallRequest {
    /// Starts a request for `function` without parameters.
    #[must_use]
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            parameters: Structure::new(),
        }
    }

    /// Builds a request from a function name and a parameter mapping.
    #[must_use]
    pub fn with_parameters(function: impl Into<String>, parameters: Structure) -> Self {
        Self {
            function: function.into(),
            parameters,
        }
    }

    /// Adds or replaces one parameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.parameters.insert(name, value);
        self
    }

    /// Function to invoke.
    #[must_use]
    pub fn function(&self) -> &str {
        self.function.as_str()
    }

    /// Input parameters in the order they were supplied.
    #[must_use]
    pub const fn parameters(&self) -> &Structure {
        &self.parameters
    }

    /// Splits the request into its name and parameters.
    #[must_use]
    pub fn into_parts(self) -> (String, Structure) {
        (self.function, self.parameters)
    }
}

/// Output parameters returned by a call, in the order the remote sent them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallResult(Structure);

impl CallResult {
    /// Wraps decoded output parameters.
    #[must_use]
    pub const fn new(parameters: Structure) -> Self {
        Self(parameters)
    }

    /// Borrows one output parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Output parameter names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.names()
    }

    /// Output parameters in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter()
    }

    /// Number of output parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the call returned nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unwraps the parameter mapping.
    #[must_use]
    pub fn into_inner(self) -> Structure {
        self.0
    }
}
