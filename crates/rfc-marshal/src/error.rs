//! Errors raised while converting between values and wire bytes.

use thiserror::Error;

/// A value or frame did not match the declared schema or wire layout.
///
/// `path` fields name the offending location, e.g. `IMPORTSTRUCT.RFCINT2` or
/// `RFCTABLE[3].RFCHEX3`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    /// The call named no function.
    #[error("function name must not be empty")]
    EmptyFunctionName,
    /// A parameter is not part of the function signature.
    #[error("function '{function}' has no parameter '{parameter}'")]
    UnknownParameter {
        /// Function being invoked.
        function: String,
        /// Name the caller supplied.
        parameter: String,
    },
    /// An output-only parameter was supplied as input.
    #[error("parameter '{parameter}' of '{function}' is an export and cannot be supplied")]
    ExportSupplied {
        /// Function being invoked.
        function: String,
        /// Export parameter the caller supplied.
        parameter: String,
    },
    /// A structure value carries a field its type does not declare.
    #[error("structure '{structure}' has no field '{field}' (at '{path}')")]
    UnknownField {
        /// Declared structure type name.
        structure: String,
        /// Field the caller supplied.
        field: String,
        /// Location of the structure value.
        path: String,
    },
    /// The value variant does not suit the declared field type.
    #[error("'{path}' expects {expected}, got {actual}")]
    TypeMismatch {
        /// Location of the value.
        path: String,
        /// Declared field type.
        expected: String,
        /// Variant that was supplied.
        actual: &'static str,
    },
    /// The value has the right variant but does not fit the field.
    #[error("'{path}' does not fit {expected}: {reason}")]
    OutOfRange {
        /// Location of the value.
        path: String,
        /// Declared field type.
        expected: String,
        /// What exceeded the field.
        reason: String,
    },
    /// Text contains characters the negotiated codepage cannot carry.
    #[error("'{path}' contains text not representable in codepage {codepage}")]
    Unrepresentable {
        /// Location of the value.
        path: String,
        /// Numeric codepage identifier.
        codepage: u16,
    },
    /// Bytes read from the wire do not decode under the declared type.
    #[error("'{path}' holds malformed {expected} data: {reason}")]
    InvalidData {
        /// Location of the value.
        path: String,
        /// Declared field type.
        expected: String,
        /// Decoding failure.
        reason: String,
    },
    /// A frame is truncated, has trailing bytes, or carries an unknown tag.
    #[error("malformed frame: {reason}")]
    MalformedFrame {
        /// What was wrong with the frame.
        reason: String,
    },
    /// The session negotiated a codepage this marshaller does not implement.
    #[error("unsupported codepage '{codepage}'")]
    UnsupportedCodepage {
        /// Codepage as reported by the transport.
        codepage: String,
    },
}

impl MarshalError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }

    pub(crate) fn truncated(path: &str, needed: usize, available: usize) -> Self {
        Self::MalformedFrame {
            reason: format!("'{path}' needs {needed} bytes but only {available} remain"),
        }
    }
}
