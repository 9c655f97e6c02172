//! Type marshalling for remote function calls.
//!
//! Converts caller-facing [`FieldValue`]s to the wire layout declared by a
//! remote [`FunctionSignature`] and back. The crate does no I/O: callers hand
//! it signatures fetched elsewhere and the bytes moved by a transport.
//!
//! Values are never coerced. A text value for an integer field, a float for
//! a packed decimal (unless the client opted into floats), or text longer than
//! its fixed-length field all fail with [`MarshalError`] before anything
//! reaches the network.

mod codepage;
mod error;
mod field;
mod frame;
mod marshaller;
mod packed;
mod schema;
mod value;
mod wire;

pub use codepage::Codepage;
pub use error::MarshalError;
pub use frame::RemoteFault;
pub use marshaller::{CallOutcome, IncomingCall, Marshaller};
pub use schema::{
    FieldDescriptor, FieldType, FunctionSignature, ParameterDescriptor, ParameterDirection,
    StructureType,
};
pub use value::{CallRequest, CallResult, FieldValue, Structure};

pub use rust_decimal::Decimal;
