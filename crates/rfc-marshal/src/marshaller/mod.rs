//! Whole-call encoding against a published function signature.

use bytes::{Bytes, BytesMut};
use rfc_config::ClientOptions;

use crate::codepage::Codepage;
use crate::error::MarshalError;
use crate::field::FieldCodec;
use crate::frame::{EncodedParameter, RemoteFault, RequestFrame, ResponseFrame};
use crate::schema::{FunctionSignature, ParameterDescriptor};
use crate::value::{CallRequest, CallResult, FieldValue, Structure};

/// How a decoded response ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The function returned its output parameters.
    Completed(CallResult),
    /// The function raised an error.
    Failed(RemoteFault),
}

/// A request as seen by the remote side, before its parameters are typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCall {
    frame: RequestFrame,
}

impl IncomingCall {
    /// Function the caller invoked.
    #[must_use]
    pub fn function(&self) -> &str {
        self.frame.function.as_str()
    }

    /// Output parameters the caller asked not to receive.
    #[must_use]
    pub fn not_requested(&self) -> &[String] {
        self.frame.not_requested.as_slice()
    }

    /// Whether the caller wants `parameter` returned.
    #[must_use]
    pub fn is_requested(&self, parameter: &str) -> bool {
        !self.frame.not_requested.iter().any(|name| name == parameter)
    }
}

/// Converts calls to and from wire frames for one session.
///
/// The codepage is the one negotiated when the session opened; the options
/// are the owning client's and never change.
#[derive(Debug, Clone, Copy)]
pub struct Marshaller {
    codec: FieldCodec,
}

impl Marshaller {
    /// Binds a marshaller to a codepage and value policies.
    #[must_use]
    pub const fn new(options: ClientOptions, codepage: Codepage) -> Self {
        Self {
            codec: FieldCodec::new(codepage, options),
        }
    }

    /// Negotiated codepage.
    #[must_use]
    pub const fn codepage(&self) -> Codepage {
        self.codec.codepage()
    }

    /// Value policies.
    #[must_use]
    pub const fn options(&self) -> ClientOptions {
        self.codec.options()
    }

    /// Checks the call's shape against `signature` without encoding values.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError`] for an empty function name, an unknown or
    /// export parameter, or a not-requested name missing from the signature.
    pub fn check_request(
        signature: &FunctionSignature,
        request: &CallRequest,
        not_requested: &[String],
    ) -> Result<(), MarshalError> {
        if request.function().trim().is_empty() {
            return Err(MarshalError::EmptyFunctionName);
        }
        for name in request.parameters().names() {
            let descriptor = lookup(signature, name)?;
            if !descriptor.direction().accepts_input() {
                return Err(MarshalError::ExportSupplied {
                    function: signature.name().to_owned(),
                    parameter: name.to_owned(),
                });
            }
        }
        for name in not_requested {
            lookup(signature, name)?;
        }
        Ok(())
    }

    /// Encodes a call request frame.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError`] when the request does not fit the signature.
    pub fn encode_request(
        &self,
        signature: &FunctionSignature,
        request: &CallRequest,
        not_requested: &[String],
    ) -> Result<Bytes, MarshalError> {
        Self::check_request(signature, request, not_requested)?;
        let parameters = request
            .parameters()
            .iter()
            .map(|(name, value)| self.encode_parameter(lookup(signature, name)?, value))
            .collect::<Result<Vec<_>, _>>()?;
        RequestFrame {
            function: request.function().to_owned(),
            not_requested: not_requested.to_vec(),
            parameters,
        }
        .encode()
    }

    /// Decodes a response frame into output parameters or a remote fault.
    ///
    /// Parameters named in `not_requested` are dropped even if the remote side
    /// returned them.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError`] for malformed frames and for parameters the
    /// signature does not return.
    pub fn decode_response(
        &self,
        signature: &FunctionSignature,
        frame: &[u8],
        not_requested: &[String],
    ) -> Result<CallOutcome, MarshalError> {
        let parameters = match ResponseFrame::decode(frame)? {
            ResponseFrame::Fault(fault) => return Ok(CallOutcome::Failed(fault)),
            ResponseFrame::Parameters(parameters) => parameters,
        };
        let mut outputs = Structure::new();
        for (name, payload) in parameters {
            let descriptor = lookup(signature, &name)?;
            if !descriptor.direction().returns_output() {
                return Err(MarshalError::malformed(format!(
                    "import parameter '{name}' returned by '{}'",
                    signature.name()
                )));
            }
            if not_requested.contains(&name) {
                continue;
            }
            let value = self.decode_payload(descriptor, &payload)?;
            outputs.insert(name, value);
        }
        Ok(CallOutcome::Completed(CallResult::new(outputs)))
    }

    /// Reads a request frame on the remote side.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError`] when the frame is malformed.
    pub fn read_request(frame: &[u8]) -> Result<IncomingCall, MarshalError> {
        RequestFrame::decode(frame).map(|decoded| IncomingCall { frame: decoded })
    }

    /// Types the parameters of an incoming call.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError`] when a parameter is unknown, is an export, or
    /// does not decode under its declared type.
    pub fn decode_parameters(
        &self,
        signature: &FunctionSignature,
        call: &IncomingCall,
    ) -> Result<Structure, MarshalError> {
        let mut inputs = Structure::new();
        for (name, payload) in &call.frame.parameters {
            let descriptor = lookup(signature, name)?;
            if !descriptor.direction().accepts_input() {
                return Err(MarshalError::ExportSupplied {
                    function: signature.name().to_owned(),
                    parameter: name.clone(),
                });
            }
            inputs.insert(name.as_str(), self.decode_payload(descriptor, payload)?);
        }
        Ok(inputs)
    }

    /// Encodes output parameters on the remote side.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError`] when an output is unknown, is import-only, or
    /// does not fit its declared type.
    pub fn encode_response(
        &self,
        signature: &FunctionSignature,
        outputs: &Structure,
    ) -> Result<Bytes, MarshalError> {
        let mut parameters = Vec::with_capacity(outputs.len());
        for (name, value) in outputs.iter() {
            let descriptor = lookup(signature, name)?;
            if !descriptor.direction().returns_output() {
                return Err(MarshalError::UnknownParameter {
                    function: signature.name().to_owned(),
                    parameter: name.to_owned(),
                });
            }
            parameters.push(self.encode_parameter(descriptor, value)?);
        }
        ResponseFrame::Parameters(parameters).encode()
    }

    /// Encodes a remote fault frame.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError`] when a text part exceeds the length prefix.
    pub fn encode_fault(fault: &RemoteFault) -> Result<Bytes, MarshalError> {
        ResponseFrame::Fault(fault.clone()).encode()
    }

    fn encode_parameter(
        &self,
        descriptor: &ParameterDescriptor,
        value: &FieldValue,
    ) -> Result<EncodedParameter, MarshalError> {
        let mut payload = BytesMut::new();
        self.codec
            .encode(descriptor.field_type(), value, descriptor.name(), &mut payload)?;
        Ok((descriptor.name().to_owned(), payload.freeze()))
    }

    fn decode_payload(
        &self,
        descriptor: &ParameterDescriptor,
        payload: &[u8],
    ) -> Result<FieldValue, MarshalError> {
        let mut input = payload;
        let value = self
            .codec
            .decode(descriptor.field_type(), &mut input, descriptor.name())?;
        if input.is_empty() {
            Ok(value)
        } else {
            Err(MarshalError::malformed(format!(
                "{} trailing bytes in parameter '{}'",
                input.len(),
                descriptor.name()
            )))
        }
    }
}

fn lookup<'a>(
    signature: &'a FunctionSignature,
    name: &str,
) -> Result<&'a ParameterDescriptor, MarshalError> {
    signature
        .parameter(name)
        .ok_or_else(|| MarshalError::UnknownParameter {
            function: signature.name().to_owned(),
            parameter: name.to_owned(),
        })
}

#[cfg(test)]
mod tests;
