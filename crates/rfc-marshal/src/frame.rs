//! Request and response frames exchanged with the remote side.
//!
//! ```text
//! request  = 0x01 name not_requested params
//! response = 0x02 params | 0x03 fault
//! params   = u32 count { name u32 len payload }
//! fault    = u32 code name(group) name(key) name(message)
//! name     = u32 len utf8
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::MarshalError;
use crate::wire::{put_len, put_name, read_len, read_name, read_u8, read_u32, take};

const REQUEST_TAG: u8 = 0x01;
const RESPONSE_TAG: u8 = 0x02;
const FAULT_TAG: u8 = 0x03;

/// Error raised by the remote function itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFault {
    /// Remote return code.
    pub code: u32,
    /// Error group, e.g. `ABAP_EXCEPTION`.
    pub group: String,
    /// Exception key defined by the remote function.
    pub key: String,
    /// Human-readable message.
    pub message: String,
}

impl RemoteFault {
    /// Builds a fault.
    #[must_use]
    pub fn new(
        code: u32,
        group: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            group: group.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Parameter name paired with its encoded payload.
pub(crate) type EncodedParameter = (String, Bytes);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestFrame {
    pub(crate) function: String,
    pub(crate) not_requested: Vec<String>,
    pub(crate) parameters: Vec<EncodedParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResponseFrame {
    Parameters(Vec<EncodedParameter>),
    Fault(RemoteFault),
}

impl RequestFrame {
    pub(crate) fn encode(&self) -> Result<Bytes, MarshalError> {
        let mut out = BytesMut::new();
        out.put_u8(REQUEST_TAG);
        put_name(&mut out, &self.function, "function")?;
        put_len(&mut out, self.not_requested.len(), "not requested")?;
        for name in &self.not_requested {
            put_name(&mut out, name, "not requested")?;
        }
        put_parameters(&mut out, &self.parameters)?;
        Ok(out.freeze())
    }

    pub(crate) fn decode(frame: &[u8]) -> Result<Self, MarshalError> {
        let mut input = frame;
        let tag = read_u8(&mut input, "tag")?;
        if tag != REQUEST_TAG {
            return Err(MarshalError::malformed(format!(
                "expected request tag 0x{REQUEST_TAG:02X}, got 0x{tag:02X}"
            )));
        }
        let function = read_name(&mut input, "function")?;
        let count = read_len(&mut input, "not requested")?;
        let mut not_requested = Vec::new();
        for _ in 0..count {
            not_requested.push(read_name(&mut input, "not requested")?);
        }
        let parameters = read_parameters(&mut input)?;
        finish(input)?;
        Ok(Self {
            function,
            not_requested,
            parameters,
        })
    }
}

impl ResponseFrame {
    pub(crate) fn encode(&self) -> Result<Bytes, MarshalError> {
        let mut out = BytesMut::new();
        match self {
            Self::Parameters(parameters) => {
                out.put_u8(RESPONSE_TAG);
                put_parameters(&mut out, parameters)?;
            }
            Self::Fault(fault) => {
                out.put_u8(FAULT_TAG);
                out.put_u32_le(fault.code);
                put_name(&mut out, &fault.group, "fault group")?;
                put_name(&mut out, &fault.key, "fault key")?;
                put_name(&mut out, &fault.message, "fault message")?;
            }
        }
        Ok(out.freeze())
    }

    pub(crate) fn decode(frame: &[u8]) -> Result<Self, MarshalError> {
        let mut input = frame;
        let decoded = match read_u8(&mut input, "tag")? {
            RESPONSE_TAG => Self::Parameters(read_parameters(&mut input)?),
            FAULT_TAG => Self::Fault(RemoteFault {
                code: read_u32(&mut input, "fault code")?,
                group: read_name(&mut input, "fault group")?,
                key: read_name(&mut input, "fault key")?,
                message: read_name(&mut input, "fault message")?,
            }),
            other => {
                return Err(MarshalError::malformed(format!(
                    "unknown response tag 0x{other:02X}"
                )));
            }
        };
        finish(input)?;
        Ok(decoded)
    }
}

fn put_parameters(out: &mut BytesMut, parameters: &[EncodedParameter]) -> Result<(), MarshalError> {
    put_len(out, parameters.len(), "parameters")?;
    for (name, payload) in parameters {
        put_name(out, name, "parameter")?;
        put_len(out, payload.len(), name)?;
        out.put_slice(payload);
    }
    Ok(())
}

fn read_parameters(input: &mut &[u8]) -> Result<Vec<EncodedParameter>, MarshalError> {
    let count = read_len(input, "parameters")?;
    let mut parameters = Vec::new();
    for _ in 0..count {
        let name = read_name(input, "parameter")?;
        let len = read_len(input, &name)?;
        let payload = Bytes::copy_from_slice(take(input, len, &name)?);
        parameters.push((name, payload));
    }
    Ok(parameters)
}

fn finish(input: &[u8]) -> Result<(), MarshalError> {
    if input.is_empty() {
        Ok(())
    } else {
        Err(MarshalError::malformed(format!(
            "{} trailing bytes after frame",
            input.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RequestFrame {
        RequestFrame {
            function: "STFC_CONNECTION".to_owned(),
            not_requested: vec!["RESPTEXT".to_owned()],
            parameters: vec![("REQUTEXT".to_owned(), Bytes::from_static(b"h\0i\0"))],
        }
    }

    #[test]
    fn request_layout_starts_with_tag_and_name() {
        let encoded = request().encode().expect("encodable");
        assert_eq!(encoded.first(), Some(&REQUEST_TAG));
        assert_eq!(encoded.get(1..5), Some(&[15_u8, 0, 0, 0][..]));
        assert_eq!(RequestFrame::decode(&encoded), Ok(request()));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut encoded = request().encode().expect("encodable").to_vec();
        encoded.push(0);
        assert!(matches!(
            RequestFrame::decode(&encoded),
            Err(MarshalError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn truncated_response_is_rejected() {
        let encoded = ResponseFrame::Parameters(request().parameters)
            .encode()
            .expect("encodable");
        let cut = encoded.get(..encoded.len() - 1).expect("non-empty frame");
        assert!(matches!(
            ResponseFrame::decode(cut),
            Err(MarshalError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(matches!(
            ResponseFrame::decode(&[0x7F]),
            Err(MarshalError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn faults_carry_all_parts() {
        let fault = RemoteFault::new(4, "ABAP_EXCEPTION", "RAISE_EXCEPTION", "boom");
        let encoded = ResponseFrame::Fault(fault.clone()).encode().expect("encodable");
        assert_eq!(ResponseFrame::decode(&encoded), Ok(ResponseFrame::Fault(fault)));
    }
}
