//! Unit tests for whole-call marshalling.

use std::sync::Arc;

use rfc_config::ClientOptions;
use rstest::{fixture, rstest};

use super::{CallOutcome, Marshaller};
use crate::codepage::Codepage;
use crate::error::MarshalError;
use crate::frame::RemoteFault;
use crate::schema::{
    FieldDescriptor, FieldType, FunctionSignature, ParameterDescriptor, ParameterDirection,
    StructureType,
};
use crate::value::{CallRequest, FieldValue, Structure};

#[fixture]
fn marshaller() -> Marshaller {
    Marshaller::new(ClientOptions::default(), Codepage::Utf16Le)
}

#[fixture]
fn signature() -> FunctionSignature {
    let row = Arc::new(StructureType::new(
        "ZROW",
        vec![FieldDescriptor::new("VALUE", FieldType::Int4)],
    ));
    FunctionSignature::new(
        "Z_ECHO",
        vec![
            ParameterDescriptor::new("INPUT", ParameterDirection::Import, FieldType::Char { length: 10 }),
            ParameterDescriptor::new("OUTPUT", ParameterDirection::Export, FieldType::Char { length: 10 }),
            ParameterDescriptor::new("EXTRA", ParameterDirection::Export, FieldType::Int4),
            ParameterDescriptor::new("COUNTER", ParameterDirection::Changing, FieldType::Int4),
            ParameterDescriptor::new("ROWS", ParameterDirection::Tables, FieldType::Table(row)),
        ],
    )
}

fn remote_echo(marshaller: &Marshaller, signature: &FunctionSignature, frame: &[u8]) -> bytes::Bytes {
    let call = Marshaller::read_request(frame).expect("readable request");
    let inputs = marshaller
        .decode_parameters(signature, &call)
        .expect("typed inputs");
    let mut outputs = Structure::new();
    if let Some(input) = inputs.get("INPUT") {
        outputs.insert("OUTPUT", input.clone());
    }
    outputs.insert("EXTRA", 7);
    if let Some(counter) = inputs.get("COUNTER").and_then(FieldValue::as_integer) {
        outputs.insert("COUNTER", counter + 1);
    }
    let mut rows = inputs
        .get("ROWS")
        .and_then(FieldValue::as_table)
        .map(<[Structure]>::to_vec)
        .unwrap_or_default();
    rows.push(Structure::new().with("VALUE", -1));
    outputs.insert("ROWS", rows);
    marshaller
        .encode_response(signature, &outputs)
        .expect("encodable response")
}

#[rstest]
fn request_and_response_round_trip(marshaller: Marshaller, signature: FunctionSignature) {
    let request = CallRequest::new("Z_ECHO")
        .with("INPUT", "hello")
        .with("COUNTER", 41)
        .with("ROWS", vec![Structure::new().with("VALUE", 1)]);
    let frame = marshaller
        .encode_request(&signature, &request, &[])
        .expect("encodable request");
    let response = remote_echo(&marshaller, &signature, &frame);

    let CallOutcome::Completed(result) = marshaller
        .decode_response(&signature, &response, &[])
        .expect("decodable response")
    else {
        panic!("expected completed call");
    };
    assert_eq!(
        result.names().collect::<Vec<_>>(),
        vec!["OUTPUT", "EXTRA", "COUNTER", "ROWS"]
    );
    assert_eq!(result.get("OUTPUT"), Some(&FieldValue::from("hello")));
    assert_eq!(result.get("COUNTER"), Some(&FieldValue::Integer(42)));
    assert_eq!(result.get("ROWS").and_then(FieldValue::as_table).map(<[Structure]>::len), Some(2));
}

#[rstest]
fn not_requested_outputs_are_sent_and_dropped(marshaller: Marshaller, signature: FunctionSignature) {
    let skipped = vec!["EXTRA".to_owned()];
    let frame = marshaller
        .encode_request(&signature, &CallRequest::new("Z_ECHO"), &skipped)
        .expect("encodable request");
    let call = Marshaller::read_request(&frame).expect("readable request");
    assert!(!call.is_requested("EXTRA"));
    assert!(call.is_requested("OUTPUT"));

    let response = remote_echo(&marshaller, &signature, &frame);
    let outcome = marshaller
        .decode_response(&signature, &response, &skipped)
        .expect("decodable response");
    let CallOutcome::Completed(result) = outcome else {
        panic!("expected completed call");
    };
    assert!(result.get("EXTRA").is_none());
}

#[rstest]
#[case::empty_name(CallRequest::new(" "), MarshalError::EmptyFunctionName)]
#[case::unknown(
    CallRequest::new("Z_ECHO").with("NOPE", 1),
    MarshalError::UnknownParameter { function: "Z_ECHO".to_owned(), parameter: "NOPE".to_owned() }
)]
#[case::export(
    CallRequest::new("Z_ECHO").with("OUTPUT", "x"),
    MarshalError::ExportSupplied { function: "Z_ECHO".to_owned(), parameter: "OUTPUT".to_owned() }
)]
fn malformed_requests_fail_before_encoding(
    marshaller: Marshaller,
    signature: FunctionSignature,
    #[case] request: CallRequest,
    #[case] expected: MarshalError,
) {
    assert_eq!(marshaller.encode_request(&signature, &request, &[]), Err(expected));
}

#[rstest]
fn unknown_not_requested_name_is_rejected(signature: FunctionSignature) {
    let result = Marshaller::check_request(
        &signature,
        &CallRequest::new("Z_ECHO"),
        &["MISSING".to_owned()],
    );
    assert!(matches!(result, Err(MarshalError::UnknownParameter { .. })));
}

#[rstest]
fn remote_faults_are_decoded(marshaller: Marshaller, signature: FunctionSignature) {
    let fault = RemoteFault::new(5, "ABAP_EXCEPTION", "RAISE_EXCEPTION", "raised on purpose");
    let frame = Marshaller::encode_fault(&fault).expect("encodable fault");
    assert_eq!(
        marshaller.decode_response(&signature, &frame, &[]),
        Ok(CallOutcome::Failed(fault))
    );
}

#[rstest]
fn import_outputs_are_rejected(marshaller: Marshaller, signature: FunctionSignature) {
    let outputs = Structure::new().with("INPUT", "x");
    let err = marshaller
        .encode_response(&signature, &outputs)
        .expect_err("import parameters are not outputs");
    assert!(matches!(err, MarshalError::UnknownParameter { .. }), "{err}");
}
