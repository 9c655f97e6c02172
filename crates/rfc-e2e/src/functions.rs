//! Function modules served by the echo system.
//!
//! Signatures mirror the standard connectivity test modules closely enough
//! for the client suites: text echo, structure and table echo, changing
//! parameters, a blocking wait and an exception raiser.

use std::sync::Arc;
use std::time::Duration;

use rfc_marshal::{
    FieldDescriptor, FieldType, FieldValue, FunctionSignature, IncomingCall, ParameterDescriptor,
    ParameterDirection, RemoteFault, Structure, StructureType,
};

/// Echoes `REQUTEXT` as `ECHOTEXT`.
pub const STFC_CONNECTION: &str = "STFC_CONNECTION";
/// Echoes `IMPORTSTRUCT` and returns `RFCTABLE` with one extra row.
pub const STFC_STRUCTURE: &str = "STFC_STRUCTURE";
/// Adds `START_VALUE` to `COUNTER` and increments the counter.
pub const STFC_CHANGING: &str = "STFC_CHANGING";
/// Blocks for `IV_SECONDS` before answering.
pub const WAIT: &str = "/COE/RBP_FE_WAIT";
/// Always raises a remote exception.
pub const RFC_RAISE_ERROR: &str = "RFC_RAISE_ERROR";
/// Echoes a packed amount, a date, a time and a raw buffer.
pub const ECHO_VALUES: &str = "ZRFC_ECHO_VALUES";

const TEXT_LENGTH: usize = 255;

/// Row type shared by `IMPORTSTRUCT`, `ECHOSTRUCT` and `RFCTABLE`.
#[must_use]
pub fn rfctest() -> Arc<StructureType> {
    Arc::new(StructureType::new(
        "RFCTEST",
        vec![
            FieldDescriptor::new("RFCFLOAT", FieldType::Float),
            FieldDescriptor::new("RFCCHAR1", FieldType::Char { length: 1 }),
            FieldDescriptor::new("RFCINT2", FieldType::Int2),
            FieldDescriptor::new("RFCINT1", FieldType::Int1),
            FieldDescriptor::new("RFCCHAR4", FieldType::Char { length: 4 }),
            FieldDescriptor::new("RFCINT4", FieldType::Int4),
            FieldDescriptor::new("RFCHEX3", FieldType::Bytes { length: 3 }),
            FieldDescriptor::new("RFCCHAR2", FieldType::Char { length: 2 }),
            FieldDescriptor::new("RFCTIME", FieldType::Time),
            FieldDescriptor::new("RFCDATE", FieldType::Date),
            FieldDescriptor::new("RFCDATA1", FieldType::Char { length: 50 }),
            FieldDescriptor::new("RFCDATA2", FieldType::Char { length: 50 }),
        ],
    ))
}

fn import(name: &str, field_type: FieldType) -> ParameterDescriptor {
    ParameterDescriptor::new(name, ParameterDirection::Import, field_type)
}

fn export(name: &str, field_type: FieldType) -> ParameterDescriptor {
    ParameterDescriptor::new(name, ParameterDirection::Export, field_type)
}

fn changing(name: &str, field_type: FieldType) -> ParameterDescriptor {
    ParameterDescriptor::new(name, ParameterDirection::Changing, field_type)
}

fn text() -> FieldType {
    FieldType::Char {
        length: TEXT_LENGTH,
    }
}

/// Published signature of `function`, if the system knows it.
#[must_use]
pub fn signature(function: &str) -> Option<FunctionSignature> {
    let parameters = match function {
        STFC_CONNECTION => vec![
            import("REQUTEXT", text()),
            export("ECHOTEXT", text()),
            export("RESPTEXT", text()),
        ],
        STFC_STRUCTURE => vec![
            changing("IMPORTSTRUCT", FieldType::Structure(rfctest())),
            export("ECHOSTRUCT", FieldType::Structure(rfctest())),
            export("RESPTEXT", text()),
            ParameterDescriptor::new(
                "RFCTABLE",
                ParameterDirection::Tables,
                FieldType::Table(rfctest()),
            ),
        ],
        STFC_CHANGING => vec![
            import("START_VALUE", FieldType::Int4),
            changing("COUNTER", FieldType::Int4),
            export("RESULT", FieldType::Int4),
        ],
        WAIT => vec![import("IV_SECONDS", FieldType::Int4)],
        RFC_RAISE_ERROR => vec![
            import("MESSAGETYPE", FieldType::Char { length: 1 }),
            export("MESSAGE", text()),
        ],
        ECHO_VALUES => vec![
            import(
                "IV_AMOUNT",
                FieldType::Bcd {
                    length: 8,
                    decimals: 2,
                },
            ),
            import("IV_DATE", FieldType::Date),
            import("IV_TIME", FieldType::Time),
            import("IV_RAW", FieldType::XString),
            export(
                "EV_AMOUNT",
                FieldType::Bcd {
                    length: 8,
                    decimals: 2,
                },
            ),
            export("EV_DATE", FieldType::Date),
            export("EV_TIME", FieldType::Time),
            export("EV_RAW", FieldType::XString),
        ],
        _ => return None,
    };
    Some(FunctionSignature::new(function, parameters))
}

/// What a handler produced.
#[derive(Debug)]
pub(crate) struct Handled {
    pub(crate) outputs: Structure,
    pub(crate) delay: Option<Duration>,
}

impl Handled {
    const fn immediate(outputs: Structure) -> Self {
        Self {
            outputs,
            delay: None,
        }
    }
}

/// Runs `function` on decoded inputs.
pub(crate) fn handle(
    function: &str,
    call: &IncomingCall,
    inputs: &Structure,
) -> Result<Handled, RemoteFault> {
    let mut outputs = match function {
        STFC_CONNECTION => stfc_connection(inputs),
        STFC_STRUCTURE => stfc_structure(inputs),
        STFC_CHANGING => stfc_changing(inputs),
        WAIT => return Ok(wait(inputs)),
        RFC_RAISE_ERROR => return Err(raise_error(inputs)),
        ECHO_VALUES => echo_values(inputs),
        _ => return Err(not_found(function)),
    };
    for name in call.not_requested() {
        outputs.remove(name);
    }
    Ok(Handled::immediate(outputs))
}

pub(crate) fn not_found(function: &str) -> RemoteFault {
    RemoteFault::new(
        5,
        "ABAP_ERROR",
        "FU_NOT_FOUND",
        format!("function module {function} is not available"),
    )
}

fn text_of<'a>(inputs: &'a Structure, name: &str) -> &'a str {
    inputs
        .get(name)
        .and_then(FieldValue::as_text)
        .unwrap_or_default()
}

fn integer_of(inputs: &Structure, name: &str) -> i64 {
    inputs
        .get(name)
        .and_then(FieldValue::as_integer)
        .unwrap_or_default()
}

fn stfc_connection(inputs: &Structure) -> Structure {
    let request = text_of(inputs, "REQUTEXT");
    Structure::new()
        .with("ECHOTEXT", request)
        .with("RESPTEXT", "SAP R/3 Rel. 753 Sysid: ECH Client: 100")
}

fn stfc_structure(inputs: &Structure) -> Structure {
    let import_struct = inputs
        .get("IMPORTSTRUCT")
        .and_then(FieldValue::as_structure)
        .cloned()
        .unwrap_or_else(|| rfctest().initial_value());
    let mut rows = inputs
        .get("RFCTABLE")
        .and_then(FieldValue::as_table)
        .map(<[Structure]>::to_vec)
        .unwrap_or_default();
    rows.push(incremented(&import_struct));

    Structure::new()
        .with("ECHOSTRUCT", import_struct.clone())
        .with("RESPTEXT", "SAP R/3 Rel. 753 Sysid: ECH Client: 100")
        .with("IMPORTSTRUCT", import_struct)
        .with("RFCTABLE", rows)
}

/// The import structure with its numeric fields raised by one.
fn incremented(row: &Structure) -> Structure {
    let mut next = row.clone();
    for name in ["RFCINT1", "RFCINT2", "RFCINT4"] {
        if let Some(FieldValue::Integer(value)) = next.get_mut(name) {
            *value = value.saturating_add(1);
        }
    }
    if let Some(FieldValue::Float(value)) = next.get_mut("RFCFLOAT") {
        *value = plus_one(*value);
    }
    next
}

#[expect(
    clippy::float_arithmetic,
    reason = "the test module increments its float field"
)]
fn plus_one(value: f64) -> f64 {
    value + 1.0
}

fn stfc_changing(inputs: &Structure) -> Structure {
    let start = integer_of(inputs, "START_VALUE");
    let counter = integer_of(inputs, "COUNTER");
    Structure::new()
        .with("COUNTER", counter.saturating_add(1))
        .with("RESULT", start.saturating_add(counter))
}

fn wait(inputs: &Structure) -> Handled {
    let seconds = u64::try_from(integer_of(inputs, "IV_SECONDS")).unwrap_or_default();
    Handled {
        outputs: Structure::new(),
        delay: Some(Duration::from_secs(seconds)),
    }
}

fn raise_error(inputs: &Structure) -> RemoteFault {
    let message_type = text_of(inputs, "MESSAGETYPE");
    RemoteFault::new(
        1,
        "ABAP_EXCEPTION",
        "RAISE_EXCEPTION",
        format!("exception raised with message type '{message_type}'"),
    )
}

fn echo_values(inputs: &Structure) -> Structure {
    let mut outputs = Structure::new();
    for (input, output) in [
        ("IV_AMOUNT", "EV_AMOUNT"),
        ("IV_DATE", "EV_DATE"),
        ("IV_TIME", "EV_TIME"),
        ("IV_RAW", "EV_RAW"),
    ] {
        if let Some(value) = inputs.get(input) {
            outputs.insert(output, value.clone());
        }
    }
    outputs
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(STFC_CONNECTION)]
    #[case(STFC_STRUCTURE)]
    #[case(STFC_CHANGING)]
    #[case(WAIT)]
    #[case(RFC_RAISE_ERROR)]
    #[case(ECHO_VALUES)]
    fn published_modules_have_signatures(#[case] function: &str) {
        let signature = signature(function).expect("known module");
        assert_eq!(signature.name(), function);
    }

    #[test]
    fn unknown_modules_have_no_signature() {
        assert!(signature("Z_MISSING").is_none());
    }

    #[test]
    fn increment_touches_numeric_fields_only() {
        let row = rfctest()
            .initial_value()
            .with("RFCINT4", 41)
            .with("RFCFLOAT", 0.5)
            .with("RFCCHAR4", "KEEP");

        let next = incremented(&row);

        assert_eq!(next.get("RFCINT4"), Some(&FieldValue::Integer(42)));
        assert_eq!(next.get("RFCINT1"), Some(&FieldValue::Integer(1)));
        assert_eq!(next.get("RFCFLOAT"), Some(&FieldValue::Float(1.5)));
        assert_eq!(next.get("RFCCHAR4"), row.get("RFCCHAR4"));
    }

    #[test]
    fn wait_reports_its_delay() {
        let handled = wait(&Structure::new().with("IV_SECONDS", 3));
        assert_eq!(handled.delay, Some(Duration::from_secs(3)));
        assert!(handled.outputs.is_empty());
    }

    #[test]
    fn changing_adds_start_to_counter() {
        let outputs = stfc_changing(&Structure::new().with("START_VALUE", 5).with("COUNTER", 7));
        assert_eq!(outputs.get("COUNTER"), Some(&FieldValue::Integer(8)));
        assert_eq!(outputs.get("RESULT"), Some(&FieldValue::Integer(12)));
    }
}
