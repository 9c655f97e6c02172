//! Deserialization and validation of the configuration types.

use std::time::Duration;

use rfc_config::{
    BcdRepresentation, ClientOptions, ConfigError, ConnectionParameters, DateRepresentation,
    LogFormat, LogSettings, PoolSettings, ReopenPolicy, TimeRepresentation,
};
use rstest::{fixture, rstest};

fn base_parameters() -> ConnectionParameters {
    ConnectionParameters::new("10.68.104.164", "00", "620")
        .with_credentials("demo", "welcome")
        .with_language("EN")
}

#[fixture]
fn parameters() -> ConnectionParameters {
    base_parameters()
}

#[test]
fn empty_document_yields_defaults() {
    let options: ClientOptions = serde_json::from_str("{}").expect("parse options");
    assert_eq!(options, ClientOptions::default());

    let pool: PoolSettings = serde_json::from_str("{}").expect("parse pool settings");
    assert_eq!(pool, PoolSettings::default());

    let logging: LogSettings = serde_json::from_str("{}").expect("parse log settings");
    assert_eq!(logging.filter(), "info");
    assert_eq!(logging.format(), LogFormat::Json);
}

#[test]
fn options_deserialize_from_snake_case_names() {
    let options: ClientOptions = serde_json::from_str(
        r#"{ "rstrip": false, "bcd": "float", "date": "native", "time": "native" }"#,
    )
    .expect("parse options");

    assert!(!options.rstrip);
    assert_eq!(options.bcd, BcdRepresentation::Float);
    assert_eq!(options.date, DateRepresentation::Native);
    assert_eq!(options.time, TimeRepresentation::Native);
}

#[test]
fn unknown_policy_name_fails_to_parse() {
    let result = serde_json::from_str::<ClientOptions>(r#"{ "bcd": "binary" }"#);
    assert!(result.is_err());
}

#[rstest]
fn well_formed_parameters_validate(parameters: ConnectionParameters) {
    assert_eq!(parameters.validate(), Ok(()));
}

#[rstest]
#[case::missing_host(ConnectionParameters { ashost: String::new(), ..base_parameters() }, "ashost")]
#[case::missing_user(ConnectionParameters { user: " ".to_owned(), ..base_parameters() }, "user")]
#[case::short_sysnr(ConnectionParameters { sysnr: "0".to_owned(), ..base_parameters() }, "sysnr")]
#[case::alpha_client(ConnectionParameters { client: "62a".to_owned(), ..base_parameters() }, "client")]
#[case::long_language(ConnectionParameters { lang: "ENG".to_owned(), ..base_parameters() }, "lang")]
#[case::trace_level(ConnectionParameters { trace: 4, ..base_parameters() }, "trace")]
#[case::codepage(base_parameters().with_codepage("41"), "codepage")]
fn malformed_parameters_name_the_field(
    #[case] candidate: ConnectionParameters,
    #[case] expected_field: &str,
) {
    let error = candidate.validate().expect_err("validation should fail");
    let field = match error {
        ConfigError::MissingField { field } | ConfigError::InvalidField { field, .. } => field,
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(field, expected_field);
}

#[rstest]
fn debug_output_redacts_password(parameters: ConnectionParameters) {
    let rendered = format!("{parameters:?}");
    assert!(!rendered.contains("welcome"));
    assert!(rendered.contains("<redacted>"));
}

#[rstest]
fn password_is_not_serialized(parameters: ConnectionParameters) {
    let json = serde_json::to_string(&parameters).expect("serialize parameters");
    assert!(!json.contains("welcome"));
    assert!(json.contains("\"ashost\":\"10.68.104.164\""));
}

#[test]
fn pool_settings_reject_zero_capacity() {
    assert_eq!(
        PoolSettings::with_capacity(0).validate(),
        Err(ConfigError::EmptyPool)
    );
}

#[test]
fn pool_settings_reject_zero_timeout() {
    let settings = PoolSettings::with_capacity(2).with_acquire_timeout(Duration::ZERO);
    assert_eq!(settings.validate(), Err(ConfigError::ZeroAcquireTimeout));
}

#[test]
fn pool_settings_parse_nested_reopen_policy() {
    let settings: PoolSettings = serde_json::from_str(
        r#"{ "capacity": 3, "acquire_timeout_ms": 500, "reopen": { "max_attempts": 1 } }"#,
    )
    .expect("parse pool settings");

    assert_eq!(settings.capacity, 3);
    assert_eq!(settings.acquire_timeout(), Duration::from_millis(500));
    assert_eq!(settings.reopen.max_attempts, 1);
    assert_eq!(settings.reopen.backoff(), ReopenPolicy::default().backoff());
}

#[test]
fn never_policy_disables_reopening() {
    let policy = ReopenPolicy::never();
    assert_eq!(policy.max_attempts, 0);
    assert_eq!(policy.backoff(), Duration::ZERO);
}
