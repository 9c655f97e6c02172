//! Shared stubs for the crate's unit tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rfc_config::{ClientOptions, ConnectionParameters};
use rfc_marshal::{
    Codepage, FieldType, FieldValue, FunctionSignature, Marshaller, ParameterDescriptor,
    ParameterDirection, RemoteFault, Structure,
};

use crate::error::RemoteError;
use crate::info::ConnectionInfo;
use crate::metadata::SignatureLookup;
use crate::transport::{LibraryVersion, Session, SessionHandle, Transport, TransportError};


/// Echoes `REQUTEXT` back as `ECHOTEXT`.
pub(crate) const ECHO: &str = "STUB_ECHO";
/// Like [`ECHO`] but holds the wire for one second first.
pub(crate) const SLOW: &str = "STUB_SLOW";
/// Request text that makes the stub raise a remote fault.
pub(crate) const RAISE: &str = "RAISE";

pub(crate) fn parameters() -> ConnectionParameters {
    ConnectionParameters::new("stub.example", "00", "100").with_credentials("tester", "secret")
}

pub(crate) fn echo_signature(function: &str) -> FunctionSignature {
    FunctionSignature::new(
        function,
        vec![
            ParameterDescriptor::new(
                "REQUTEXT",
                ParameterDirection::Import,
                FieldType::Char { length: 10 },
            ),
            ParameterDescriptor::new(
                "ECHOTEXT",
                ParameterDirection::Export,
                FieldType::Char { length: 10 },
            ),
            ParameterDescriptor::new(
                "RESPTEXT",
                ParameterDirection::Export,
                FieldType::Char { length: 20 },
            ),
        ],
    )
}

/// In-memory transport serving [`ECHO`] and [`SLOW`].
pub(crate) struct StubTransport {
    next_session: AtomicU64,
    refuse: AtomicBool,
    probe_ok: AtomicBool,
    codepage: Mutex<String>,
    fail_next: Mutex<Option<TransportError>>,
    opened: AtomicUsize,
    closed: Mutex<Vec<SessionHandle>>,
    exchanges: AtomicUsize,
    probes: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("stub state lock")
}

impl StubTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            next_session: AtomicU64::new(1),
            refuse: AtomicBool::new(false),
            probe_ok: AtomicBool::new(true),
            codepage: Mutex::new("4103".to_owned()),
            fail_next: Mutex::new(None),
            opened: AtomicUsize::new(0),
            closed: Mutex::new(Vec::new()),
            exchanges: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn refuse_sessions(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub(crate) fn answer_probes(&self, alive: bool) {
        self.probe_ok.store(alive, Ordering::SeqCst);
    }

    pub(crate) fn negotiate_codepage(&self, codepage: &str) {
        *lock(&self.codepage) = codepage.to_owned();
    }

    pub(crate) fn fail_next_exchange(&self, error: TransportError) {
        *lock(&self.fail_next) = Some(error);
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> Vec<SessionHandle> {
        lock(&self.closed).clone()
    }

    pub(crate) fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub(crate) fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Request texts in the order they reached the wire.
    pub(crate) fn seen(&self) -> Vec<String> {
        lock(&self.seen).clone()
    }

    fn respond(&self, request: &[u8]) -> Bytes {
        let remote = Marshaller::new(ClientOptions::default(), Codepage::Utf16Le);
        let call = Marshaller::read_request(request).expect("stub reads request");
        let signature = echo_signature(call.function());
        let inputs = remote
            .decode_parameters(&signature, &call)
            .expect("stub decodes parameters");
        let text = inputs
            .get("REQUTEXT")
            .and_then(FieldValue::as_text)
            .unwrap_or_default()
            .to_owned();
        lock(&self.seen).push(text.clone());
        if text == RAISE {
            let fault = RemoteFault::new(5, "ABAP_EXCEPTION", "STUB_RAISED", "raised on request");
            return Marshaller::encode_fault(&fault).expect("stub encodes fault");
        }
        let mut outputs = Structure::new().with("ECHOTEXT", text);
        if call.is_requested("RESPTEXT") {
            outputs.insert("RESPTEXT", "stub response");
        }
        remote
            .encode_response(&signature, &outputs)
            .expect("stub encodes response")
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn open_session(
        &self,
        parameters: &ConnectionParameters,
    ) -> Result<Session, TransportError> {
        tokio::task::yield_now().await;
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::Refused {
                host: parameters.ashost.clone(),
                message: "partner not reached".to_owned(),
            });
        }
        let raw = self.next_session.fetch_add(1, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Session {
            handle: SessionHandle::new(raw),
            info: ConnectionInfo {
                user: parameters.user.to_uppercase(),
                client: parameters.client.clone(),
                sys_number: parameters.sysnr.clone(),
                codepage: lock(&self.codepage).clone(),
                cpic_conv_id: format!("{:08}", 41_346_400 + raw),
                rfc_role: "C".to_owned(),
                ..ConnectionInfo::default()
            },
        })
    }

    async fn close_session(&self, handle: SessionHandle) {
        tokio::task::yield_now().await;
        lock(&self.closed).push(handle);
    }

    async fn send_receive(
        &self,
        _handle: SessionHandle,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let failure = lock(&self.fail_next).take();
        if let Some(error) = failure {
            return Err(error);
        }
        let function = Marshaller::read_request(&request)
            .expect("stub reads request")
            .function()
            .to_owned();
        if function == SLOW {
            tokio::time::sleep(Duration::from_secs(1)).await;
        } else {
            tokio::task::yield_now().await;
        }
        Ok(self.respond(&request))
    }

    async fn probe(&self, _handle: SessionHandle) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.probe_ok.load(Ordering::SeqCst)
    }

    fn library_version(&self) -> LibraryVersion {
        LibraryVersion {
            major: 7500,
            minor: 0,
            patch_level: 12,
        }
    }
}

/// Signature source knowing only the stub functions.
pub(crate) struct StubLookup;

#[async_trait]
impl SignatureLookup for StubLookup {
    async fn lookup_signature(&self, function: &str) -> Result<FunctionSignature, RemoteError> {
        if function == ECHO || function == SLOW {
            Ok(echo_signature(function))
        } else {
            Err(RemoteError {
                function: function.to_owned(),
                code: 5,
                group: "ABAP_ERROR".to_owned(),
                key: "FU_NOT_FOUND".to_owned(),
                message: format!("function {function} not found"),
            })
        }
    }
}

pub(crate) fn echo_request(text: &str) -> Structure {
    Structure::new().with("REQUTEXT", text)
}
