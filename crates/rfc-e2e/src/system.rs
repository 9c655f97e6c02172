//! In-memory remote system implementing the client's transport boundary.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use rfc_client::{
    ConnectionInfo, LibraryVersion, RemoteError, Session, SessionHandle, SignatureLookup,
    Transport, TransportError,
};
use rfc_config::{ClientOptions, ConnectionParameters};
use rfc_marshal::{Codepage, FunctionSignature, MarshalError, Marshaller, RemoteFault};

use crate::functions::{self, Handled};

const SYSTEM_TARGET: &str = "rfc_e2e::system";

/// First conversation id handed out; later sessions count up from here.
const FIRST_CONVERSATION: u64 = 41_346_416;

/// A fake remote system serving the modules in [`functions`].
///
/// Sessions, probes and exchanges are counted so suites can assert on what
/// reached the "wire". Failures can be injected per exchange or per logon.
#[derive(Debug)]
pub struct EchoSystem {
    codepage: Codepage,
    next_session: AtomicU64,
    open: Mutex<HashSet<u64>>,
    refuse_logon: AtomicBool,
    unresponsive: AtomicBool,
    fail_next: Mutex<Option<TransportError>>,
    logons: AtomicUsize,
    exchanges: AtomicUsize,
}

impl EchoSystem {
    /// A system negotiating UTF-16 sessions.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_codepage(Codepage::Utf16Le)
    }

    /// A system negotiating `codepage` for every session.
    #[must_use]
    pub fn with_codepage(codepage: Codepage) -> Arc<Self> {
        Arc::new(Self {
            codepage,
            next_session: AtomicU64::new(0),
            open: Mutex::new(HashSet::new()),
            refuse_logon: AtomicBool::new(false),
            unresponsive: AtomicBool::new(false),
            fail_next: Mutex::new(None),
            logons: AtomicUsize::new(0),
            exchanges: AtomicUsize::new(0),
        })
    }

    /// Makes later logons fail with [`TransportError::Refused`].
    pub fn refuse_logons(&self, refuse: bool) {
        self.refuse_logon.store(refuse, Ordering::SeqCst);
    }

    /// Makes liveness probes fail while sessions stay open.
    pub fn set_unresponsive(&self, unresponsive: bool) {
        self.unresponsive.store(unresponsive, Ordering::SeqCst);
    }

    /// Fails the next exchange with `error`.
    pub fn fail_next_exchange(&self, error: TransportError) {
        *lock(&self.fail_next) = Some(error);
    }

    /// Successful logons so far.
    #[must_use]
    pub fn logons(&self) -> usize {
        self.logons.load(Ordering::SeqCst)
    }

    /// Request frames received so far.
    #[must_use]
    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    /// Sessions currently open.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        lock(&self.open).len()
    }

    fn remote_marshaller(&self) -> Marshaller {
        Marshaller::new(ClientOptions::default(), self.codepage)
    }

    fn session_info(&self, parameters: &ConnectionParameters, conversation: u64) -> ConnectionInfo {
        ConnectionInfo {
            host: "localhost".to_owned(),
            partner_host: parameters.ashost.clone(),
            sys_number: parameters.sysnr.clone(),
            sys_id: "ECH".to_owned(),
            client: parameters.client.clone(),
            user: parameters.user.to_uppercase(),
            language: parameters.lang.chars().take(1).collect(),
            trace: parameters.trace.to_string(),
            iso_language: parameters.lang.to_uppercase(),
            codepage: self.codepage.to_string(),
            partner_codepage: self.codepage.to_string(),
            rfc_role: "C".to_owned(),
            system_type: "E".to_owned(),
            partner_type: "3".to_owned(),
            rel: "753".to_owned(),
            partner_rel: "753".to_owned(),
            kernel_rel: "753".to_owned(),
            cpic_conv_id: conversation.to_string(),
            prog_name: "SAPLSYST".to_owned(),
            partner_bytes_per_char: "2".to_owned(),
        }
    }

    async fn serve(&self, request: &[u8]) -> Result<Bytes, MarshalError> {
        let call = Marshaller::read_request(request)?;
        let Some(signature) = functions::signature(call.function()) else {
            return Marshaller::encode_fault(&functions::not_found(call.function()));
        };
        let remote = self.remote_marshaller();
        let inputs = match remote.decode_parameters(&signature, &call) {
            Ok(inputs) => inputs,
            Err(error) => return Marshaller::encode_fault(&invalid_parameters(&error)),
        };
        match functions::handle(call.function(), &call, &inputs) {
            Ok(Handled { outputs, delay }) => {
                if let Some(pause) = delay {
                    tokio::time::sleep(pause).await;
                }
                remote.encode_response(&signature, &outputs)
            }
            Err(fault) => Marshaller::encode_fault(&fault),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn invalid_parameters(error: &MarshalError) -> RemoteFault {
    RemoteFault::new(20, "RFC_INVALID_PARAMETER", "INVALID_PARAMETER", error.to_string())
}

#[async_trait]
impl Transport for EchoSystem {
    async fn open_session(
        &self,
        parameters: &ConnectionParameters,
    ) -> Result<Session, TransportError> {
        tokio::task::yield_now().await;
        if self.refuse_logon.load(Ordering::SeqCst) {
            return Err(TransportError::Refused {
                host: parameters.ashost.clone(),
                message: "partner not reached".to_owned(),
            });
        }
        if parameters.passwd.is_empty() {
            return Err(TransportError::Authentication {
                message: "name or password is incorrect".to_owned(),
            });
        }
        let sequence = self.next_session.fetch_add(1, Ordering::SeqCst);
        let handle = sequence.saturating_add(1);
        lock(&self.open).insert(handle);
        self.logons.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(target: SYSTEM_TARGET, session = handle, "logon accepted");
        Ok(Session {
            handle: SessionHandle::new(handle),
            info: self.session_info(parameters, FIRST_CONVERSATION.saturating_add(sequence)),
        })
    }

    async fn close_session(&self, handle: SessionHandle) {
        tokio::task::yield_now().await;
        lock(&self.open).remove(&handle.raw());
    }

    async fn send_receive(
        &self,
        handle: SessionHandle,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if !lock(&self.open).contains(&handle.raw()) {
            return Err(TransportError::Lost {
                message: format!("session {} is not open", handle.raw()),
            });
        }
        let injected = lock(&self.fail_next).take();
        if let Some(error) = injected {
            return Err(error);
        }
        self.serve(&request)
            .await
            .map_err(|error| TransportError::Negotiation {
                message: error.to_string(),
            })
    }

    async fn probe(&self, handle: SessionHandle) -> bool {
        tokio::task::yield_now().await;
        lock(&self.open).contains(&handle.raw()) && !self.unresponsive.load(Ordering::SeqCst)
    }

    fn library_version(&self) -> LibraryVersion {
        LibraryVersion {
            major: 7500,
            minor: 0,
            patch_level: 12,
        }
    }
}

#[async_trait]
impl SignatureLookup for EchoSystem {
    async fn lookup_signature(&self, function: &str) -> Result<FunctionSignature, RemoteError> {
        tokio::task::yield_now().await;
        functions::signature(function)
            .ok_or_else(|| RemoteError::from_fault(function, functions::not_found(function)))
    }
}
