//! The remote system as seen by clients and pools.

use std::sync::Arc;

use crate::metadata::{SignatureCache, SignatureLookup};
use crate::transport::Transport;

/// A transport plus the signature cache shared by every client built on it.
#[derive(Clone)]
pub struct Backend {
    transport: Arc<dyn Transport>,
    signatures: Arc<SignatureCache>,
}

impl Backend {
    /// Pairs a transport with its metadata source.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, metadata: Arc<dyn SignatureLookup>) -> Self {
        Self {
            transport,
            signatures: Arc::new(SignatureCache::new(metadata)),
        }
    }

    /// The shared transport.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// The shared signature cache.
    #[must_use]
    pub fn signatures(&self) -> Arc<SignatureCache> {
        Arc::clone(&self.signatures)
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("signatures", &self.signatures)
            .finish_non_exhaustive()
    }
}
