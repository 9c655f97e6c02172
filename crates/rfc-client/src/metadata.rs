//! Boundary to the remote system's function metadata.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rfc_marshal::FunctionSignature;

use crate::error::RemoteError;

/// Source of published function signatures.
#[async_trait]
pub trait SignatureLookup: Send + Sync {
    /// Fetches the signature of `function`.
    ///
    /// An unknown function is reported as a [`RemoteError`], as the remote
    /// system does.
    async fn lookup_signature(&self, function: &str) -> Result<FunctionSignature, RemoteError>;
}

/// Caches signatures per function name.
///
/// Only successful lookups are cached, so a function that was missing is
/// looked up again on the next call.
pub struct SignatureCache {
    lookup: Arc<dyn SignatureLookup>,
    signatures: Mutex<HashMap<String, Arc<FunctionSignature>>>,
}

impl SignatureCache {
    /// Wraps a lookup with an empty cache.
    #[must_use]
    pub fn new(lookup: Arc<dyn SignatureLookup>) -> Self {
        Self {
            lookup,
            signatures: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached signature or fetches and caches it.
    ///
    /// # Errors
    ///
    /// Propagates the lookup's [`RemoteError`].
    pub async fn signature(&self, function: &str) -> Result<Arc<FunctionSignature>, RemoteError> {
        if let Some(cached) = self.cached(function) {
            return Ok(cached);
        }
        let fetched = Arc::new(self.lookup.lookup_signature(function).await?);
        self.signatures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(function.to_owned(), Arc::clone(&fetched));
        Ok(fetched)
    }

    /// Returns the cached signature without fetching.
    #[must_use]
    pub fn cached(&self, function: &str) -> Option<Arc<FunctionSignature>> {
        self.signatures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(function)
            .cloned()
    }

    /// Drops every cached signature.
    pub fn clear(&self) {
        self.signatures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for SignatureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self
            .signatures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("SignatureCache")
            .field("cached", &cached)
            .finish_non_exhaustive()
    }
}
