//! Bounded connection pool.
//!
//! Members are created lazily up to the configured capacity and lent out
//! exclusively through [`Lease`]s. Each acquisition health-checks the member
//! first: a member that never held a session is connected once, while one
//! whose session dropped or fails its probe is reopened under the pool's
//! [`ReopenPolicy`]. Unhealthy members are never evicted. A member whose
//! reopen attempts run out, or whose acquisition is abandoned midway, goes
//! back to the idle set for the next acquisition to try again.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rfc_config::{ClientOptions, ConfigError, ConnectionParameters, PoolSettings, ReopenPolicy};
use rfc_marshal::{CallResult, Structure};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::backend::Backend;
use crate::client::Client;
use crate::error::{ClientOperation, ConnectionError, RfcError};
use crate::health::{HealthReporter, StructuredHealthReporter};

const POOL_TARGET: &str = "rfc_client::pool";

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Maximum number of members.
    pub capacity: usize,
    /// Members waiting to be lent out.
    pub idle: usize,
    /// Members currently lent out.
    pub leased: usize,
}

/// A bounded set of clients sharing one backend and one set of parameters.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    backend: Backend,
    parameters: ConnectionParameters,
    options: ClientOptions,
    settings: PoolSettings,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<Member>>,
    leased: AtomicUsize,
    reporter: Arc<dyn HealthReporter>,
}

impl Pool {
    /// Builds an empty pool that logs health events with `tracing`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the settings or parameters are invalid.
    pub fn new(
        backend: &Backend,
        parameters: ConnectionParameters,
        options: ClientOptions,
        settings: PoolSettings,
    ) -> Result<Self, ConfigError> {
        Self::with_reporter(
            backend,
            parameters,
            options,
            settings,
            Arc::new(StructuredHealthReporter::new()),
        )
    }

    /// Builds an empty pool reporting health events to `reporter`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the settings or parameters are invalid.
    pub fn with_reporter(
        backend: &Backend,
        parameters: ConnectionParameters,
        options: ClientOptions,
        settings: PoolSettings,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        parameters.validate()?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                backend: backend.clone(),
                parameters,
                options,
                settings,
                permits: Arc::new(Semaphore::new(settings.capacity)),
                idle: Mutex::new(Vec::with_capacity(settings.capacity)),
                leased: AtomicUsize::new(0),
                reporter,
            }),
        })
    }

    /// Settings the pool was built with.
    #[must_use]
    pub fn settings(&self) -> PoolSettings {
        self.inner.settings
    }

    /// Waits for a healthy member and lends it out.
    ///
    /// # Errors
    ///
    /// Returns [`RfcError::Pool`] with [`ConnectionError::PoolTimeout`] when
    /// no member frees up in time, and [`RfcError::Connection`] when the
    /// member cannot be opened or its reopen attempts run out.
    pub async fn acquire(&self) -> Result<Lease, RfcError> {
        let inner = &self.inner;
        let deadline = inner.settings.acquire_timeout();
        let waited = tokio::time::timeout(deadline, Arc::clone(&inner.permits).acquire_owned());
        let permit = match waited.await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(RfcError::Pool {
                    operation: ClientOperation::Acquire,
                    source: ConnectionError::NotOpen,
                });
            }
            Err(_) => {
                inner.reporter.acquire_timed_out(deadline);
                return Err(RfcError::Pool {
                    operation: ClientOperation::Acquire,
                    source: ConnectionError::PoolTimeout {
                        waited_ms: inner.settings.acquire_timeout_ms,
                    },
                });
            }
        };

        let member = inner.take_idle().unwrap_or_else(|| inner.create_member());
        let checkout = Checkout::new(inner, member);
        inner.ensure_healthy(checkout.member()).await?;
        let client = checkout.lend();
        inner.leased.fetch_add(1, Ordering::SeqCst);
        inner.reporter.lease_granted(client.id());
        Ok(Lease {
            client,
            pool: Arc::downgrade(&self.inner),
            _permit: permit,
        })
    }

    /// Returns a leased member to the pool. Dropping the lease does the same.
    pub fn release(&self, lease: Lease) {
        tracing::trace!(
            target: POOL_TARGET,
            connection = lease.id(),
            status = ?self.status(),
            "lease released explicitly"
        );
        drop(lease);
    }

    /// Opens up to `count` members ahead of demand, capped at capacity.
    ///
    /// # Errors
    ///
    /// Propagates the first acquisition failure.
    pub async fn ready(&self, count: usize) -> Result<(), RfcError> {
        let wanted = count.min(self.inner.settings.capacity);
        let mut leases = Vec::with_capacity(wanted);
        for _ in 0..wanted {
            leases.push(self.acquire().await?);
        }
        drop(leases);
        Ok(())
    }

    /// Current occupancy.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            capacity: self.inner.settings.capacity,
            idle: self.inner.lock_idle().len(),
            leased: self.inner.leased.load(Ordering::SeqCst),
        }
    }

    /// Closes and discards every idle member. Leased members are untouched.
    pub async fn close_all(&self) {
        let drained: Vec<Client> = self
            .inner
            .lock_idle()
            .drain(..)
            .map(|member| member.client)
            .collect();
        tracing::info!(
            target: POOL_TARGET,
            event = "pool_closing",
            members = drained.len(),
            "closing idle pool members"
        );
        for client in drained {
            client.close().await;
        }
    }

    /// Acquires a member, calls `function` on it and releases it.
    ///
    /// # Errors
    ///
    /// Returns acquisition failures and the call's own [`RfcError`].
    pub async fn invoke(
        &self,
        function: impl Into<String>,
        parameters: Structure,
    ) -> Result<CallResult, RfcError> {
        let lease = self.acquire().await?;
        let result = lease.invoke(function, parameters).await;
        self.release(lease);
        result
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("settings", &self.inner.settings)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl PoolInner {
    fn lock_idle(&self) -> MutexGuard<'_, Vec<Member>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_idle(&self) -> Option<Member> {
        self.lock_idle().pop()
    }

    fn return_idle(&self, member: Member) {
        self.lock_idle().push(member);
    }

    fn create_member(&self) -> Member {
        let client = Client::new(&self.backend, self.parameters.clone(), self.options);
        tracing::debug!(
            target: POOL_TARGET,
            event = "member_created",
            connection = client.id(),
            "pool member created"
        );
        Member {
            client,
            opened: false,
        }
    }

    async fn ensure_healthy(&self, member: &Member) -> Result<(), RfcError> {
        let client = &member.client;
        let id = client.id();
        if client.is_alive() {
            if client.ping().await {
                return Ok(());
            }
        } else if !member.opened {
            return match client.connect().await {
                Ok(()) => {
                    self.reporter.member_opened(id);
                    Ok(())
                }
                Err(error) => {
                    self.reporter.member_open_failed(id, &error);
                    Err(error)
                }
            };
        }
        self.reporter.member_unhealthy(id);
        self.reopen(client, self.settings.reopen).await
    }

    async fn reopen(&self, client: &Client, policy: ReopenPolicy) -> Result<(), RfcError> {
        let id = client.id();
        for attempt in 1..=policy.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(policy.backoff()).await;
            }
            match client.reopen().await {
                Ok(()) => {
                    self.reporter.member_reopened(id, attempt);
                    return Ok(());
                }
                Err(error) => self.reporter.reopen_failed(id, attempt, &error),
            }
        }
        Err(RfcError::connection(
            id,
            ClientOperation::Acquire,
            ConnectionError::ReopenExhausted {
                attempts: policy.max_attempts,
            },
        ))
    }
}

/// A pool member and whether it has ever held a session.
#[derive(Debug, Clone)]
struct Member {
    client: Client,
    opened: bool,
}

/// A member taken from the idle set while it is health-checked.
///
/// Dropping the checkout puts the member back, so an acquisition that fails
/// or is abandoned never loses it. [`Checkout::lend`] hands it to a lease
/// instead.
struct Checkout<'pool> {
    pool: &'pool PoolInner,
    member: Member,
    lent: bool,
}

impl<'pool> Checkout<'pool> {
    const fn new(pool: &'pool PoolInner, member: Member) -> Self {
        Self {
            pool,
            member,
            lent: false,
        }
    }

    const fn member(&self) -> &Member {
        &self.member
    }

    fn lend(mut self) -> Client {
        self.lent = true;
        self.member.client.clone()
    }
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        if self.lent {
            return;
        }
        tracing::debug!(
            target: POOL_TARGET,
            event = "member_returned",
            connection = self.member.client.id(),
            "pool member returned without a lease"
        );
        self.pool.return_idle(self.member.clone());
    }
}

/// Exclusive loan of a pool member.
///
/// Dereferences to the [`Client`]. The member goes back to the pool when the
/// lease is dropped or passed to [`Pool::release`].
pub struct Lease {
    client: Client,
    pool: Weak<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for Lease {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let Some(pool) = self.pool.upgrade() else {
            return;
        };
        pool.return_idle(Member {
            client: self.client.clone(),
            opened: true,
        });
        pool.leased.fetch_sub(1, Ordering::SeqCst);
        pool.reporter.lease_released(self.client.id());
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
