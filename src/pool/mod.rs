//! Bounded pool of reusable handles to the backing store
//!
//! The pool owns every handle it creates. Callers borrow a handle through
//! [`PooledHandle`], which returns it on drop, so handles come back on error
//! paths as well.
//!
//! ```text
//!   acquire ──► wait ≤ acquire_timeout for an idle handle
//!                 │ got one ──► alive? ──yes──► lend it
//!                 │               └──no──► close it, open a fresh one
//!                 └ timed out ──► open a fresh one (ignores max_size)
//!
//!   release ──► alive and idle < max_size ──► back to idle
//!                 └ otherwise ──► close
//! ```
//!
//! Handles are produced by a [`HandleManager`]; [`SqliteManager`] is the
//! SQLite implementation used by the stores.

pub mod sqlite;

pub use sqlite::{SqliteManager, SqlitePool};

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::config::DatabaseConfig;
use crate::metrics::{self, AcquireOrigin};
use crate::utils::error::PoolError;

/// Creates, checks and closes handles to a backing store
pub trait HandleManager: Send + Sync + 'static {
    /// One live connection to the backing store
    type Handle: Send + 'static;

    /// Open a new handle
    fn connect(&self) -> Result<Self::Handle, PoolError>;

    /// Whether a handle is still usable
    fn is_alive(&self, handle: &Self::Handle) -> bool;

    /// Close a handle the pool no longer keeps
    fn close(&self, handle: Self::Handle) {
        drop(handle);
    }
}

/// Pool sizing and wait bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Handles opened by `initialize`
    pub initial_size: usize,
    /// Most idle handles kept after a release
    pub max_size: usize,
    /// Longest wait for an idle handle before opening one directly
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            initial_size: 5,
            max_size: 20,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&DatabaseConfig> for PoolSettings {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            initial_size: config.initial_pool_size,
            max_size: config.max_pool_size,
            acquire_timeout: config.acquire_timeout(),
        }
    }
}

/// Snapshot of pool occupancy and lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    pub initialized: bool,
    pub idle: usize,
    pub max_size: usize,
    pub created: u64,
    pub closed: u64,
    pub replaced: u64,
    pub timeouts: u64,
}

#[derive(Default)]
struct PoolCounters {
    created: AtomicU64,
    closed: AtomicU64,
    replaced: AtomicU64,
    timeouts: AtomicU64,
}

struct PoolState<H> {
    idle: VecDeque<H>,
    initialized: bool,
}

/// Bounded, explicitly owned handle pool.
///
/// `available` carries one permit per idle handle; a waiter that gets a
/// permit but finds the idle set empty (after a concurrent shutdown) opens a
/// handle directly.
pub struct ResourcePool<M: HandleManager> {
    manager: M,
    settings: PoolSettings,
    state: Mutex<PoolState<M::Handle>>,
    available: Semaphore,
    counters: PoolCounters,
}

impl<M: HandleManager> ResourcePool<M> {
    /// Create an empty, uninitialized pool
    pub fn new(manager: M, settings: PoolSettings) -> Result<Self, PoolError> {
        if settings.max_size == 0 {
            return Err(PoolError::InvalidConfig(
                "max_size must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            manager,
            settings,
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(settings.max_size),
                initialized: false,
            }),
            available: Semaphore::new(0),
            counters: PoolCounters::default(),
        })
    }

    /// Create a pool and pre-populate it
    pub fn open(manager: M, settings: PoolSettings) -> Result<Self, PoolError> {
        let pool = Self::new(manager, settings)?;
        pool.initialize()?;
        Ok(pool)
    }

    fn state(&self) -> MutexGuard<'_, PoolState<M::Handle>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pre-populate the initial handles.
    ///
    /// Idempotent: concurrent callers serialize on the state lock and only
    /// the first performs the pass. A connect failure closes whatever this
    /// pass opened and leaves the pool uninitialized.
    pub fn initialize(&self) -> Result<(), PoolError> {
        let mut state = self.state();
        if state.initialized {
            return Ok(());
        }

        let target = self.settings.initial_size.min(self.settings.max_size);
        let mut opened = Vec::with_capacity(target);
        for _ in 0..target {
            match self.connect() {
                Ok(handle) => opened.push(handle),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to initialize resource pool");
                    for handle in opened {
                        self.close(handle);
                    }
                    return Err(e);
                }
            }
        }

        let count = opened.len();
        state.idle.extend(opened);
        state.initialized = true;
        self.available.add_permits(count);
        metrics::update_idle_handles(state.idle.len());

        tracing::info!(
            handles = count,
            max_size = self.settings.max_size,
            "Resource pool initialized"
        );
        Ok(())
    }

    /// Borrow a handle, waiting up to the acquire timeout for an idle one.
    ///
    /// Initializes the pool first if needed (including after `shutdown`).
    /// Fails only when a handle has to be opened and opening fails.
    pub async fn acquire(&self) -> Result<PooledHandle<'_, M>, PoolError> {
        self.initialize()?;

        let pooled = match tokio::time::timeout(
            self.settings.acquire_timeout,
            self.available.acquire(),
        )
        .await
        {
            Ok(Ok(permit)) => {
                permit.forget();
                self.take_idle()
            }
            Ok(Err(_)) => None,
            Err(_) => {
                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                metrics::record_acquire_timeout();
                tracing::debug!(
                    timeout_ms = self.settings.acquire_timeout.as_millis() as u64,
                    "No idle handle in time, opening one directly"
                );
                None
            }
        };

        let (handle, origin) = match pooled {
            Some(handle) if self.manager.is_alive(&handle) => (handle, AcquireOrigin::Pooled),
            Some(dead) => {
                tracing::warn!("Pooled handle is dead, replacing it");
                self.close(dead);
                self.counters.replaced.fetch_add(1, Ordering::Relaxed);
                (self.connect()?, AcquireOrigin::Replacement)
            }
            None => (self.connect()?, AcquireOrigin::Overflow),
        };

        metrics::record_acquire(origin);
        Ok(PooledHandle {
            pool: self,
            handle: Some(handle),
        })
    }

    fn take_idle(&self) -> Option<M::Handle> {
        let mut state = self.state();
        let handle = state.idle.pop_front();
        metrics::update_idle_handles(state.idle.len());
        handle
    }

    /// Return a handle to the pool.
    ///
    /// Dead handles, handles returned after `shutdown`, and handles beyond
    /// `max_size` are closed instead of kept.
    pub fn release(&self, handle: M::Handle) {
        if !self.manager.is_alive(&handle) {
            self.close(handle);
            return;
        }

        let mut state = self.state();
        if state.initialized && state.idle.len() < self.settings.max_size {
            state.idle.push_back(handle);
            self.available.add_permits(1);
            metrics::update_idle_handles(state.idle.len());
        } else {
            drop(state);
            self.close(handle);
        }
    }

    /// Close every idle handle and mark the pool uninitialized
    pub fn shutdown(&self) {
        let drained: Vec<M::Handle> = {
            let mut state = self.state();
            state.initialized = false;
            let drained: Vec<_> = state.idle.drain(..).collect();
            self.available.forget_permits(drained.len());
            drained
        };

        let count = drained.len();
        for handle in drained {
            self.close(handle);
        }
        metrics::update_idle_handles(0);
        tracing::info!(closed = count, "Resource pool shut down");
    }

    /// Current occupancy and counters
    pub fn status(&self) -> PoolStatus {
        let state = self.state();
        PoolStatus {
            initialized: state.initialized,
            idle: state.idle.len(),
            max_size: self.settings.max_size,
            created: self.counters.created.load(Ordering::Relaxed),
            closed: self.counters.closed.load(Ordering::Relaxed),
            replaced: self.counters.replaced.load(Ordering::Relaxed),
            timeouts: self.counters.timeouts.load(Ordering::Relaxed),
        }
    }

    /// Pool settings
    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Handle manager backing this pool
    pub fn manager(&self) -> &M {
        &self.manager
    }

    fn connect(&self) -> Result<M::Handle, PoolError> {
        let handle = self.manager.connect()?;
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        metrics::record_handle_created();
        Ok(handle)
    }

    fn close(&self, handle: M::Handle) {
        self.manager.close(handle);
        self.counters.closed.fetch_add(1, Ordering::Relaxed);
        metrics::record_handle_closed();
    }
}

impl<M: HandleManager> fmt::Debug for ResourcePool<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("settings", &self.settings)
            .field("status", &self.status())
            .finish()
    }
}

/// A handle borrowed from a [`ResourcePool`]; returned to the pool on drop
pub struct PooledHandle<'a, M: HandleManager> {
    pool: &'a ResourcePool<M>,
    handle: Option<M::Handle>,
}

impl<M: HandleManager> PooledHandle<'_, M> {
    /// Take the handle out of the pool's care. The pool does not track it;
    /// it is never returned unless the caller passes it to `release`.
    pub fn detach(mut self) -> M::Handle {
        self.handle
            .take()
            .expect("PooledHandle holds its handle until dropped")
    }
}

impl<M: HandleManager> Deref for PooledHandle<'_, M> {
    type Target = M::Handle;

    fn deref(&self) -> &Self::Target {
        self.handle
            .as_ref()
            .expect("PooledHandle holds its handle until dropped")
    }
}

impl<M: HandleManager> DerefMut for PooledHandle<'_, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.handle
            .as_mut()
            .expect("PooledHandle holds its handle until dropped")
    }
}

impl<M: HandleManager> Drop for PooledHandle<'_, M> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.release(handle);
        }
    }
}
