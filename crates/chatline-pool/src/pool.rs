// SPDX-FileCopyrightText: 2026 Chatline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-capacity pool with semaphore-bounded acquisition.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chatline_config::model::PoolConfig;
use chatline_core::ChatlineError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Creates the handle for one pool slot.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    async fn connect(&self, slot: usize) -> Result<Self::Handle, ChatlineError>;
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub capacity: usize,
    pub in_use: usize,
    pub acquisitions: u64,
    pub busy_rejections: u64,
    pub recreated: u64,
}

struct Slots<H> {
    /// `None` marks a handle that was reported broken and awaits recreation.
    handles: Vec<Option<H>>,
    /// Indices of slots not currently leased.
    free: Vec<usize>,
}

struct Shared<H> {
    slots: Mutex<Slots<H>>,
    acquisitions: AtomicU64,
    busy_rejections: AtomicU64,
    recreated: AtomicU64,
}

impl<H> Shared<H> {
    fn lock(&self) -> MutexGuard<'_, Slots<H>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Bounded set of reusable backend handles.
///
/// At most `capacity` leases exist at once. `acquire` waits up to the
/// configured timeout for a free slot and fails with
/// [`ChatlineError::BackendBusy`] otherwise. Only the waiting task is
/// suspended.
pub struct ConnectionPool<H: Clone + Send + Sync + 'static> {
    connector: Arc<dyn Connector<Handle = H>>,
    shared: Arc<Shared<H>>,
    permits: Arc<Semaphore>,
    capacity: usize,
    acquire_timeout: Duration,
}

impl<H: Clone + Send + Sync + 'static> ConnectionPool<H> {
    /// Create the pool and connect every slot.
    pub async fn new(
        connector: Arc<dyn Connector<Handle = H>>,
        config: &PoolConfig,
    ) -> Result<Self, ChatlineError> {
        let capacity = config.capacity.max(1);
        let mut handles = Vec::with_capacity(capacity);
        for slot in 0..capacity {
            handles.push(Some(connector.connect(slot).await?));
        }
        info!(capacity, "connection pool ready");

        Ok(Self {
            connector,
            shared: Arc::new(Shared {
                slots: Mutex::new(Slots {
                    handles,
                    free: (0..capacity).rev().collect(),
                }),
                acquisitions: AtomicU64::new(0),
                busy_rejections: AtomicU64::new(0),
                recreated: AtomicU64::new(0),
            }),
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            acquire_timeout: config.acquire_timeout(),
        })
    }

    /// Lease a handle, waiting at most the configured acquire timeout.
    pub async fn acquire(&self) -> Result<PoolLease<H>, ChatlineError> {
        self.acquire_within(self.acquire_timeout).await
    }

    /// Lease a handle, waiting at most `wait`.
    pub async fn acquire_within(&self, wait: Duration) -> Result<PoolLease<H>, ChatlineError> {
        let permit = match timeout(wait, self.permits.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(ChatlineError::Internal("connection pool is closed".into())),
            Err(_) => {
                self.shared.busy_rejections.fetch_add(1, Ordering::Relaxed);
                warn!(waited_ms = wait.as_millis() as u64, "no backend connection available");
                return Err(ChatlineError::BackendBusy { waited: wait });
            }
        };

        // Holding a permit guarantees a free index.
        let (mut reserved, existing) = {
            let mut slots = self.shared.lock();
            let Some(slot) = slots.free.pop() else {
                return Err(ChatlineError::Internal(
                    "connection pool permit granted without a free slot".into(),
                ));
            };
            let existing = slots.handles[slot].clone();
            (
                Reserved {
                    shared: &self.shared,
                    slot: Some(slot),
                },
                existing,
            )
        };
        let slot = reserved.slot();

        let handle = match existing {
            Some(handle) => handle,
            None => {
                let handle = self.connector.connect(slot).await?;
                self.shared.lock().handles[slot] = Some(handle.clone());
                self.shared.recreated.fetch_add(1, Ordering::Relaxed);
                info!(slot, "recreated broken backend connection");
                handle
            }
        };
        reserved.commit();

        self.shared.acquisitions.fetch_add(1, Ordering::Relaxed);
        debug!(slot, "backend connection leased");
        Ok(PoolLease {
            handle,
            slot,
            broken: false,
            shared: Arc::clone(&self.shared),
            _permit: permit,
        })
    }

    /// Refuse all future acquisitions. Existing leases stay valid.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> PoolStats {
        let in_use = self.capacity - self.shared.lock().free.len();
        PoolStats {
            capacity: self.capacity,
            in_use,
            acquisitions: self.shared.acquisitions.load(Ordering::Relaxed),
            busy_rejections: self.shared.busy_rejections.load(Ordering::Relaxed),
            recreated: self.shared.recreated.load(Ordering::Relaxed),
        }
    }
}

/// A slot taken off the free list but not yet handed to a lease. Dropping it
/// puts the slot back, which covers a failed or cancelled reconnect.
struct Reserved<'a, H> {
    shared: &'a Shared<H>,
    slot: Option<usize>,
}

impl<H> Reserved<'_, H> {
    fn slot(&self) -> usize {
        self.slot.unwrap_or_default()
    }

    fn commit(&mut self) {
        self.slot = None;
    }
}

impl<H> Drop for Reserved<'_, H> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.shared.lock().free.push(slot);
        }
    }
}

/// Exclusive use of one pool slot.
///
/// Dropping the lease returns the slot, including on early return, error,
/// panic unwinding and task cancellation.
pub struct PoolLease<H> {
    handle: H,
    slot: usize,
    broken: bool,
    shared: Arc<Shared<H>>,
    // Dropped after `Drop::drop` has returned the slot.
    _permit: OwnedSemaphorePermit,
}

impl<H> PoolLease<H> {
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Report the handle as unusable. The slot is recreated on its next lease.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Return the slot now.
    pub fn release(self) {}
}

impl<H> Deref for PoolLease<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.handle
    }
}

impl<H> Drop for PoolLease<H> {
    fn drop(&mut self) {
        let mut slots = self.shared.lock();
        if self.broken {
            slots.handles[self.slot] = None;
            debug!(slot = self.slot, "backend connection marked broken");
        }
        slots.free.push(self.slot);
    }
}
