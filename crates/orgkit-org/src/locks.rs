//! Per-organization exclusive locks
//!
//! Every mutating engine operation holds the exclusive lock for its
//! organization across read-validate-write, so concurrent requests against
//! the same organization serialize rather than race. Acquisition blocks the
//! calling task until the competing operation finishes; there is no
//! timeout-and-retry at this layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Exclusive lock held for the duration of one engine operation.
pub type OrgGuard = OwnedMutexGuard<()>;

/// Lazily allocates one async mutex per organization id.
///
/// Locks are never reclaimed; the map grows with the number of distinct
/// organizations touched by this process, which matches the working set a
/// host instance serves.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl LockManager {
    /// Create an empty lock manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive lock for an organization, waiting if another
    /// operation holds it.
    pub async fn acquire(&self, organization: Uuid) -> OrgGuard {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(organization)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
