//! In-memory storage backend.
//!
//! Provides [`InMemoryStorage`], a thread-safe in-memory implementation of
//! both collaborator traits. Ideal for unit and integration tests, and for
//! embedding the engine where durability is handled elsewhere.

use core::future::{self, Future};
use core::hash::Hash;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use super::{EmployeeDirectory, PersistenceCollaborator};
use crate::error::{PaylinkError, Result};
use crate::models::{Employee, EmployeeId, PaymentRequest, PaymentRequestId, PaymentStatus};

/// Thread-safe in-memory storage.
///
/// # Example
///
/// ```rust
/// use paylink_rs::storage::InMemoryStorage;
///
/// let storage = InMemoryStorage::new();
/// // Hand it to PaymentConsole::builder().persistence(storage) ...
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// All state behind a single mutex for thread-safe interior mutability.
    inner: Mutex<Inner>,
}

/// Inner mutable state.
#[derive(Debug, Default)]
struct Inner {
    /// Stored payment requests, in insertion order.
    requests: Vec<PaymentRequest>,
    /// Stored employees.
    employees: Vec<Employee>,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage pre-populated with the given requests.
    #[inline]
    #[must_use]
    pub fn with_requests(requests: Vec<PaymentRequest>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                requests,
                employees: Vec::new(),
            }),
        }
    }

    /// Inserts or replaces employees (matched by id).
    ///
    /// The engine never calls this; it exists to seed the directory.
    #[inline]
    pub fn upsert_employees(&self, items: Vec<Employee>) {
        self.with_lock(|inner| upsert_by_key(&mut inner.employees, items, |e| e.id.clone()));
    }

    /// Returns a copy of every stored request.
    #[inline]
    #[must_use]
    pub fn stored_requests(&self) -> Vec<PaymentRequest> {
        self.with_lock(|inner| inner.requests.clone())
    }

    /// Acquires the inner lock and applies a closure.
    ///
    /// Every mutation is a single assignment or push, so a poisoned lock
    /// still guards consistent data.
    fn with_lock<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut inner)
    }
}

/// Merges `new_items` into `existing` by key, replacing duplicates in
/// place and appending the rest.
fn upsert_by_key<T, K>(existing: &mut Vec<T>, new_items: Vec<T>, key_fn: fn(&T) -> K)
where
    K: Hash + Eq,
{
    let mut positions: HashMap<K, usize> = existing
        .iter()
        .enumerate()
        .map(|(index, item)| (key_fn(item), index))
        .collect();
    for item in new_items {
        let key = key_fn(&item);
        if let Some(slot) = positions.get(&key).and_then(|&index| existing.get_mut(index)) {
            *slot = item;
        } else {
            let _previous = positions.insert(key, existing.len());
            existing.push(item);
        }
    }
}

/// Applies a status write to the stored request with the given id.
fn write_status(
    requests: &mut [PaymentRequest],
    id: &PaymentRequestId,
    status: PaymentStatus,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    let stored = requests
        .iter_mut()
        .find(|request| request.id == *id)
        .ok_or_else(|| PaylinkError::NotFound(id.clone()))?;
    stored.status = status;
    stored.updated_at = updated_at;
    Ok(())
}

impl PersistenceCollaborator for InMemoryStorage {
    #[inline]
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<PaymentRequest>>> + Send {
        future::ready(Ok(self.stored_requests()))
    }

    #[inline]
    fn insert(&self, request: &PaymentRequest) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.with_lock(|inner| {
            if inner.requests.iter().any(|stored| stored.id == request.id) {
                return Err(PaylinkError::AlreadyExists(request.id.clone()));
            }
            inner.requests.push(request.clone());
            Ok(())
        }))
    }

    #[inline]
    fn update_status(
        &self,
        id: &PaymentRequestId,
        status: PaymentStatus,
        updated_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send {
        future::ready(
            self.with_lock(|inner| write_status(&mut inner.requests, id, status, updated_at)),
        )
    }
}

impl EmployeeDirectory for InMemoryStorage {
    #[inline]
    fn employee(&self, id: &EmployeeId) -> impl Future<Output = Result<Option<Employee>>> + Send {
        future::ready(Ok(self.with_lock(|inner| {
            inner.employees.iter().find(|e| e.id == *id).cloned()
        })))
    }

    #[inline]
    fn active_employees(&self) -> impl Future<Output = Result<Vec<Employee>>> + Send {
        future::ready(Ok(self.with_lock(|inner| {
            inner
                .employees
                .iter()
                .filter(|e| e.is_active())
                .cloned()
                .collect()
        })))
    }
}
