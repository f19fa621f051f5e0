//! Collaborator seams for the payment-request engine.
//!
//! [`PersistenceCollaborator`] is the authoritative store the engine writes
//! through to and refreshes from. [`EmployeeDirectory`] is a read-only
//! lookup used for attribution. Both return `impl Future + Send` so that
//! implementations can be network-backed or, like the bundled backends,
//! resolve immediately.

#[cfg(feature = "storage-file")]
mod file;
mod memory;

use core::future::Future;

use chrono::{DateTime, Utc};

#[cfg(feature = "storage-file")]
pub use file::FileStorage;
pub use memory::InMemoryStorage;

use crate::error::Result;
use crate::models::{Employee, EmployeeId, PaymentRequest, PaymentRequestId, PaymentStatus};

/// Authoritative storage for payment requests.
///
/// All methods take `&self`; implementations should use interior
/// mutability (e.g. `Mutex`) for thread-safe mutation. Failures should be
/// reported as [`crate::error::PaylinkError::Persistence`].
pub trait PersistenceCollaborator: core::fmt::Debug + Send + Sync {
    /// Returns the full collection of stored requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<PaymentRequest>>> + Send;

    /// Stores a newly created request.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PaylinkError::AlreadyExists`] if the id is
    /// already stored, or an error if the write fails.
    fn insert(&self, request: &PaymentRequest) -> impl Future<Output = Result<()>> + Send;

    /// Overwrites the persisted status and modification stamp of a request.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PaylinkError::NotFound`] if the id is
    /// unknown to the backend, or an error if the write fails.
    fn update_status(
        &self,
        id: &PaymentRequestId,
        status: PaymentStatus,
        updated_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Read-only lookup of employees for attribution.
pub trait EmployeeDirectory: core::fmt::Debug + Send + Sync {
    /// Looks up an employee by id.
    ///
    /// Returns `Ok(None)` if no such employee exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    fn employee(&self, id: &EmployeeId) -> impl Future<Output = Result<Option<Employee>>> + Send;

    /// Returns employees that can currently be assigned requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    fn active_employees(&self) -> impl Future<Output = Result<Vec<Employee>>> + Send;
}
