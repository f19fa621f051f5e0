//! Presentation-facing facade over the payment-request engine.
//!
//! [`PaymentConsole`] bundles the snapshot store, the refresh coordinator,
//! and the employee directory, and answers the questions a dashboard or a
//! request list asks: what is there, what does it add up to, and what
//! matches a search.

use chrono::{DateTime, TimeZone, Utc};

use crate::clock::{Clock, SystemClock};
use crate::config::ConsoleConfig;
use crate::error::{PaylinkError, Result};
use crate::models::{
    AdminId, DashboardStats, Employee, EmployeeId, PaymentRequest, PaymentRequestDraft,
    PaymentRequestId, PaymentStatus, RefreshState,
};
use crate::refresh::RefreshCoordinator;
use crate::search::{self, PaymentQuery};
use crate::stats::{self, DayBoundary};
use crate::storage::{EmployeeDirectory, PersistenceCollaborator};
use crate::store::{PaymentRequestStore, RefreshReport};

/// Builder for [`PaymentConsole`].
#[derive(Debug)]
pub struct PaymentConsoleBuilder<P, E, C = SystemClock> {
    /// Persistence collaborator.
    persistence: Option<P>,
    /// Employee directory.
    directory: Option<E>,
    /// Time source.
    clock: C,
    /// Engine settings.
    config: ConsoleConfig,
    /// Operator stamped on drafts that do not name a creator.
    operator: Option<AdminId>,
}

impl<P, E, C> PaymentConsoleBuilder<P, E, C>
where
    P: PersistenceCollaborator,
    E: EmployeeDirectory,
    C: Clock,
{
    /// Sets the persistence collaborator.
    #[inline]
    #[must_use]
    pub fn persistence(mut self, persistence: P) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Sets the employee directory.
    #[inline]
    #[must_use]
    pub fn directory(mut self, directory: E) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Replaces the engine configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the operator recorded as creator of new requests.
    #[inline]
    #[must_use]
    pub fn operator(mut self, admin: AdminId) -> Self {
        self.operator = Some(admin);
        self
    }

    /// Swaps the time source.
    #[inline]
    #[must_use]
    pub fn clock<C2: Clock>(self, clock: C2) -> PaymentConsoleBuilder<P, E, C2> {
        PaymentConsoleBuilder {
            persistence: self.persistence,
            directory: self.directory,
            clock,
            config: self.config,
            operator: self.operator,
        }
    }

    /// Builds the console with an empty snapshot.
    ///
    /// Call [`PaymentConsole::refresh`] to load existing requests.
    ///
    /// # Errors
    ///
    /// Returns [`PaylinkError::Config`] if a collaborator is missing or the
    /// configuration is invalid.
    #[inline]
    pub fn build(self) -> Result<PaymentConsole<P, E, C>> {
        let persistence = self
            .persistence
            .ok_or_else(|| PaylinkError::Config("persistence collaborator is required".to_owned()))?;
        let directory = self
            .directory
            .ok_or_else(|| PaylinkError::Config("employee directory is required".to_owned()))?;
        let store = PaymentRequestStore::with_clock(persistence, self.clock, self.config)?;

        Ok(PaymentConsole {
            store,
            directory,
            coordinator: RefreshCoordinator::new(),
            operator: self.operator,
        })
    }
}

/// Payment console: the snapshot store plus the derived views over it.
///
/// # Example
///
/// ```rust
/// use paylink_rs::console::PaymentConsole;
/// use paylink_rs::models::AdminId;
/// use paylink_rs::storage::InMemoryStorage;
///
/// let console = PaymentConsole::builder()
///     .persistence(InMemoryStorage::new())
///     .directory(InMemoryStorage::new())
///     .operator(AdminId::new("admin-1".to_owned()))
///     .build()
///     .unwrap();
/// assert!(console.list().is_empty());
/// ```
#[derive(Debug)]
pub struct PaymentConsole<P, E, C = SystemClock> {
    /// Snapshot owner.
    store: PaymentRequestStore<P, C>,
    /// Employee lookup.
    directory: E,
    /// Refresh de-duplication.
    coordinator: RefreshCoordinator,
    /// Default creator for drafts.
    operator: Option<AdminId>,
}

impl<P, E> PaymentConsole<P, E, SystemClock>
where
    P: PersistenceCollaborator,
    E: EmployeeDirectory,
{
    /// Creates a new builder using the system clock.
    #[inline]
    #[must_use]
    pub fn builder() -> PaymentConsoleBuilder<P, E, SystemClock> {
        PaymentConsoleBuilder {
            persistence: None,
            directory: None,
            clock: SystemClock,
            config: ConsoleConfig::default(),
            operator: None,
        }
    }
}

impl<P, E, C> PaymentConsole<P, E, C>
where
    P: PersistenceCollaborator,
    E: EmployeeDirectory,
    C: Clock,
{
    /// Returns the underlying store.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &PaymentRequestStore<P, C> {
        &self.store
    }

    /// Returns the current instant according to the console's clock.
    #[inline]
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.store.clock().now()
    }

    /// Reloads the snapshot from persistence, sharing any refresh already
    /// in flight.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error; the previous snapshot is kept.
    #[inline]
    pub async fn refresh(&self) -> Result<RefreshReport> {
        self.coordinator.refresh(&self.store).await
    }

    /// Returns whether a refresh is in flight.
    #[inline]
    #[must_use]
    pub fn refresh_state(&self) -> RefreshState {
        self.coordinator.state()
    }

    /// Returns every request, most recent first.
    #[inline]
    #[must_use]
    pub fn list(&self) -> Vec<PaymentRequest> {
        self.store.list()
    }

    /// Returns the `limit` most recently created requests.
    #[inline]
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<PaymentRequest> {
        stats::recent(&self.store.list(), limit)
    }

    /// Returns the request with the given id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: &PaymentRequestId) -> Option<PaymentRequest> {
        self.store.get(id)
    }

    /// Returns the effective status of a request right now.
    #[inline]
    #[must_use]
    pub fn effective_status(&self, request: &PaymentRequest) -> PaymentStatus {
        request.effective_status(self.now())
    }

    /// Dashboard figures with today taken from the system time zone.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> DashboardStats {
        let now = self.now();
        stats::compute_stats(&self.store.list(), now, &DayBoundary::local(now))
    }

    /// Dashboard figures with today taken from `tz`.
    #[inline]
    #[must_use]
    pub fn stats_in<Tz: TimeZone>(&self, tz: &Tz) -> DashboardStats {
        let now = self.now();
        stats::compute_stats(&self.store.list(), now, &DayBoundary::for_local_day(now, tz))
    }

    /// Requests matching `query`, most recent first.
    #[inline]
    #[must_use]
    pub fn query(&self, query: &PaymentQuery) -> Vec<PaymentRequest> {
        search::query(&self.store.list(), query, self.now())
    }

    /// Creates a request, recording the console operator as creator when
    /// the draft names none.
    ///
    /// # Errors
    ///
    /// See [`PaymentRequestStore::create`].
    pub async fn create(&self, mut draft: PaymentRequestDraft) -> Result<PaymentRequest> {
        if draft.created_by.is_none() {
            draft.created_by.clone_from(&self.operator);
        }
        self.store.create(draft).await
    }

    /// Writes an explicit status.
    ///
    /// # Errors
    ///
    /// See [`PaymentRequestStore::update_status`].
    #[inline]
    pub async fn update_status(
        &self,
        id: &PaymentRequestId,
        status: PaymentStatus,
    ) -> Result<PaymentRequest> {
        self.store.update_status(id, status).await
    }

    /// Records a successful payment.
    ///
    /// # Errors
    ///
    /// See [`PaymentRequestStore::update_status`].
    #[inline]
    pub async fn mark_paid(&self, id: &PaymentRequestId) -> Result<PaymentRequest> {
        self.update_status(id, PaymentStatus::Paid).await
    }

    /// Records a failed payment.
    ///
    /// # Errors
    ///
    /// See [`PaymentRequestStore::update_status`].
    #[inline]
    pub async fn mark_failed(&self, id: &PaymentRequestId) -> Result<PaymentRequest> {
        self.update_status(id, PaymentStatus::Failed).await
    }

    /// Looks up the employee a request is attributed to.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    #[inline]
    pub async fn employee_for(&self, request: &PaymentRequest) -> Result<Option<Employee>> {
        match &request.employee_id {
            Some(id) => self.directory.employee(id).await,
            None => Ok(None),
        }
    }

    /// Looks up an employee by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    #[inline]
    pub async fn employee(&self, id: &EmployeeId) -> Result<Option<Employee>> {
        self.directory.employee(id).await
    }

    /// Employees that can be assigned new requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    #[inline]
    pub async fn active_employees(&self) -> Result<Vec<Employee>> {
        self.directory.active_employees().await
    }
}
