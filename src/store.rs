//! Authoritative in-memory snapshot of payment requests.
//!
//! [`PaymentRequestStore`] owns the only copy of the request collection.
//! Consumers receive clones; the snapshot is changed only by [`create`],
//! [`update_status`], and refreshes from the persistence collaborator.
//! Mutations are write-through: the collaborator must acknowledge before
//! the snapshot changes, so a failed write leaves it untouched.
//!
//! [`create`]: PaymentRequestStore::create
//! [`update_status`]: PaymentRequestStore::update_status

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::clock::{Clock, SystemClock};
use crate::config::ConsoleConfig;
use crate::error::{PaylinkError, Result};
use crate::models::{PaymentRequest, PaymentRequestDraft, PaymentRequestId, PaymentStatus};
use crate::storage::PersistenceCollaborator;

/// Outcome of loading the collection from the persistence collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Records now in the snapshot.
    pub loaded: usize,
    /// Fetched records dropped because they violate request invariants.
    pub rejected: usize,
    /// Local records kept because they were written while the fetch was
    /// in flight and are newer than (or absent from) the fetched copy.
    pub retained_local: usize,
}

/// Snapshot contents guarded by the store mutex.
#[derive(Debug, Default)]
struct Snapshot {
    /// Requests, most recent `created_at` first.
    requests: Vec<PaymentRequest>,
    /// Count of acknowledged local mutations, used to detect writes that
    /// race with a refresh fetch.
    mutations: u64,
}

/// Owner of the payment-request snapshot.
#[derive(Debug)]
pub struct PaymentRequestStore<P, C = SystemClock> {
    /// Authoritative backend.
    persistence: P,
    /// Time source for creation and modification stamps.
    clock: C,
    /// Horizon and link settings.
    config: ConsoleConfig,
    /// Current snapshot.
    snapshot: Mutex<Snapshot>,
}

impl<P: PersistenceCollaborator> PaymentRequestStore<P, SystemClock> {
    /// Creates an empty store using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`PaylinkError::Config`] if `config` is invalid.
    #[inline]
    pub fn new(persistence: P, config: ConsoleConfig) -> Result<Self> {
        Self::with_clock(persistence, SystemClock, config)
    }
}

impl<P: PersistenceCollaborator, C: Clock> PaymentRequestStore<P, C> {
    /// Creates an empty store with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`PaylinkError::Config`] if `config` is invalid.
    #[inline]
    pub fn with_clock(persistence: P, clock: C, config: ConsoleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            persistence,
            clock,
            config,
            snapshot: Mutex::new(Snapshot::default()),
        })
    }

    /// Returns the persistence collaborator.
    #[inline]
    #[must_use]
    pub const fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Returns the clock.
    #[inline]
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns the active configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Validates `draft`, writes the new request through, then inserts it
    /// into the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PaylinkError::Validation`] for missing or invalid input
    /// (no write is attempted), or the collaborator's error if the insert
    /// fails (the snapshot is unchanged).
    #[tracing::instrument(skip_all)]
    pub async fn create(&self, draft: PaymentRequestDraft) -> Result<PaymentRequest> {
        let request = draft.into_request(
            self.clock.now(),
            self.config.horizon,
            &self.config.link_base_url,
        )?;

        if let Err(err) = self.persistence.insert(&request).await {
            tracing::warn!(bill_no = %request.bill_no, error = %err, "write-through failed");
            return Err(err);
        }

        let mut snapshot = self.lock();
        let position = snapshot
            .requests
            .partition_point(|existing| existing.created_at > request.created_at);
        snapshot.requests.insert(position, request.clone());
        snapshot.mutations += 1;
        drop(snapshot);

        tracing::debug!(
            id = %request.id,
            bill_no = %request.bill_no,
            amount = %request.amount,
            expires_at = %request.expires_at,
            "payment request created"
        );
        Ok(request)
    }

    /// Writes an explicit terminal status (`paid` or `failed`).
    ///
    /// A request that has lapsed by time but is still persisted as pending
    /// accepts the write: a late gateway confirmation wins over implied
    /// expiry.
    ///
    /// # Errors
    ///
    /// Returns [`PaylinkError::NotFound`] for an unknown id,
    /// [`PaylinkError::IllegalTransition`] if the persisted status is
    /// already terminal or `new_status` is not `paid`/`failed`, or the
    /// collaborator's error if the write fails. The snapshot is unchanged
    /// on every error.
    #[tracing::instrument(skip_all, fields(id = %id, to = %new_status))]
    pub async fn update_status(
        &self,
        id: &PaymentRequestId,
        new_status: PaymentStatus,
    ) -> Result<PaymentRequest> {
        let current = self.get(id).ok_or_else(|| PaylinkError::NotFound(id.clone()))?;
        if current.status.is_terminal() || !new_status.is_explicit_target() {
            return Err(PaylinkError::IllegalTransition {
                id: id.clone(),
                from: current.status,
                to: new_status,
            });
        }

        let updated_at = self.clock.now();
        if let Err(err) = self
            .persistence
            .update_status(id, new_status, updated_at)
            .await
        {
            tracing::warn!(error = %err, "write-through failed");
            return Err(err);
        }

        let mut updated = current;
        updated.status = new_status;
        updated.updated_at = updated_at;

        let mut snapshot = self.lock();
        if let Some(slot) = snapshot.requests.iter_mut().find(|r| r.id == *id) {
            slot.clone_from(&updated);
        }
        snapshot.mutations += 1;
        drop(snapshot);

        tracing::debug!("payment request status updated");
        Ok(updated)
    }

    /// Fetches the full collection from the collaborator and installs it
    /// as the new snapshot.
    ///
    /// If a local write was acknowledged while the fetch was in flight,
    /// the fetched collection is merged with the snapshot so that write is
    /// not lost.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error; the previous snapshot stays in
    /// place.
    #[tracing::instrument(skip_all)]
    pub async fn load_from_persistence(&self) -> Result<RefreshReport> {
        let mutations_before = self.lock().mutations;
        let fetched = self.persistence.fetch_all().await?;
        let (mut incoming, rejected) = normalize(fetched);

        let mut snapshot = self.lock();
        let retained_local = if snapshot.mutations == mutations_before {
            0
        } else {
            merge_local(&mut incoming, &snapshot.requests)
        };
        snapshot.requests = incoming;
        let report = RefreshReport {
            loaded: snapshot.requests.len(),
            rejected,
            retained_local,
        };
        drop(snapshot);

        tracing::debug!(
            loaded = report.loaded,
            rejected = report.rejected,
            retained_local = report.retained_local,
            "snapshot refreshed"
        );
        Ok(report)
    }

    /// Returns a copy of the snapshot, most recent first.
    #[inline]
    #[must_use]
    pub fn list(&self) -> Vec<PaymentRequest> {
        self.lock().requests.clone()
    }

    /// Returns a copy of the request with the given id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: &PaymentRequestId) -> Option<PaymentRequest> {
        self.lock().requests.iter().find(|r| r.id == *id).cloned()
    }

    /// Returns the number of requests in the snapshot.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().requests.len()
    }

    /// Returns `true` if the snapshot holds no requests.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().requests.is_empty()
    }

    /// Locks the snapshot.
    ///
    /// Every critical section finishes with whole-value writes, so a
    /// poisoned lock still guards a consistent snapshot.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops records that break request invariants, collapses duplicate ids
/// onto the most recently updated copy, and orders the result most recent
/// first. Returns the cleaned records and the number rejected.
fn normalize(records: Vec<PaymentRequest>) -> (Vec<PaymentRequest>, usize) {
    let mut rejected = 0_usize;
    let mut by_id: HashMap<PaymentRequestId, usize> = HashMap::with_capacity(records.len());
    let mut cleaned: Vec<PaymentRequest> = Vec::with_capacity(records.len());

    for record in records {
        if let Err(reason) = record.check_invariants() {
            tracing::warn!(id = %record.id, bill_no = %record.bill_no, %reason, "discarding invalid record");
            rejected += 1;
            continue;
        }
        match by_id.get(&record.id).and_then(|&index| cleaned.get_mut(index)) {
            Some(existing) => {
                if record.updated_at > existing.updated_at {
                    *existing = record;
                }
            }
            None => {
                let _previous = by_id.insert(record.id.clone(), cleaned.len());
                cleaned.push(record);
            }
        }
    }

    sort_most_recent_first(&mut cleaned);
    (cleaned, rejected)
}

/// Folds local records into a fetched collection where the local copy is
/// newer or missing upstream. Returns how many local records were kept.
fn merge_local(incoming: &mut Vec<PaymentRequest>, local: &[PaymentRequest]) -> usize {
    let positions: HashMap<PaymentRequestId, usize> = incoming
        .iter()
        .enumerate()
        .map(|(index, request)| (request.id.clone(), index))
        .collect();
    let mut retained = 0_usize;

    for request in local {
        match positions.get(&request.id).and_then(|&index| incoming.get_mut(index)) {
            Some(fetched) if fetched.updated_at >= request.updated_at => {}
            Some(fetched) => {
                fetched.clone_from(request);
                retained += 1;
            }
            None => {
                incoming.push(request.clone());
                retained += 1;
            }
        }
    }

    if retained > 0 {
        sort_most_recent_first(incoming);
    }
    retained
}

/// Stable sort by `created_at`, newest first.
fn sort_most_recent_first(requests: &mut [PaymentRequest]) {
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use core::future::Future;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use chrono::{DateTime, TimeDelta, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ValidationError;
    use crate::models::AdminId;
    use crate::storage::InMemoryStorage;

    /// Collaborator that counts calls and can be told to fail.
    #[derive(Debug, Default)]
    struct FlakyStorage {
        /// Backing data.
        inner: InMemoryStorage,
        /// When set, every call fails.
        failing: AtomicBool,
        /// Number of `insert` calls.
        inserts: AtomicUsize,
        /// Number of `update_status` calls.
        updates: AtomicUsize,
    }

    impl FlakyStorage {
        fn fail(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(PaylinkError::persistence("backend unavailable"))
            } else {
                Ok(())
            }
        }
    }

    impl PersistenceCollaborator for FlakyStorage {
        fn fetch_all(&self) -> impl Future<Output = Result<Vec<PaymentRequest>>> + Send {
            async move {
                self.check()?;
                self.inner.fetch_all().await
            }
        }

        fn insert(&self, request: &PaymentRequest) -> impl Future<Output = Result<()>> + Send {
            let _count = self.inserts.fetch_add(1, Ordering::SeqCst);
            let request = request.clone();
            async move {
                self.check()?;
                self.inner.insert(&request).await
            }
        }

        fn update_status(
            &self,
            id: &PaymentRequestId,
            status: PaymentStatus,
            updated_at: DateTime<Utc>,
        ) -> impl Future<Output = Result<()>> + Send {
            let _count = self.updates.fetch_add(1, Ordering::SeqCst);
            let id = id.clone();
            async move {
                self.check()?;
                self.inner.update_status(&id, status, updated_at).await
            }
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    type TestStore = PaymentRequestStore<FlakyStorage, Arc<ManualClock>>;

    fn store() -> (TestStore, Arc<ManualClock>) {
        store_over(InMemoryStorage::new())
    }

    fn store_over(inner: InMemoryStorage) -> (TestStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let persistence = FlakyStorage {
            inner,
            ..FlakyStorage::default()
        };
        let store = PaymentRequestStore::with_clock(
            persistence,
            Arc::clone(&clock),
            ConsoleConfig::default(),
        )
        .unwrap();
        (store, clock)
    }

    fn draft(bill_no: &str, amount: i64) -> PaymentRequestDraft {
        PaymentRequestDraft::new()
            .bill_no(bill_no)
            .amount(Decimal::from(amount))
            .customer_mobile("9000000001")
            .created_by(AdminId::new("admin-1".to_owned()))
    }

    fn stored(id: &str, created_at: DateTime<Utc>) -> PaymentRequest {
        PaymentRequest {
            id: PaymentRequestId::new(id.to_owned()),
            bill_no: format!("B-{id}"),
            amount: Decimal::from(100),
            customer_name: None,
            customer_mobile: "9000000001".to_owned(),
            customer_email: None,
            employee_id: None,
            status: PaymentStatus::Pending,
            payment_link: format!("https://pay.example.com/{id}"),
            created_by: AdminId::new("admin-1".to_owned()),
            created_at,
            updated_at: created_at,
            expires_at: created_at + TimeDelta::hours(24),
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = PaymentRequestStore::new(
            InMemoryStorage::new(),
            ConsoleConfig::new().horizon(TimeDelta::hours(-1)),
        );
        assert!(matches!(result, Err(PaylinkError::Config(_))));
    }

    #[tokio::test]
    async fn create_writes_through_and_inserts() {
        let (store, _clock) = store();
        let created = store.create(draft("B-100", 500)).await.unwrap();

        assert_eq!(created.status, PaymentStatus::Pending);
        assert_eq!(created.created_at, t0());
        assert_eq!(created.expires_at, t0() + TimeDelta::hours(24));
        assert_eq!(store.list(), vec![created.clone()]);
        assert_eq!(store.persistence().inner.stored_requests(), vec![created]);
        assert_eq!(store.persistence().inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn create_orders_most_recent_first() {
        let (store, clock) = store();
        let first = store.create(draft("B-1", 100)).await.unwrap();
        clock.advance(TimeDelta::minutes(5));
        let second = store.create(draft("B-2", 200)).await.unwrap();
        clock.set(t0() + TimeDelta::minutes(2));
        let middle = store.create(draft("B-3", 300)).await.unwrap();

        let ids: Vec<_> = store.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, middle.id, first.id]);
    }

    #[tokio::test]
    async fn create_with_non_positive_amount_has_no_effect() {
        let (store, _clock) = store();
        for amount in [0, -5] {
            let err = store.create(draft("B-100", amount)).await.unwrap_err();
            assert!(matches!(
                err,
                PaylinkError::Validation(ValidationError::NonPositiveAmount(_))
            ));
        }
        assert!(store.is_empty());
        assert_eq!(store.persistence().inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn create_missing_mobile_is_validation_error() {
        let (store, _clock) = store();
        let incomplete = PaymentRequestDraft {
            customer_mobile: None,
            ..draft("B-100", 500)
        };
        let err = store.create(incomplete).await.unwrap_err();
        assert!(matches!(
            err,
            PaylinkError::Validation(ValidationError::MissingField("customer_mobile"))
        ));
        assert_eq!(store.persistence().inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_insert_leaves_snapshot_untouched() {
        let (store, _clock) = store();
        store.persistence().fail(true);
        let err = store.create(draft("B-100", 500)).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn update_status_marks_paid_and_stamps() {
        let (store, clock) = store();
        let created = store.create(draft("B-100", 500)).await.unwrap();
        clock.advance(TimeDelta::hours(1));

        let paid = store
            .update_status(&created.id, PaymentStatus::Paid)
            .await
            .unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.updated_at, t0() + TimeDelta::hours(1));
        assert_eq!(store.get(&created.id), Some(paid.clone()));
        assert_eq!(store.persistence().inner.stored_requests(), vec![paid]);
    }

    #[tokio::test]
    async fn update_status_unknown_id_is_not_found() {
        let (store, _clock) = store();
        let err = store
            .update_status(&PaymentRequestId::new("missing".to_owned()), PaymentStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, PaylinkError::NotFound(_)));
        assert_eq!(store.persistence().updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn terminal_status_is_absorbing() {
        let (store, _clock) = store();
        let created = store.create(draft("B-100", 500)).await.unwrap();
        let _paid = store
            .update_status(&created.id, PaymentStatus::Paid)
            .await
            .unwrap();

        for target in PaymentStatus::ALL {
            let err = store.update_status(&created.id, target).await.unwrap_err();
            assert!(matches!(
                err,
                PaylinkError::IllegalTransition {
                    from: PaymentStatus::Paid,
                    ..
                }
            ));
        }
        assert_eq!(store.persistence().updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_and_pending_are_not_explicit_targets() {
        let (store, _clock) = store();
        let created = store.create(draft("B-100", 500)).await.unwrap();
        for target in [PaymentStatus::Expired, PaymentStatus::Pending] {
            let err = store.update_status(&created.id, target).await.unwrap_err();
            assert!(matches!(err, PaylinkError::IllegalTransition { .. }));
        }
        assert_eq!(
            store.get(&created.id).map(|r| r.status),
            Some(PaymentStatus::Pending)
        );
    }

    #[tokio::test]
    async fn late_confirmation_wins_over_implied_expiry() {
        let (store, clock) = store();
        let created = store.create(draft("B-100", 500)).await.unwrap();
        clock.advance(TimeDelta::hours(30));
        assert_eq!(created.effective_status(clock.now()), PaymentStatus::Expired);

        let paid = store
            .update_status(&created.id, PaymentStatus::Paid)
            .await
            .unwrap();
        assert_eq!(paid.effective_status(clock.now()), PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn failed_status_write_leaves_snapshot_untouched() {
        let (store, _clock) = store();
        let created = store.create(draft("B-100", 500)).await.unwrap();
        store.persistence().fail(true);

        let err = store
            .update_status(&created.id, PaymentStatus::Failed)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.get(&created.id), Some(created));
    }

    #[tokio::test]
    async fn load_replaces_snapshot_and_normalizes() {
        let older = stored("pr-old", t0());
        let newer = stored("pr-new", t0() + TimeDelta::hours(1));
        let mut broken = stored("pr-bad", t0());
        broken.amount = Decimal::ZERO;
        let mut stale_dup = stored("pr-old", t0());
        stale_dup.updated_at = t0() - TimeDelta::minutes(1);
        stale_dup.bill_no = "stale".to_owned();

        let (store, _clock) = store_over(InMemoryStorage::with_requests(vec![
            older.clone(),
            broken,
            newer.clone(),
            stale_dup,
        ]));
        let report = store.load_from_persistence().await.unwrap();

        assert_eq!(
            report,
            RefreshReport {
                loaded: 2,
                rejected: 1,
                retained_local: 0
            }
        );
        assert_eq!(store.list(), vec![newer, older]);
    }

    #[test]
    fn normalize_keeps_latest_duplicate() {
        let mut first = stored("pr-1", t0());
        first.bill_no = "first".to_owned();
        let mut second = stored("pr-1", t0());
        second.updated_at = t0() + TimeDelta::minutes(10);
        second.bill_no = "second".to_owned();

        let (cleaned, rejected) = normalize(vec![first, second]);
        assert_eq!(rejected, 0);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].bill_no, "second");
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_snapshot() {
        let (store, _clock) = store();
        let created = store.create(draft("B-100", 500)).await.unwrap();
        store.persistence().fail(true);

        let err = store.load_from_persistence().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.list(), vec![created]);
    }

    #[test]
    fn merge_keeps_newer_and_missing_local_records() {
        let fetched_only = stored("pr-remote", t0());
        let mut fetched_stale = stored("pr-shared", t0() + TimeDelta::minutes(1));
        let mut local_newer = fetched_stale.clone();
        local_newer.status = PaymentStatus::Paid;
        local_newer.updated_at = t0() + TimeDelta::hours(2);
        fetched_stale.status = PaymentStatus::Pending;
        let local_only = stored("pr-local", t0() + TimeDelta::hours(3));

        let mut incoming = vec![fetched_stale, fetched_only.clone()];
        let retained = merge_local(&mut incoming, &[local_only.clone(), local_newer.clone()]);

        assert_eq!(retained, 2);
        assert_eq!(incoming, vec![local_only, local_newer, fetched_only]);
    }

    #[test]
    fn merge_prefers_fetched_when_not_older() {
        let fetched = stored("pr-1", t0());
        let mut incoming = vec![fetched.clone()];
        let retained = merge_local(&mut incoming, &[fetched.clone()]);
        assert_eq!(retained, 0);
        assert_eq!(incoming, vec![fetched]);
    }
}
