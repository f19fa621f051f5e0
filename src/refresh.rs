//! Coalesced snapshot refresh.
//!
//! [`RefreshCoordinator`] reloads a [`PaymentRequestStore`] from its
//! persistence collaborator. Callers that arrive while a refresh is in
//! flight wait for it and receive its outcome instead of issuing another
//! fetch.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::error::Result;
use crate::models::RefreshState;
use crate::storage::PersistenceCollaborator;
use crate::store::{PaymentRequestStore, RefreshReport};

/// Serializes refreshes and shares in-flight results.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    /// Held for the duration of a fetch; stores the outcome of the most
    /// recent one.
    last: Mutex<Option<Result<RefreshReport>>>,
    /// Number of refreshes that have completed.
    completed: AtomicU64,
    /// Set while a fetch is outstanding.
    refreshing: AtomicBool,
}

impl RefreshCoordinator {
    /// Creates an idle coordinator.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a refresh is currently in flight.
    #[inline]
    #[must_use]
    pub fn state(&self) -> RefreshState {
        if self.refreshing.load(Ordering::Acquire) {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Reloads `store` from its persistence collaborator.
    ///
    /// If another refresh is already running, waits for it and returns a
    /// copy of its result without fetching again. The coordinator is back
    /// to [`RefreshState::Idle`] when this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error. The store keeps its previous
    /// snapshot.
    #[tracing::instrument(skip_all)]
    pub async fn refresh<P, C>(&self, store: &PaymentRequestStore<P, C>) -> Result<RefreshReport>
    where
        P: PersistenceCollaborator,
        C: Clock,
    {
        let observed = self.completed.load(Ordering::Acquire);
        let mut last = self.last.lock().await;
        if self.completed.load(Ordering::Acquire) != observed
            && let Some(result) = last.as_ref()
        {
            tracing::trace!("joined in-flight refresh");
            return result.clone();
        }

        self.refreshing.store(true, Ordering::Release);
        let _flag = RefreshingFlag(&self.refreshing);

        let result = store.load_from_persistence().await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "refresh failed, keeping previous snapshot");
        }
        *last = Some(result.clone());
        let _previous = self.completed.fetch_add(1, Ordering::AcqRel);
        result
    }
}

/// Clears the refreshing flag when dropped, including on cancellation.
struct RefreshingFlag<'flag>(&'flag AtomicBool);

impl Drop for RefreshingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use core::future::Future;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use chrono::{DateTime, TimeDelta, Utc};
    use rust_decimal::Decimal;
    use tokio::sync::Notify;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ConsoleConfig;
    use crate::error::PaylinkError;
    use crate::models::{
        AdminId, PaymentRequest, PaymentRequestDraft, PaymentRequestId, PaymentStatus,
    };
    use crate::storage::InMemoryStorage;

    /// Collaborator whose fetches block until released.
    #[derive(Debug, Default)]
    struct GatedStorage {
        /// Backing data.
        inner: InMemoryStorage,
        /// Releases one pending fetch per permit.
        gate: Notify,
        /// Number of fetches started.
        fetches: AtomicUsize,
        /// When set, fetches fail after being released.
        failing: AtomicBool,
    }

    impl PersistenceCollaborator for GatedStorage {
        fn fetch_all(&self) -> impl Future<Output = Result<Vec<PaymentRequest>>> + Send {
            let _count = self.fetches.fetch_add(1, Ordering::SeqCst);
            let records = self.inner.stored_requests();
            async move {
                self.gate.notified().await;
                if self.failing.load(Ordering::SeqCst) {
                    return Err(PaylinkError::persistence("connection reset"));
                }
                Ok(records)
            }
        }

        fn insert(&self, request: &PaymentRequest) -> impl Future<Output = Result<()>> + Send {
            self.inner.insert(request)
        }

        fn update_status(
            &self,
            id: &PaymentRequestId,
            status: PaymentStatus,
            updated_at: DateTime<Utc>,
        ) -> impl Future<Output = Result<()>> + Send {
            self.inner.update_status(id, status, updated_at)
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn stored(id: &str) -> PaymentRequest {
        PaymentRequest {
            id: PaymentRequestId::new(id.to_owned()),
            bill_no: format!("B-{id}"),
            amount: Decimal::from(250),
            customer_name: None,
            customer_mobile: "9000000001".to_owned(),
            customer_email: None,
            employee_id: None,
            status: PaymentStatus::Pending,
            payment_link: format!("https://pay.example.com/{id}"),
            created_by: AdminId::new("admin-1".to_owned()),
            created_at: t0(),
            updated_at: t0(),
            expires_at: t0() + TimeDelta::hours(24),
        }
    }

    fn store_with(
        requests: Vec<PaymentRequest>,
    ) -> PaymentRequestStore<GatedStorage, Arc<ManualClock>> {
        let persistence = GatedStorage {
            inner: InMemoryStorage::with_requests(requests),
            ..GatedStorage::default()
        };
        PaymentRequestStore::with_clock(
            persistence,
            Arc::new(ManualClock::new(t0() + TimeDelta::hours(1))),
            ConsoleConfig::default(),
        )
        .unwrap()
    }

    /// Waits until `count` fetches have started, then releases one.
    async fn release_after(storage: &GatedStorage, count: usize) {
        while storage.fetches.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
        storage.gate.notify_one();
    }

    #[test]
    fn starts_idle() {
        assert_eq!(RefreshCoordinator::new().state(), RefreshState::Idle);
    }

    #[tokio::test]
    async fn concurrent_refreshes_share_one_fetch() {
        let store = store_with(vec![stored("pr-1"), stored("pr-2")]);
        let coordinator = RefreshCoordinator::new();

        let release = async {
            while store.persistence().fetches.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            assert_eq!(coordinator.state(), RefreshState::Refreshing);
            store.persistence().gate.notify_one();
        };
        let (first, second, ()) = tokio::join!(
            coordinator.refresh(&store),
            coordinator.refresh(&store),
            release
        );

        assert_eq!(store.persistence().fetches.load(Ordering::SeqCst), 1);
        let first = first.unwrap();
        assert_eq!(first.loaded, 2);
        assert_eq!(second.unwrap(), first);
        assert_eq!(coordinator.state(), RefreshState::Idle);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn sequential_refreshes_fetch_again() {
        let store = store_with(vec![stored("pr-1")]);
        let coordinator = RefreshCoordinator::new();

        let (first, ()) = tokio::join!(
            coordinator.refresh(&store),
            release_after(store.persistence(), 1)
        );
        assert_eq!(first.unwrap().loaded, 1);

        store
            .persistence()
            .inner
            .insert(&stored("pr-2"))
            .await
            .unwrap();
        let (second, ()) = tokio::join!(
            coordinator.refresh(&store),
            release_after(store.persistence(), 2)
        );
        assert_eq!(second.unwrap().loaded, 2);
        assert_eq!(store.persistence().fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_is_shared_and_keeps_snapshot() {
        let store = store_with(vec![stored("pr-1")]);
        let coordinator = RefreshCoordinator::new();
        let (seeded, ()) = tokio::join!(
            coordinator.refresh(&store),
            release_after(store.persistence(), 1)
        );
        let _report = seeded.unwrap();
        let before = store.list();

        store.persistence().failing.store(true, Ordering::SeqCst);
        let (first, second, ()) = tokio::join!(
            coordinator.refresh(&store),
            coordinator.refresh(&store),
            release_after(store.persistence(), 2)
        );

        match (first, second) {
            (Err(PaylinkError::Persistence(a)), Err(PaylinkError::Persistence(b))) => {
                assert!(Arc::ptr_eq(&a, &b));
            }
            other => panic!("expected shared persistence error, got {other:?}"),
        }
        assert_eq!(store.persistence().fetches.load(Ordering::SeqCst), 2);
        assert_eq!(store.list(), before);
        assert_eq!(coordinator.state(), RefreshState::Idle);
    }

    #[tokio::test]
    async fn local_create_during_fetch_survives() {
        let store = store_with(vec![stored("pr-1")]);
        let coordinator = RefreshCoordinator::new();

        let create_then_release = async {
            while store.persistence().fetches.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
            let created = store
                .create(
                    PaymentRequestDraft::new()
                        .bill_no("B-NEW")
                        .amount(Decimal::from(900))
                        .customer_mobile("9000000009")
                        .created_by(AdminId::new("admin-1".to_owned())),
                )
                .await
                .unwrap();
            store.persistence().gate.notify_one();
            created
        };
        let (report, created) = tokio::join!(coordinator.refresh(&store), create_then_release);

        let report = report.unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(report.retained_local, 1);
        assert_eq!(store.get(&created.id), Some(created));
    }
}
