//! Dashboard statistics value object.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate view over the request snapshot, recomputed on demand.
///
/// All counts are by effective status, so the four buckets always sum to
/// `total_requests`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Number of requests in the snapshot.
    pub total_requests: usize,
    /// Requests whose effective status is paid.
    pub successful_count: usize,
    /// Requests whose effective status is pending.
    pub pending_count: usize,
    /// Requests whose effective status is failed.
    pub failed_count: usize,
    /// Requests whose effective status is expired.
    pub expired_count: usize,
    /// Sum of amounts over paid requests.
    pub total_revenue: Decimal,
    /// Sum of amounts over requests paid within the current local day.
    pub today_revenue: Decimal,
}

impl DashboardStats {
    /// Returns the share of requests that were paid, as a percentage.
    ///
    /// Returns `None` for an empty snapshot.
    #[inline]
    #[must_use]
    pub fn success_rate(&self) -> Option<Decimal> {
        if self.total_requests == 0 {
            return None;
        }
        let paid = Decimal::from(self.successful_count);
        let total = Decimal::from(self.total_requests);
        Some((paid * Decimal::ONE_HUNDRED / total).round_dp(1))
    }
}
