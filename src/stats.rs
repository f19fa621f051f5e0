//! Dashboard aggregation over the request snapshot.
//!
//! Everything here is a pure function of the snapshot, the current instant,
//! and the caller's day window. Results never depend on snapshot order.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::models::{DashboardStats, PaymentRequest, PaymentStatus};

/// Number of requests shown in the dashboard's recent list.
pub const RECENT_LIMIT: usize = 5;

/// Half-open UTC window `[start, end)` covering one calendar day in some
/// time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary {
    /// First instant of the day.
    pub start: DateTime<Utc>,
    /// First instant of the following day.
    pub end: DateTime<Utc>,
}

impl DayBoundary {
    /// Returns the calendar day containing `now` as observed in `tz`.
    #[must_use]
    pub fn for_local_day<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> Self {
        let date = now.with_timezone(tz).date_naive();
        let start = start_of_day(date, tz);
        let end = date
            .succ_opt()
            .map_or(DateTime::<Utc>::MAX_UTC, |next| start_of_day(next, tz));
        Self { start, end }
    }

    /// Returns the day containing `now` in the system's local time zone.
    #[inline]
    #[must_use]
    pub fn local(now: DateTime<Utc>) -> Self {
        Self::for_local_day(now, &Local)
    }

    /// Returns the UTC calendar day containing `now`.
    #[inline]
    #[must_use]
    pub fn utc_day(now: DateTime<Utc>) -> Self {
        Self::for_local_day(now, &Utc)
    }

    /// Returns `true` if `instant` falls inside the window.
    #[inline]
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Resolves local midnight of `date` to UTC.
///
/// When midnight falls in a daylight-saving gap the day starts at the first
/// local time that exists.
fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=8_i64)
        .map(|quarter| midnight + TimeDelta::minutes(quarter * 15))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map_or_else(|| midnight.and_utc(), |resolved| resolved.with_timezone(&Utc))
}

/// Aggregates the snapshot into dashboard figures.
///
/// Buckets are by effective status at `now`. Today's revenue counts paid
/// requests whose `updated_at` lies in `today`. An empty snapshot yields
/// all-zero stats. Revenue sums saturate at [`Decimal::MAX`].
#[must_use]
pub fn compute_stats(
    snapshot: &[PaymentRequest],
    now: DateTime<Utc>,
    today: &DayBoundary,
) -> DashboardStats {
    snapshot.iter().fold(
        DashboardStats {
            total_requests: snapshot.len(),
            ..DashboardStats::default()
        },
        |mut stats, request| {
            match request.effective_status(now) {
                PaymentStatus::Paid => {
                    stats.successful_count += 1;
                    stats.total_revenue = stats.total_revenue.saturating_add(request.amount);
                    if today.contains(request.updated_at) {
                        stats.today_revenue = stats.today_revenue.saturating_add(request.amount);
                    }
                }
                PaymentStatus::Pending => stats.pending_count += 1,
                PaymentStatus::Failed => stats.failed_count += 1,
                PaymentStatus::Expired => stats.expired_count += 1,
            }
            stats
        },
    )
}

/// Returns up to `limit` requests, most recently created first.
#[must_use]
pub fn recent(snapshot: &[PaymentRequest], limit: usize) -> Vec<PaymentRequest> {
    let mut ordered: Vec<&PaymentRequest> = snapshot.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ordered.into_iter().take(limit).cloned().collect()
}

/// Sums amounts of requests whose effective status is `status` at `now`,
/// saturating at [`Decimal::MAX`].
#[must_use]
pub fn amount_by_status(
    snapshot: &[PaymentRequest],
    status: PaymentStatus,
    now: DateTime<Utc>,
) -> Decimal {
    snapshot
        .iter()
        .filter(|request| request.effective_status(now) == status)
        .fold(Decimal::ZERO, |total, request| total.saturating_add(request.amount))
}
