//! Lazy expiry: derives the effective status of a request at read time.
//!
//! A pending request whose horizon has passed is reported as expired even
//! though nothing was written back. Every consumer (aggregation, search,
//! display) goes through [`effective_status`] instead of reading
//! [`PaymentRequest::status`] directly.

use chrono::{DateTime, TimeDelta, Utc};

use crate::models::{PaymentRequest, PaymentStatus};

/// Returns the status a request has at `now`.
///
/// Pending requests are expired once `now` is strictly after `expires_at`;
/// at exactly `expires_at` they are still pending. Terminal statuses are
/// returned unchanged.
#[inline]
#[must_use]
pub fn effective_status(request: &PaymentRequest, now: DateTime<Utc>) -> PaymentStatus {
    match request.status {
        PaymentStatus::Pending if now > request.expires_at => PaymentStatus::Expired,
        persisted => persisted,
    }
}

/// Returns `true` if the request has lapsed by time alone at `now`.
///
/// Explicitly written terminal statuses (including a persisted `expired`)
/// do not count.
#[inline]
#[must_use]
pub fn is_expired_at(request: &PaymentRequest, now: DateTime<Utc>) -> bool {
    request.status == PaymentStatus::Pending && now > request.expires_at
}

/// Returns how long a pending request has left before it lapses.
///
/// `None` once the request is no longer effectively pending.
#[inline]
#[must_use]
pub fn time_remaining(request: &PaymentRequest, now: DateTime<Utc>) -> Option<TimeDelta> {
    (effective_status(request, now) == PaymentStatus::Pending)
        .then(|| request.expires_at.signed_duration_since(now))
}
