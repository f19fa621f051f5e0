//! Text and status queries over the request snapshot.

use chrono::{DateTime, Utc};

use crate::models::{PaymentRequest, StatusFilter};

/// Query for narrowing the request list.
///
/// Both criteria must hold. The default query matches every request.
///
/// # Examples
///
/// ```
/// use paylink_rs::models::StatusFilter;
/// use paylink_rs::search::PaymentQuery;
///
/// let query = PaymentQuery::new()
///     .search("b-100")
///     .status(StatusFilter::Expired);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PaymentQuery {
    /// Case-insensitive substring matched against bill number, customer
    /// mobile, and customer name. Empty matches everything.
    pub search: String,
    /// Effective-status filter.
    pub status: StatusFilter,
}

impl PaymentQuery {
    /// Creates a query that matches every request.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search text.
    #[inline]
    #[must_use]
    pub fn search<T: Into<String>>(mut self, text: T) -> Self {
        self.search = text.into();
        self
    }

    /// Sets the status filter.
    #[inline]
    #[must_use]
    pub const fn status(mut self, filter: StatusFilter) -> Self {
        self.status = filter;
        self
    }

    /// Returns `true` if `request` satisfies the query at `now`.
    #[inline]
    #[must_use]
    pub fn matches(&self, request: &PaymentRequest, now: DateTime<Utc>) -> bool {
        self.status.matches(request.effective_status(now))
            && matches_text(&self.search.to_lowercase(), request)
    }
}

/// Checks the lowercased needle against the searchable fields.
fn matches_text(needle: &str, request: &PaymentRequest) -> bool {
    needle.is_empty()
        || request.bill_no.to_lowercase().contains(needle)
        || request.customer_mobile.to_lowercase().contains(needle)
        || request
            .customer_name
            .as_ref()
            .is_some_and(|name| name.to_lowercase().contains(needle))
}

/// Returns the requests matching `query`, in snapshot order.
#[must_use]
pub fn query(
    snapshot: &[PaymentRequest],
    query: &PaymentQuery,
    now: DateTime<Utc>,
) -> Vec<PaymentRequest> {
    let needle = query.search.to_lowercase();
    snapshot
        .iter()
        .filter(|request| {
            query.status.matches(request.effective_status(now)) && matches_text(&needle, request)
        })
        .cloned()
        .collect()
}
