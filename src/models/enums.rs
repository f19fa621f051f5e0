//! Enumeration types for constrained values.

use serde::{Deserialize, Serialize};

/// Status of a payment request.
///
/// The same type describes both the persisted status and the effective
/// status derived from it (see [`crate::expiry::effective_status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting payment; the only initial state.
    Pending,
    /// Settled by the customer.
    Paid,
    /// Payment attempt failed.
    Failed,
    /// Lapsed without payment.
    Expired,
}

impl PaymentStatus {
    /// All statuses, in dashboard order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Paid, Self::Failed, Self::Expired];

    /// Returns `true` for absorbing states that accept no further writes.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns `true` if this status may be written explicitly by
    /// [`crate::store::PaymentRequestStore::update_status`].
    ///
    /// Expiry is never written; it is always derived from time.
    #[inline]
    #[must_use]
    pub const fn is_explicit_target(self) -> bool {
        matches!(self, Self::Paid | Self::Failed)
    }

    /// Returns the lowercase wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }
}

impl core::fmt::Display for PaymentStatus {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PaymentStatus {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown payment status `{other}`")),
        }
    }
}

/// Status filter applied by [`crate::search::PaymentQuery`].
///
/// Matching is always against the effective status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// Matches every request.
    #[default]
    All,
    /// Effective status is pending.
    Pending,
    /// Effective status is paid.
    Paid,
    /// Effective status is failed.
    Failed,
    /// Effective status is expired.
    Expired,
}

impl StatusFilter {
    /// Returns `true` if a request with the given effective status passes.
    #[inline]
    #[must_use]
    pub const fn matches(self, effective: PaymentStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => matches!(effective, PaymentStatus::Pending),
            Self::Paid => matches!(effective, PaymentStatus::Paid),
            Self::Failed => matches!(effective, PaymentStatus::Failed),
            Self::Expired => matches!(effective, PaymentStatus::Expired),
        }
    }
}

impl From<PaymentStatus> for StatusFilter {
    #[inline]
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => Self::Pending,
            PaymentStatus::Paid => Self::Paid,
            PaymentStatus::Failed => Self::Failed,
            PaymentStatus::Expired => Self::Expired,
        }
    }
}

impl core::str::FromStr for StatusFilter {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<PaymentStatus>().map(Self::from)
    }
}

/// Approval state of an employee, owned by the external directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    /// Registered, awaiting approval.
    Pending,
    /// Approved and assignable.
    Active,
    /// Blocked by an administrator.
    Blocked,
}

/// Observable state of the [`crate::refresh::RefreshCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshState {
    /// No fetch in flight.
    Idle,
    /// A fetch from the persistence collaborator is in flight.
    Refreshing,
}
