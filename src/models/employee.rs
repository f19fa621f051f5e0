//! Employee model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AdminId, EmployeeId, EmployeeStatus};

/// A collection agent a payment request can be attributed to.
///
/// Employees are owned by an external directory; this crate only reads
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier.
    pub id: EmployeeId,
    /// Full display name.
    pub full_name: String,
    /// Email address.
    pub email: String,
    /// Contact number.
    pub mobile_number: String,
    /// UPI handle payments are collected to.
    pub upi_id: String,
    /// Approval state.
    pub status: EmployeeStatus,
    /// Free-form role label.
    pub role: String,
    /// Administrator who registered the employee.
    pub created_by: AdminId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// Returns `true` if the employee can be assigned new requests.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, EmployeeStatus::Active)
    }
}
