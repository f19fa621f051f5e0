//! Data models for payment requests and their collaborators.
//!
//! This module contains the payment request entity and its creation draft,
//! the read-only employee record, the dashboard statistics value object,
//! newtype id wrappers, and enumeration types for constrained values.

mod employee;
mod enums;
mod ids;
mod payment_request;
mod stats;

pub use employee::Employee;
pub use enums::{EmployeeStatus, PaymentStatus, RefreshState, StatusFilter};
pub use ids::{AdminId, EmployeeId, PaymentRequestId};
pub use payment_request::{PaymentRequest, PaymentRequestDraft};
pub use stats::DashboardStats;

/// Re-export of [`rust_decimal::Decimal`] so callers can build amounts
/// without a direct dependency.
pub use rust_decimal::Decimal;
