//! Payment request model and creation draft.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::generate_payment_request_id;
use super::{AdminId, EmployeeId, PaymentRequestId, PaymentStatus};
use crate::error::ValidationError;

/// A request for payment tied to a bill and a customer.
///
/// `status` is the *persisted* status. Views and aggregates must go through
/// [`PaymentRequest::effective_status`], which also accounts for lapsed
/// expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Unique identifier, assigned at creation.
    pub id: PaymentRequestId,
    /// Operator-supplied bill reference.
    pub bill_no: String,
    /// Amount to collect (> 0).
    pub amount: Decimal,
    /// Customer display name.
    pub customer_name: Option<String>,
    /// Customer contact number.
    pub customer_mobile: String,
    /// Customer email address.
    pub customer_email: Option<String>,
    /// Employee the request is attributed to (lookup key only).
    pub employee_id: Option<EmployeeId>,
    /// Persisted status.
    pub status: PaymentStatus,
    /// Shareable payment link.
    pub payment_link: String,
    /// Administrator who created the request.
    pub created_by: AdminId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last persisted mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Moment after which a pending request is treated as expired.
    pub expires_at: DateTime<Utc>,
}

impl PaymentRequest {
    /// Returns the status to display and aggregate on at `now`.
    #[inline]
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> PaymentStatus {
        crate::expiry::effective_status(self, now)
    }

    /// Checks the creation invariants on a record of unknown provenance.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonPositiveAmount`] or
    /// [`ValidationError::ExpiryNotAfterCreation`].
    #[inline]
    pub fn check_invariants(&self) -> Result<(), ValidationError> {
        if self.amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(self.amount));
        }
        if self.expires_at <= self.created_at {
            return Err(ValidationError::ExpiryNotAfterCreation);
        }
        Ok(())
    }
}

/// Operator input for creating a [`PaymentRequest`].
///
/// Required fields are optional here so that absent input can be reported
/// as a [`ValidationError`] instead of failing to construct.
///
/// # Examples
///
/// ```
/// use paylink_rs::models::{AdminId, PaymentRequestDraft};
/// use rust_decimal::Decimal;
///
/// let draft = PaymentRequestDraft::new()
///     .bill_no("B-100")
///     .amount(Decimal::from(500))
///     .customer_mobile("9000000001")
///     .customer_name("Asha")
///     .created_by(AdminId::new("admin-1".to_owned()));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PaymentRequestDraft {
    /// Bill reference (required).
    pub bill_no: Option<String>,
    /// Amount to collect (required, > 0).
    pub amount: Option<Decimal>,
    /// Customer contact number (required).
    pub customer_mobile: Option<String>,
    /// Customer display name.
    pub customer_name: Option<String>,
    /// Customer email address.
    pub customer_email: Option<String>,
    /// Employee to attribute the request to.
    pub employee_id: Option<EmployeeId>,
    /// Creating administrator (required).
    pub created_by: Option<AdminId>,
    /// Per-request expiry horizon; the store default applies when unset.
    pub horizon: Option<TimeDelta>,
}

impl PaymentRequestDraft {
    /// Creates an empty draft.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bill reference.
    #[inline]
    #[must_use]
    pub fn bill_no<T: Into<String>>(mut self, bill_no: T) -> Self {
        self.bill_no = Some(bill_no.into());
        self
    }

    /// Sets the amount to collect.
    #[inline]
    #[must_use]
    pub const fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Sets the customer contact number.
    #[inline]
    #[must_use]
    pub fn customer_mobile<T: Into<String>>(mut self, mobile: T) -> Self {
        self.customer_mobile = Some(mobile.into());
        self
    }

    /// Sets the customer display name.
    #[inline]
    #[must_use]
    pub fn customer_name<T: Into<String>>(mut self, name: T) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    /// Sets the customer email address.
    #[inline]
    #[must_use]
    pub fn customer_email<T: Into<String>>(mut self, email: T) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    /// Attributes the request to an employee.
    #[inline]
    #[must_use]
    pub fn employee(mut self, id: EmployeeId) -> Self {
        self.employee_id = Some(id);
        self
    }

    /// Sets the creating administrator.
    #[inline]
    #[must_use]
    pub fn created_by(mut self, admin: AdminId) -> Self {
        self.created_by = Some(admin);
        self
    }

    /// Overrides the expiry horizon for this request.
    #[inline]
    #[must_use]
    pub const fn horizon(mut self, horizon: TimeDelta) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Validates the draft and builds a pending request created at `now`.
    ///
    /// The payment link is `{link_base}/{id}`. Blank optional strings are
    /// stored as absent.
    pub(crate) fn into_request(
        self,
        now: DateTime<Utc>,
        default_horizon: TimeDelta,
        link_base: &str,
    ) -> Result<PaymentRequest, ValidationError> {
        let bill_no = required(self.bill_no, "bill_no")?;
        let amount = self.amount.ok_or(ValidationError::MissingField("amount"))?;
        let customer_mobile = required(self.customer_mobile, "customer_mobile")?;
        let created_by = self
            .created_by
            .filter(|admin| !admin.as_inner().trim().is_empty())
            .ok_or(ValidationError::MissingField("created_by"))?;
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount(amount));
        }
        let horizon = self.horizon.unwrap_or(default_horizon);
        if horizon <= TimeDelta::zero() {
            return Err(ValidationError::NonPositiveHorizon);
        }
        let expires_at = now
            .checked_add_signed(horizon)
            .ok_or(ValidationError::ExpiryNotAfterCreation)?;

        let id = generate_payment_request_id();
        let payment_link = format!("{}/{id}", link_base.trim_end_matches('/'));
        Ok(PaymentRequest {
            id,
            bill_no,
            amount,
            customer_name: optional(self.customer_name),
            customer_mobile,
            customer_email: optional(self.customer_email),
            employee_id: self
                .employee_id
                .filter(|employee| !employee.as_inner().trim().is_empty()),
            status: PaymentStatus::Pending,
            payment_link,
            created_by,
            created_at: now,
            updated_at: now,
            expires_at,
        })
    }
}

/// Trims a required field, treating blank input as absent.
fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    optional(value).ok_or(ValidationError::MissingField(field))
}

/// Trims an optional field, mapping blank input to `None`.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_owned())
        .filter(|trimmed| !trimmed.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn complete_draft() -> PaymentRequestDraft {
        PaymentRequestDraft::new()
            .bill_no("B-100")
            .amount(Decimal::from(500))
            .customer_mobile("9000000001")
            .created_by(AdminId::new("admin-1".to_owned()))
    }

    #[test]
    fn draft_builds_pending_request() {
        let request = complete_draft()
            .customer_name("Asha")
            .into_request(t0(), TimeDelta::hours(24), "https://pay.example.com/")
            .unwrap();
        assert_eq!(request.status, PaymentStatus::Pending);
        assert_eq!(request.created_at, t0());
        assert_eq!(request.updated_at, t0());
        assert_eq!(request.expires_at, t0() + TimeDelta::hours(24));
        assert_eq!(
            request.payment_link,
            format!("https://pay.example.com/{}", request.id)
        );
        assert_eq!(request.customer_name.as_deref(), Some("Asha"));
        request.check_invariants().unwrap();
    }

    #[test]
    fn draft_horizon_overrides_default() {
        let request = complete_draft()
            .horizon(TimeDelta::hours(2))
            .into_request(t0(), TimeDelta::hours(24), "https://pay.example.com")
            .unwrap();
        assert_eq!(request.expires_at, t0() + TimeDelta::hours(2));
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let no_bill = PaymentRequestDraft {
            bill_no: None,
            ..complete_draft()
        };
        assert_eq!(
            no_bill.into_request(t0(), TimeDelta::hours(24), "x"),
            Err(ValidationError::MissingField("bill_no"))
        );

        let no_amount = PaymentRequestDraft {
            amount: None,
            ..complete_draft()
        };
        assert_eq!(
            no_amount.into_request(t0(), TimeDelta::hours(24), "x"),
            Err(ValidationError::MissingField("amount"))
        );

        let blank_mobile = complete_draft().customer_mobile("   ");
        assert_eq!(
            blank_mobile.into_request(t0(), TimeDelta::hours(24), "x"),
            Err(ValidationError::MissingField("customer_mobile"))
        );
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        for amount in [Decimal::ZERO, Decimal::from(-5)] {
            let result = complete_draft()
                .amount(amount)
                .into_request(t0(), TimeDelta::hours(24), "x");
            assert_eq!(result, Err(ValidationError::NonPositiveAmount(amount)));
        }
    }

    #[test]
    fn non_positive_horizon_is_rejected() {
        let result = complete_draft()
            .horizon(TimeDelta::zero())
            .into_request(t0(), TimeDelta::hours(24), "x");
        assert_eq!(result, Err(ValidationError::NonPositiveHorizon));
    }

    #[test]
    fn blank_optional_fields_become_absent() {
        let request = complete_draft()
            .customer_name("")
            .customer_email("  ")
            .employee(EmployeeId::new(String::new()))
            .into_request(t0(), TimeDelta::hours(24), "x")
            .unwrap();
        assert_eq!(request.customer_name, None);
        assert_eq!(request.customer_email, None);
        assert_eq!(request.employee_id, None);
    }

    #[test]
    fn check_invariants_flags_bad_records() {
        let mut request = complete_draft()
            .into_request(t0(), TimeDelta::hours(24), "x")
            .unwrap();
        request.expires_at = request.created_at;
        assert_eq!(
            request.check_invariants(),
            Err(ValidationError::ExpiryNotAfterCreation)
        );
        request.expires_at = request.created_at + TimeDelta::hours(1);
        request.amount = Decimal::ZERO;
        assert_eq!(
            request.check_invariants(),
            Err(ValidationError::NonPositiveAmount(Decimal::ZERO))
        );
    }

    #[test]
    fn deserialize_stored_row() {
        let json = r#"{
            "id": "pr-001",
            "bill_no": "B-100",
            "amount": 500,
            "customer_name": null,
            "customer_mobile": "9000000001",
            "customer_email": null,
            "employee_id": "emp-1",
            "status": "pending",
            "payment_link": "https://pay.example.com/pr-001",
            "created_by": "admin-1",
            "created_at": "2024-01-15T10:00:00Z",
            "updated_at": "2024-01-15T10:00:00Z",
            "expires_at": "2024-01-16T10:00:00Z"
        }"#;
        let request: PaymentRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.amount, Decimal::from(500));
        assert_eq!(request.status, PaymentStatus::Pending);
        assert_eq!(request.employee_id, Some(EmployeeId::new("emp-1".to_owned())));
        request.check_invariants().unwrap();
    }
}
