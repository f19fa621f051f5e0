//! Newtype wrappers for entity identifiers.
//!
//! These prevent accidentally mixing up ids of different entity types
//! at compile time.

use serde::{Deserialize, Serialize};

/// Macro to define a newtype id wrapping a `String`.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from the given string.
            #[inline]
            #[must_use]
            pub const fn new(value: String) -> Self {
                Self(value)
            }

            /// Returns a reference to the inner string.
            #[inline]
            #[must_use]
            pub fn as_inner(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper and returns the inner string.
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

define_string_id! {
    /// Unique identifier for a payment request (UUID string).
    PaymentRequestId
}

define_string_id! {
    /// Unique identifier for an employee.
    EmployeeId
}

define_string_id! {
    /// Unique identifier for an administrator account.
    AdminId
}

/// Generates a fresh random payment request identifier.
#[inline]
#[must_use]
pub(crate) fn generate_payment_request_id() -> PaymentRequestId {
    PaymentRequestId(uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_request_id_is_transparent_in_json() {
        let id = PaymentRequestId::new("550e8400-e29b-41d4-a716-446655440000".to_owned());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""550e8400-e29b-41d4-a716-446655440000""#);
        let deserialized: PaymentRequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn generated_ids_are_unique_uuids() {
        let first = generate_payment_request_id();
        let second = generate_payment_request_id();
        assert_ne!(first, second);
        assert!(uuid::Uuid::parse_str(first.as_inner()).is_ok());
    }

    #[test]
    fn string_id_display() {
        let id = EmployeeId::new("emp-7".to_owned());
        assert_eq!(id.to_string(), "emp-7");
    }

    #[test]
    fn id_from_str_and_into_inner() {
        let id: AdminId = "admin-1".into();
        assert_eq!(id.as_inner(), "admin-1");
        assert_eq!(id.into_inner(), "admin-1");
    }
}
