//! Payment-request lifecycle and aggregation engine.
//!
//! This crate tracks payment-collection requests from creation to
//! settlement. A request is created pending with a fixed expiry horizon,
//! is settled as paid or failed by an explicit write, and otherwise lapses
//! to expired lazily at read time. On top of the request snapshot it
//! derives dashboard statistics and search/filter views.
//!
//! ```rust
//! use paylink_rs::console::PaymentConsole;
//! use paylink_rs::models::{AdminId, Decimal, PaymentRequestDraft, PaymentStatus};
//! use paylink_rs::storage::InMemoryStorage;
//!
//! # async fn demo() -> paylink_rs::error::Result<()> {
//! let console = PaymentConsole::builder()
//!     .persistence(InMemoryStorage::new())
//!     .directory(InMemoryStorage::new())
//!     .operator(AdminId::new("admin-1".to_owned()))
//!     .build()?;
//!
//! let request = console
//!     .create(
//!         PaymentRequestDraft::new()
//!             .bill_no("B-100")
//!             .amount(Decimal::from(500))
//!             .customer_mobile("9000000001"),
//!     )
//!     .await?;
//! let paid = console.mark_paid(&request.id).await?;
//! assert_eq!(paid.status, PaymentStatus::Paid);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod console;
pub mod error;
pub mod expiry;
pub mod models;
pub mod refresh;
pub mod search;
pub mod stats;
pub mod storage;
pub mod store;
