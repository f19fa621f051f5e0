//! Engine configuration.

use chrono::TimeDelta;

use crate::error::{PaylinkError, Result};

/// Default expiry horizon for new payment requests.
pub const DEFAULT_HORIZON_HOURS: i64 = 24;

/// Default base URL payment links are minted under.
pub const DEFAULT_LINK_BASE_URL: &str = "https://pay.example.com";

/// Settings shared by every request created through a store.
///
/// # Examples
///
/// ```
/// use chrono::TimeDelta;
/// use paylink_rs::config::ConsoleConfig;
///
/// let config = ConsoleConfig::new()
///     .horizon(TimeDelta::hours(48))
///     .link_base_url("https://pay.acme.test");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// How long a new request stays payable.
    pub horizon: TimeDelta,
    /// Base URL the payment link is built from.
    pub link_base_url: String,
}

impl Default for ConsoleConfig {
    #[inline]
    fn default() -> Self {
        Self {
            horizon: TimeDelta::hours(DEFAULT_HORIZON_HOURS),
            link_base_url: DEFAULT_LINK_BASE_URL.to_owned(),
        }
    }
}

impl ConsoleConfig {
    /// Creates a configuration with default values.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expiry horizon.
    #[inline]
    #[must_use]
    pub const fn horizon(mut self, horizon: TimeDelta) -> Self {
        self.horizon = horizon;
        self
    }

    /// Sets the payment link base URL.
    #[inline]
    #[must_use]
    pub fn link_base_url<T: Into<String>>(mut self, url: T) -> Self {
        self.link_base_url = url.into();
        self
    }

    /// Checks that the values can produce valid requests.
    ///
    /// # Errors
    ///
    /// Returns [`PaylinkError::Config`] if the horizon is not positive or
    /// the link base URL is blank.
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.horizon <= TimeDelta::zero() {
            return Err(PaylinkError::Config(format!(
                "horizon must be positive, got {}",
                self.horizon
            )));
        }
        if self.link_base_url.trim().is_empty() {
            return Err(PaylinkError::Config("link base URL must not be empty".to_owned()));
        }
        Ok(())
    }
}
