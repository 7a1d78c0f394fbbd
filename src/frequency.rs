//! Delivery-frequency reference data.
//!
//! A frequency maps a subscription to an interval length in calendar months.
//! Frequencies are immutable once constructed.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Interval at which a subscription regenerates its next order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frequency {
    title: String,
    months_count: u32,
}

impl Frequency {
    /// Creates a frequency after validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrequency`] if the title is blank or the
    /// interval is zero months.
    pub fn new(title: impl Into<String>, months_count: u32) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::InvalidFrequency("title cannot be blank".into()));
        }
        if months_count == 0 {
            return Err(Error::InvalidFrequency("months_count must be at least 1".into()));
        }
        Ok(Self { title, months_count })
    }

    /// Standard one-month frequency.
    #[must_use]
    pub fn monthly() -> Self {
        Self { title: "monthly".to_owned(), months_count: 1 }
    }

    /// Display title (e.g. "monthly", "quarterly").
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Interval length in calendar months.
    #[must_use]
    pub fn months_count(&self) -> u32 {
        self.months_count
    }
}
