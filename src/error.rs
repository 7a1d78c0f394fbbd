//! Error types for the subscription engine.
//!
//! All errors implement the standard [`std::error::Error`] trait via
//! [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Transition errors** ([`Error::IllegalTransition`]): an event was fired
//!   from a state with no matching transition rule
//! - **Validation errors** ([`Error::Validation`]): the subscription's fields
//!   violate an invariant; carries the accumulated field-level messages
//! - **Uniqueness errors** ([`Error::DuplicateSubscription`]): a variant was
//!   subscribed twice from the same parent order
//! - **Collaborator errors** ([`Error::Order`]): the order workflow engine
//!   reported a failure during regeneration

use std::fmt;

use thiserror::Error;

use crate::subscription::state::{Event, State};

/// Result type alias for subscription operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the subscription engine.
///
/// Renewal failure is deliberately *not* represented here: a renewal attempt
/// that produces no completed order is an expected outcome routed to the
/// `Paused` state, not an error surfaced to the caller.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum Error {
    /// An event was fired from a state with no matching transition rule.
    ///
    /// The subscription is left unchanged. This is also the mutual-exclusion
    /// mechanism for renewals: a second `Renew` on a subscription already in
    /// `Processing` fails here rather than queueing.
    #[error("illegal transition: event {event} is not valid from state {state}")]
    IllegalTransition {
        /// State the subscription was in when the event was fired.
        state: State,
        /// Event that was rejected.
        event: Event,
    },

    /// The subscription's fields violate an invariant.
    ///
    /// Blocks the commit of the triggering change; the subscription is left
    /// unchanged and the caller receives every failing field, not just the
    /// first.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// A variant was subscribed twice from the same parent order.
    ///
    /// The (parent order, variant) pair is unique: one originating order may
    /// carry at most one subscription per variant.
    #[error("variant {variant} is already subscribed from order {parent_order}")]
    DuplicateSubscription {
        /// Number of the originating order.
        parent_order: String,
        /// Variant already subscribed from that order.
        variant: String,
    },

    /// Frequency reference data was rejected.
    ///
    /// A frequency must have a non-empty title and an interval of at least
    /// one month.
    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),

    /// A subscription or order number failed format validation.
    #[error("invalid number: {0}")]
    InvalidNumber(String),

    /// The order workflow collaborator reported a failure.
    ///
    /// Surfaced directly only by the raw pipeline API; the lifecycle engine
    /// folds it into the renewal-failed outcome instead.
    #[error("order workflow error: {0}")]
    Order(String),
}

/// Accumulated field-level validation messages.
///
/// Mirrors the shape callers of the admin cancellation flow expect: every
/// failing field is reported, and [`fmt::Display`] joins them with commas so
/// the whole set reads as one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

/// A single field-level validation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the offending field.
    pub field: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl ValidationErrors {
    /// Creates an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failing field.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError { field, message: message.into() });
    }

    /// Returns true if no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the recorded field errors.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Converts the accumulated set into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns `Err(self)` if any field failed.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for e in &self.errors {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", e.field, e.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_transition_display() {
        let error = Error::IllegalTransition { state: State::Canceled, event: Event::Renew };
        assert_eq!(
            error.to_string(),
            "illegal transition: event renew is not valid from state canceled"
        );
    }

    #[test]
    fn test_validation_errors_join_with_commas() {
        let mut errors = ValidationErrors::new();
        errors.add("price", "must be greater than or equal to 0");
        errors.add("quantity", "must be greater than 0");
        assert_eq!(
            errors.to_string(),
            "price must be greater than or equal to 0, quantity must be greater than 0"
        );
    }

    #[test]
    fn test_validation_errors_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.add("source", "must be present while active");
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.errors()[0].field, "source");
    }

    #[test]
    fn test_duplicate_subscription_display() {
        let error = Error::DuplicateSubscription {
            parent_order: "R123".to_owned(),
            variant: "V9".to_owned(),
        };
        assert!(error.to_string().contains("already subscribed"));
    }
}
