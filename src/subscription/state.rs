//! Subscription lifecycle state machine.
//!
//! The machine is data, not code paths: a table of
//! `(state, event) -> (target, before-hooks, after-hooks)` rows validated at
//! construction. Firing an event with no matching row is an illegal
//! transition, never a silent no-op. Two rules cut across every row and are
//! enforced by the engine rather than listed per row:
//!
//! - leaving an active state snapshots accumulated active duration before the
//!   transition completes;
//! - entering `Canceled` fires the cancellation notification exactly once,
//!   whichever row got there. Table validation rejects rows that try to carry
//!   that notification themselves.
//!
//! `Processing` doubles as the renewal mutual-exclusion mechanism: a second
//! `Renew` on a subscription already in `Processing` finds no matching row
//! and is rejected.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::notify::NotificationKind;

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Created, not yet activated.
    Pending,
    /// Active with renewals still owed.
    ActiveAndRenewable,
    /// Cancellation requested; one final delivery cycle remains.
    ///
    /// The grace state exists so canceling does not strand an already
    /// scheduled delivery: the subscriber finishes the current cycle and only
    /// `Terminate` moves the record to `Canceled`.
    ActiveOneLastPeriod,
    /// A renewal attempt is in flight.
    Processing,
    /// Last renewal failed; eligible for retry on a later cycle.
    Paused,
    /// Terminal. The record persists for audit.
    Canceled,
}

impl State {
    /// True for the states in which the subscriber is owed deliveries.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::ActiveAndRenewable | Self::ActiveOneLastPeriod)
    }

    /// True once no further event can move the subscription.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::Canceled
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::ActiveAndRenewable => "active_and_renewable",
            Self::ActiveOneLastPeriod => "active_one_last_period",
            Self::Processing => "processing",
            Self::Paused => "paused",
            Self::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// Lifecycle event fired at a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// Begin deliveries on a pending subscription.
    Activate,
    /// User-initiated cancellation.
    Cancel,
    /// Close out the final grace-period delivery.
    Terminate,
    /// Start a renewal attempt.
    Renew,
    /// A renewal attempt produced a completed order.
    RenewSuccess,
    /// A renewal attempt produced no completed order.
    RenewFailed,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Activate => "activate",
            Self::Cancel => "cancel",
            Self::Terminate => "terminate",
            Self::Renew => "renew",
            Self::RenewSuccess => "renew_success",
            Self::RenewFailed => "renew_failed",
        };
        f.write_str(name)
    }
}

/// Side effect attached to a transition row.
///
/// Hooks mutate subscription fields or enqueue notifications; the engine
/// applies them inside the same atomic unit as the state change itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// Set `activated_at` to now.
    SetActivatedAt,
    /// Set `activated_at` to now only if it is unset.
    SetActivatedAtIfUnset,
    /// Recompute `next_occurrence_at` (None once deliveries are exhausted).
    ScheduleNextOccurrence,
    /// Set `canceled_at` to now.
    SetCanceledAt,
    /// Set `paused_at` to now.
    SetPausedAt,
    /// Enqueue one notification of the given kind.
    Notify(NotificationKind),
}

/// One row of the transition table.
#[derive(Debug, Clone)]
pub struct TransitionRule {
    /// State the event is legal from.
    pub from: State,
    /// Event this row matches.
    pub event: Event,
    /// State the subscription moves to.
    pub to: State,
    /// Hooks applied before the state change.
    pub before: Vec<Hook>,
    /// Hooks applied after the state change.
    pub after: Vec<Hook>,
}

/// The validated transition table.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    rules: Vec<TransitionRule>,
}

impl TransitionTable {
    /// Builds a table from explicit rules, validating determinism.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalTransition`] naming the offending pair if two
    /// rules share a `(state, event)` pair. Rows carrying the cancellation
    /// notification are rejected the same way: that notification is owned by
    /// the enter-`Canceled` rule so it fires exactly once on every path.
    pub fn new(rules: Vec<TransitionRule>) -> Result<Self> {
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.from == rule.from && r.event == rule.event) {
                return Err(Error::IllegalTransition { state: rule.from, event: rule.event });
            }
            let duplicates_cancellation = rule
                .before
                .iter()
                .chain(&rule.after)
                .any(|h| *h == Hook::Notify(NotificationKind::Cancellation));
            if duplicates_cancellation {
                return Err(Error::IllegalTransition { state: rule.from, event: rule.event });
            }
        }
        Ok(Self { rules })
    }

    /// The standard subscription lifecycle.
    ///
    /// `Renew` carries no hooks of its own: the regeneration pipeline is
    /// driven by the engine between `Renew` and the follow-up
    /// `RenewSuccess`/`RenewFailed` event, never from inside the table.
    #[must_use]
    pub fn standard() -> Self {
        // The standard rows are a fixed, known-valid shape; tests run them
        // through `new` to keep that claim honest.
        Self { rules: standard_rules() }
    }

    /// Looks up the rule for `(state, event)`.
    #[must_use]
    pub fn find(&self, state: State, event: Event) -> Option<&TransitionRule> {
        self.rules.iter().find(|r| r.from == state && r.event == event)
    }

    /// Events legal from `state`, in table order.
    #[must_use]
    pub fn legal_events(&self, state: State) -> Vec<Event> {
        self.rules.iter().filter(|r| r.from == state).map(|r| r.event).collect()
    }
}

fn standard_rules() -> Vec<TransitionRule> {
    use Hook::{
        Notify, ScheduleNextOccurrence, SetActivatedAt, SetActivatedAtIfUnset, SetCanceledAt,
        SetPausedAt,
    };

    vec![
        TransitionRule {
            from: State::Pending,
            event: Event::Activate,
            to: State::ActiveAndRenewable,
            before: vec![],
            after: vec![SetActivatedAt, ScheduleNextOccurrence, Notify(NotificationKind::Start)],
        },
        TransitionRule {
            from: State::ActiveAndRenewable,
            event: Event::Cancel,
            to: State::ActiveOneLastPeriod,
            before: vec![SetActivatedAtIfUnset, Notify(NotificationKind::LastPeriod)],
            after: vec![SetCanceledAt],
        },
        TransitionRule {
            from: State::Paused,
            event: Event::Cancel,
            to: State::Canceled,
            before: vec![],
            after: vec![SetCanceledAt],
        },
        TransitionRule {
            from: State::ActiveOneLastPeriod,
            event: Event::Terminate,
            to: State::Canceled,
            before: vec![],
            after: vec![],
        },
        TransitionRule {
            from: State::ActiveAndRenewable,
            event: Event::Renew,
            to: State::Processing,
            before: vec![],
            after: vec![],
        },
        TransitionRule {
            from: State::Paused,
            event: Event::Renew,
            to: State::Processing,
            before: vec![],
            after: vec![],
        },
        TransitionRule {
            from: State::Processing,
            event: Event::RenewSuccess,
            to: State::ActiveAndRenewable,
            before: vec![],
            after: vec![SetActivatedAt, ScheduleNextOccurrence, Notify(NotificationKind::Renewal)],
        },
        TransitionRule {
            from: State::Processing,
            event: Event::RenewFailed,
            to: State::Paused,
            before: vec![],
            after: vec![SetPausedAt, Notify(NotificationKind::Failure)],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // State Predicate Tests
    // ========================================================================

    #[test]
    fn test_active_predicate() {
        assert!(State::ActiveAndRenewable.is_active());
        assert!(State::ActiveOneLastPeriod.is_active());
        assert!(!State::Pending.is_active());
        assert!(!State::Processing.is_active());
        assert!(!State::Paused.is_active());
        assert!(!State::Canceled.is_active());
    }

    #[test]
    fn test_terminal_predicate() {
        assert!(State::Canceled.is_terminal());
        assert!(!State::Paused.is_terminal());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&State::ActiveOneLastPeriod).unwrap();
        assert_eq!(json, "\"active_one_last_period\"");
    }

    // ========================================================================
    // Table Construction Tests
    // ========================================================================

    #[test]
    fn test_standard_table_is_well_formed() {
        let table = TransitionTable::standard();
        assert!(table.find(State::Pending, Event::Activate).is_some());
        assert!(table.find(State::Canceled, Event::Renew).is_none());
    }

    #[test]
    fn test_standard_rules_pass_validation() {
        assert!(TransitionTable::new(standard_rules()).is_ok());
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let rule = |event| TransitionRule {
            from: State::Pending,
            event,
            to: State::ActiveAndRenewable,
            before: vec![],
            after: vec![],
        };
        let result = TransitionTable::new(vec![rule(Event::Activate), rule(Event::Activate)]);
        assert!(matches!(
            result.unwrap_err(),
            Error::IllegalTransition { state: State::Pending, event: Event::Activate }
        ));
    }

    #[test]
    fn test_cancellation_notify_in_row_rejected() {
        let result = TransitionTable::new(vec![TransitionRule {
            from: State::Paused,
            event: Event::Cancel,
            to: State::Canceled,
            before: vec![],
            after: vec![Hook::Notify(NotificationKind::Cancellation)],
        }]);
        assert!(result.is_err());
    }

    // ========================================================================
    // Table Shape Tests
    // ========================================================================

    #[test]
    fn test_renew_legal_only_from_active_renewable_and_paused() {
        let table = TransitionTable::standard();
        let legal: Vec<State> = [
            State::Pending,
            State::ActiveAndRenewable,
            State::ActiveOneLastPeriod,
            State::Processing,
            State::Paused,
            State::Canceled,
        ]
        .into_iter()
        .filter(|s| table.find(*s, Event::Renew).is_some())
        .collect();
        assert_eq!(legal, vec![State::ActiveAndRenewable, State::Paused]);
    }

    #[test]
    fn test_cancel_from_active_lands_in_grace() {
        let table = TransitionTable::standard();
        let rule = table.find(State::ActiveAndRenewable, Event::Cancel).unwrap();
        assert_eq!(rule.to, State::ActiveOneLastPeriod);
    }

    #[test]
    fn test_cancel_from_paused_lands_in_canceled() {
        let table = TransitionTable::standard();
        let rule = table.find(State::Paused, Event::Cancel).unwrap();
        assert_eq!(rule.to, State::Canceled);
    }

    #[test]
    fn test_canceled_state_accepts_no_events() {
        let table = TransitionTable::standard();
        assert!(table.legal_events(State::Canceled).is_empty());
    }

    #[test]
    fn test_processing_only_accepts_renewal_outcomes() {
        let table = TransitionTable::standard();
        assert_eq!(
            table.legal_events(State::Processing),
            vec![Event::RenewSuccess, Event::RenewFailed]
        );
    }
}
