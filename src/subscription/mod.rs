//! Subscription domain: entity, lifecycle state machine, scheduling,
//! renewal, and the cancellation flow.

pub mod admin;
pub mod model;
pub mod renewal;
pub mod schedule;
pub mod state;


pub use admin::{USER_DEFAULT_CANCELLATION_REASON, cancel_with_reason};
pub use model::{
    Subscription, SubscriptionAttributes, SubscriptionNumber, SubscriptionRegistry,
    SubscriptionView,
};
pub use renewal::{LifecycleEngine, RenewalOutcome, regenerate_order};
pub use schedule::DEFAULT_DELIVERY_NUMBER;
pub use state::{Event, Hook, State, TransitionRule, TransitionTable};
