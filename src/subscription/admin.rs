//! Operator-facing cancellation flow.
//!
//! Wraps the plain `Cancel` event with reason bookkeeping: cancellations
//! always carry a reason string, and requests arriving without one get the
//! self-service default.

use tracing::info;

use crate::error::Result;
use crate::notify::Notifier;
use crate::subscription::model::Subscription;
use crate::subscription::renewal::LifecycleEngine;

/// Reason recorded when the subscriber cancels without giving one.
pub const USER_DEFAULT_CANCELLATION_REASON: &str = "Canceled By User";

/// Cancels a subscription, recording why.
///
/// A blank or whitespace-only `reason` falls back to
/// [`USER_DEFAULT_CANCELLATION_REASON`]. The reason is written only if the
/// transition commits; a rejected cancellation leaves the subscription fully
/// unchanged, prior reason included.
///
/// # Errors
///
/// Returns [`Error::IllegalTransition`](crate::error::Error::IllegalTransition)
/// when the subscription cannot be canceled from its current state.
pub fn cancel_with_reason<N: Notifier>(
    engine: &LifecycleEngine<N>,
    subscription: &mut Subscription,
    reason: &str,
) -> Result<()> {
    let reason = match reason.trim() {
        "" => USER_DEFAULT_CANCELLATION_REASON,
        given => given,
    };
    engine.cancel(subscription)?;
    subscription.set_cancellation_reason(Some(reason.to_owned()));
    info!(subscription = subscription.number(), %reason, "cancellation recorded");
    Ok(())
}
