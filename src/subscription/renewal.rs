//! Order regeneration pipeline and the lifecycle engine driving it.
//!
//! The engine is the only writer of subscription state. Firing an event
//! looks up the transition table, applies hooks and cross-cutting rules to a
//! scratch clone, validates the clone, and commits it over the original in
//! one step; a failure anywhere leaves the original untouched and enqueues
//! nothing. Notifications collected during hook application are dispatched
//! only after the commit.
//!
//! Renewal is a three-beat sequence: `Renew` moves the subscription into
//! `Processing` (rejecting concurrent attempts), the pipeline runs against
//! the checkout collaborator with no subscription state change, and the
//! boolean outcome is translated into `RenewSuccess` or `RenewFailed` only
//! after the pipeline has fully returned. The engine never retries
//! individual steps; a paused subscription is simply renewed again wholesale
//! on a later cycle.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::notify::{NotificationKind, Notifier};
use crate::order::{GeneratedOrderRecord, OrderFactory, OrderWorkflow};
use crate::payment::{Payment, PaymentMethodId};
use crate::subscription::model::Subscription;
use crate::subscription::state::{Event, Hook, State, TransitionTable};

/// Outcome of one renewal attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// A new order was produced and reached completion.
    Renewed(GeneratedOrderRecord),
    /// No deliveries remain on the contract; nothing was created.
    Exhausted,
    /// The attempt produced no completed order.
    ///
    /// Carries the stalled order's record when one was created; the artifact
    /// is retained on the subscription rather than rolled back.
    Stalled {
        /// Record of the incomplete order, if the factory produced one.
        order: Option<GeneratedOrderRecord>,
        /// Why the attempt stopped.
        reason: String,
    },
}

impl RenewalOutcome {
    /// True only for [`RenewalOutcome::Renewed`].
    #[must_use]
    pub fn is_renewed(&self) -> bool {
        matches!(self, Self::Renewed(_))
    }
}

/// Drives subscriptions through their lifecycle.
pub struct LifecycleEngine<N: Notifier> {
    table: TransitionTable,
    notifier: N,
}

impl<N: Notifier> std::fmt::Debug for LifecycleEngine<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine").finish_non_exhaustive()
    }
}

impl<N: Notifier> LifecycleEngine<N> {
    /// Creates an engine over the standard transition table.
    #[must_use]
    pub fn new(notifier: N) -> Self {
        Self { table: TransitionTable::standard(), notifier }
    }

    /// Creates an engine over a custom, pre-validated table.
    #[must_use]
    pub fn with_table(table: TransitionTable, notifier: N) -> Self {
        Self { table, notifier }
    }

    /// The notifier this engine dispatches through.
    #[must_use]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Activates a pending subscription.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalTransition`] unless pending, or
    /// [`Error::Validation`] if activation leaves required fields missing
    /// (for example, no payment source attached).
    pub fn activate(&self, subscription: &mut Subscription) -> Result<()> {
        self.fire(subscription, Event::Activate)
    }

    /// Cancels a subscription.
    ///
    /// From an active state this enters the one-last-period grace state; from
    /// paused it cancels outright.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalTransition`] from any other state.
    pub fn cancel(&self, subscription: &mut Subscription) -> Result<()> {
        self.fire(subscription, Event::Cancel)
    }

    /// Closes out the grace period once its final delivery is confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalTransition`] unless the subscription is in the
    /// grace state.
    pub fn terminate(&self, subscription: &mut Subscription) -> Result<()> {
        self.fire(subscription, Event::Terminate)
    }

    /// Runs one full renewal attempt.
    ///
    /// Moves the subscription into `Processing`, runs the regeneration
    /// pipeline, records any produced order, and settles the subscription
    /// into `ActiveAndRenewable` (success) or `Paused` (anything else).
    /// Collaborator failures inside the pipeline are folded into the paused
    /// outcome, not propagated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalTransition`] when the subscription is not
    /// renewable, including when a concurrent attempt already holds it in
    /// `Processing`.
    #[instrument(skip_all, fields(subscription = subscription.number()))]
    pub fn renew<F: OrderFactory>(
        &self,
        subscription: &mut Subscription,
        factory: &mut F,
        store_credit_methods: &[PaymentMethodId],
    ) -> Result<RenewalOutcome> {
        self.fire(subscription, Event::Renew)?;

        let outcome = regenerate_order(subscription, factory, store_credit_methods);

        match &outcome {
            RenewalOutcome::Renewed(record) => {
                subscription.push_generated_order(record.clone());
                info!(order = %record.number, "renewal produced completed order");
                self.fire(subscription, Event::RenewSuccess)?;
            }
            RenewalOutcome::Exhausted => {
                info!("no deliveries remaining, renewal attempt ends");
                self.fire(subscription, Event::RenewFailed)?;
            }
            RenewalOutcome::Stalled { order, reason } => {
                if let Some(record) = order {
                    subscription.push_generated_order(record.clone());
                }
                warn!(%reason, "renewal stalled, pausing subscription");
                self.fire(subscription, Event::RenewFailed)?;
            }
        }
        Ok(outcome)
    }

    /// Fires a raw lifecycle event.
    ///
    /// The guard lookup, state change, hook updates, and validation all apply
    /// to a scratch clone that replaces the subscription only on success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalTransition`] when no rule matches, or
    /// [`Error::Validation`] when the post-transition record is invalid. The
    /// subscription is unchanged in both cases.
    pub fn fire(&self, subscription: &mut Subscription, event: Event) -> Result<()> {
        let state = subscription.state();
        let Some(rule) = self.table.find(state, event) else {
            warn!(
                subscription = subscription.number(),
                %state,
                %event,
                "illegal transition rejected"
            );
            return Err(Error::IllegalTransition { state, event });
        };

        let now = Utc::now();
        let mut scratch = subscription.clone();
        let mut pending = Vec::new();

        for hook in &rule.before {
            apply_hook(&mut scratch, *hook, now, &mut pending);
        }
        // Cross-cutting: leaving an active state folds elapsed time into the
        // duration snapshot before the transition completes.
        if state.is_active() {
            scratch.snapshot_active_duration(now);
        }
        scratch.set_state(rule.to);
        for hook in &rule.after {
            apply_hook(&mut scratch, *hook, now, &mut pending);
        }
        // Cross-cutting: entering the terminal state notifies cancellation
        // exactly once, whichever row got here.
        if rule.to == State::Canceled && state != State::Canceled {
            pending.push(NotificationKind::Cancellation);
        }

        scratch.validate()?;
        *subscription = scratch;

        info!(subscription = subscription.number(), %state, to = %rule.to, %event, "transition committed");
        for kind in pending {
            self.notifier.notify(kind, subscription);
        }
        Ok(())
    }
}

fn apply_hook(
    subscription: &mut Subscription,
    hook: Hook,
    now: chrono::DateTime<Utc>,
    pending: &mut Vec<NotificationKind>,
) {
    match hook {
        Hook::SetActivatedAt => subscription.set_activated_at(now),
        Hook::SetActivatedAtIfUnset => subscription.set_activated_at_if_unset(now),
        Hook::ScheduleNextOccurrence => subscription.schedule_next_occurrence(now),
        Hook::SetCanceledAt => subscription.set_canceled_at(now),
        Hook::SetPausedAt => subscription.set_paused_at(now),
        Hook::Notify(kind) => pending.push(kind),
    }
}

/// Builds one regenerated order for the subscription.
///
/// Pure with respect to the subscription: reads its terms, never mutates it.
/// Collaborator errors after order creation are folded into a
/// [`RenewalOutcome::Stalled`] carrying the artifact's record, so the caller
/// always learns about orders that were created.
pub fn regenerate_order<F: OrderFactory>(
    subscription: &Subscription,
    factory: &mut F,
    store_credit_methods: &[PaymentMethodId],
) -> RenewalOutcome {
    if !subscription.deliveries_remaining() {
        return RenewalOutcome::Exhausted;
    }

    let mut order = match factory.create_order(subscription.parent_order()) {
        Ok(order) => order,
        Err(e) => {
            return RenewalOutcome::Stalled { order: None, reason: e.to_string() };
        }
    };
    let created_at = Utc::now();

    let stalled = |order: &F::Order, reason: String| RenewalOutcome::Stalled {
        order: Some(GeneratedOrderRecord {
            number: order.number().to_owned(),
            created_at,
            total: order.total(),
            completed: false,
        }),
        reason,
    };

    match run_steps(subscription, &mut order, store_credit_methods) {
        Ok(()) if order.is_complete() => RenewalOutcome::Renewed(GeneratedOrderRecord {
            number: order.number().to_owned(),
            created_at,
            total: order.total(),
            completed: true,
        }),
        Ok(()) => stalled(&order, "order did not reach completion".to_owned()),
        Err(e) => stalled(&order, e.to_string()),
    }
}

/// The fixed step sequence of the pipeline.
fn run_steps<W: OrderWorkflow>(
    subscription: &Subscription,
    order: &mut W,
    store_credit_methods: &[PaymentMethodId],
) -> Result<()> {
    // 1. Contents.
    order.add_item(subscription.variant(), subscription.quantity())?;
    order.advance()?;
    debug!(order = order.number(), "variant added");

    // 2. Addresses: independent clones of the subscription's own copies.
    if order.is_address_step() {
        order.set_ship_address(subscription.ship_address().clone());
        order.set_bill_address(subscription.bill_address().clone());
        order.advance()?;
        debug!(order = order.number(), "addresses copied");
    }

    // 3. Delivery method carry-over, best-effort.
    if order.is_delivery_step() {
        if let Some(method) = &subscription.parent_order().shipping_method
            && !order.shipments().is_empty()
        {
            for shipment in order.shipments_mut() {
                shipment.select_method(method);
            }
            debug!(order = order.number(), "parent shipping method applied");
        }
        order.advance()?;
    }

    // 4. Shipment costs.
    order.set_shipments_cost();

    // 5. Payment.
    let source = subscription
        .source()
        .ok_or_else(|| Error::Order("subscription has no payment source".into()))?;
    let method = source
        .resolve_payment_method(store_credit_methods)
        .ok_or_else(|| Error::Order("no payment method available for source".into()))?;
    if let Some(payment) = order.payment_mut() {
        payment.source = source.clone();
        payment.payment_method = method;
    } else {
        let amount = order.total();
        order.add_payment(Payment {
            source: source.clone(),
            payment_method: method,
            amount,
            created_at: Utc::now(),
        });
    }
    order.advance()?;
    debug!(order = order.number(), "payment attached");

    // 6. Confirmation.
    if order.can_confirm() {
        order.advance()?;
    }
    Ok(())
}
