//! The subscription entity.
//!
//! A subscription ties a variant from a completed parent order to a delivery
//! frequency and a payment source, then accumulates state as the lifecycle
//! engine drives it. All mutation goes through state-machine-gated
//! operations; the record is never deleted, cancellation just parks it in a
//! terminal state for audit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::Address;
use crate::error::{Error, Result, ValidationErrors};
use crate::frequency::Frequency;
use crate::order::{GeneratedOrderRecord, OrderSeed, VariantId};
use crate::payment::PaymentSource;
use crate::subscription::schedule::{self, DEFAULT_DELIVERY_NUMBER};
use crate::subscription::state::State;

/// Unique subscription number, prefix `S` followed by nine decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionNumber(String);

impl SubscriptionNumber {
    /// Generates a fresh number.
    #[must_use]
    pub fn generate() -> Self {
        let digits = Uuid::new_v4().as_u128() % 1_000_000_000;
        Self(format!("S{digits:09}"))
    }

    /// Parses an existing number, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNumber`] unless the value is `S` followed by
    /// exactly nine ASCII digits.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let digits = value.strip_prefix('S').unwrap_or_default();
        if digits.len() != 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidNumber(format!(
                "{value:?} is not an S-prefixed nine-digit subscription number"
            )));
        }
        Ok(Self(value))
    }

    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Attributes supplied when a customer subscribes an item.
///
/// Everything else on [`Subscription`] is derived or accumulated by the
/// lifecycle engine.
#[derive(Debug, Clone)]
pub struct SubscriptionAttributes {
    /// Recurring price per delivery.
    pub price: Decimal,
    /// Units per delivery.
    pub quantity: u32,
    /// Total deliveries contracted; defaults to
    /// [`DEFAULT_DELIVERY_NUMBER`] when `None`.
    pub delivery_number: Option<u32>,
    /// The recurring variant.
    pub variant: VariantId,
    /// Delivery frequency.
    pub frequency: Frequency,
    /// Snapshot of the originating order.
    pub parent_order: OrderSeed,
    /// Shipping address, copied (not shared) from the parent order.
    pub ship_address: Address,
    /// Billing address, copied (not shared) from the parent order.
    pub bill_address: Address,
    /// Payment instrument; optional until activation.
    pub source: Option<PaymentSource>,
}

/// A recurring-delivery subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    number: SubscriptionNumber,
    price: Decimal,
    quantity: u32,
    delivery_number: u32,
    state: State,
    next_occurrence_at: Option<DateTime<Utc>>,
    activated_at: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    /// Accumulated active time in seconds, persisted across transitions.
    active_duration_snapshot: i64,
    cancellation_reason: Option<String>,
    variant: VariantId,
    frequency: Frequency,
    parent_order: OrderSeed,
    ship_address: Address,
    bill_address: Address,
    source: Option<PaymentSource>,
    generated_orders: Vec<GeneratedOrderRecord>,
}

impl Subscription {
    /// Creates a pending subscription after validating its terms.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] carrying every failing field if the
    /// commercial terms violate an invariant.
    pub fn create(attributes: SubscriptionAttributes) -> Result<Self> {
        let subscription = Self {
            number: SubscriptionNumber::generate(),
            price: attributes.price,
            quantity: attributes.quantity,
            delivery_number: attributes.delivery_number.unwrap_or(DEFAULT_DELIVERY_NUMBER),
            state: State::Pending,
            next_occurrence_at: None,
            activated_at: None,
            paused_at: None,
            canceled_at: None,
            active_duration_snapshot: 0,
            cancellation_reason: None,
            variant: attributes.variant,
            frequency: attributes.frequency,
            parent_order: attributes.parent_order,
            ship_address: attributes.ship_address,
            bill_address: attributes.bill_address,
            source: attributes.source,
            generated_orders: Vec::new(),
        };
        subscription.validate()?;
        Ok(subscription)
    }

    /// Validates the invariants the current state requires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] accumulating every failing field:
    /// negative price, zero quantity, and, while active, a missing next
    /// occurrence or payment source.
    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        if self.price.is_sign_negative() {
            errors.add("price", "must be greater than or equal to 0");
        }
        if self.quantity == 0 {
            errors.add("quantity", "must be greater than 0");
        }
        if self.delivery_number == 0 {
            errors.add("delivery_number", "must be greater than 0");
        }
        if self.state.is_active() {
            if self.next_occurrence_at.is_none() && self.deliveries_remaining() {
                errors.add("next_occurrence_at", "must be present while active");
            }
            if self.source.is_none() {
                errors.add("source", "must be present while active");
            }
        }
        errors.into_result().map_err(Error::Validation)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Subscription number.
    #[must_use]
    pub fn number(&self) -> &str {
        self.number.as_str()
    }

    /// Recurring price per delivery.
    #[must_use]
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Units per delivery.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Total deliveries contracted.
    #[must_use]
    pub fn delivery_number(&self) -> u32 {
        self.delivery_number
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// True while the subscriber is owed deliveries.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Next scheduled occurrence, `None` once deliveries are exhausted or
    /// before activation.
    #[must_use]
    pub fn next_occurrence_at(&self) -> Option<DateTime<Utc>> {
        self.next_occurrence_at
    }

    /// Most recent entry into an active state.
    #[must_use]
    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }

    /// When the last renewal failure parked the subscription.
    #[must_use]
    pub fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
    }

    /// When cancellation was requested.
    #[must_use]
    pub fn canceled_at(&self) -> Option<DateTime<Utc>> {
        self.canceled_at
    }

    /// Reason supplied through the cancellation flow, if any.
    #[must_use]
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// The recurring variant.
    #[must_use]
    pub fn variant(&self) -> &VariantId {
        &self.variant
    }

    /// Delivery frequency.
    #[must_use]
    pub fn frequency(&self) -> &Frequency {
        &self.frequency
    }

    /// Snapshot of the originating order.
    #[must_use]
    pub fn parent_order(&self) -> &OrderSeed {
        &self.parent_order
    }

    /// Owned shipping address.
    #[must_use]
    pub fn ship_address(&self) -> &Address {
        &self.ship_address
    }

    /// Owned billing address.
    #[must_use]
    pub fn bill_address(&self) -> &Address {
        &self.bill_address
    }

    /// Edits the owned shipping address. Independent of the parent order's.
    pub fn set_ship_address(&mut self, address: Address) {
        self.ship_address = address;
    }

    /// Edits the owned billing address. Independent of the parent order's.
    pub fn set_bill_address(&mut self, address: Address) {
        self.bill_address = address;
    }

    /// Payment instrument, if attached.
    #[must_use]
    pub fn source(&self) -> Option<&PaymentSource> {
        self.source.as_ref()
    }

    /// Attaches or replaces the payment instrument.
    pub fn set_source(&mut self, source: PaymentSource) {
        self.source = Some(source);
    }

    /// Orders produced by the regeneration pipeline, creation ordered.
    #[must_use]
    pub fn generated_orders(&self) -> &[GeneratedOrderRecord] {
        &self.generated_orders
    }

    // ------------------------------------------------------------------
    // Delivery accounting
    // ------------------------------------------------------------------

    /// Count of generated orders that reached completion.
    #[must_use]
    pub fn completed_order_count(&self) -> usize {
        self.generated_orders.iter().filter(|o| o.completed).count()
    }

    /// Renewal deliveries still owed (signed).
    #[must_use]
    pub fn number_of_deliveries_left(&self) -> i64 {
        schedule::deliveries_left(self.delivery_number, self.completed_order_count())
    }

    /// True while at least one renewal delivery is owed.
    #[must_use]
    pub fn deliveries_remaining(&self) -> bool {
        schedule::deliveries_remaining(self.delivery_number, self.completed_order_count())
    }

    /// Cumulative wall-clock seconds spent in an active state.
    ///
    /// Accrues from the snapshot while active, frozen at the snapshot
    /// otherwise.
    #[must_use]
    pub fn active_duration(&self) -> i64 {
        if self.is_active()
            && let Some(activated_at) = self.activated_at
        {
            self.active_duration_snapshot + (Utc::now() - activated_at).num_seconds()
        } else {
            self.active_duration_snapshot
        }
    }

    // ------------------------------------------------------------------
    // Engine-internal mutation (hook targets)
    // ------------------------------------------------------------------

    pub(crate) fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub(crate) fn set_activated_at(&mut self, at: DateTime<Utc>) {
        self.activated_at = Some(at);
    }

    pub(crate) fn set_activated_at_if_unset(&mut self, at: DateTime<Utc>) {
        if self.activated_at.is_none() {
            self.activated_at = Some(at);
        }
    }

    pub(crate) fn set_canceled_at(&mut self, at: DateTime<Utc>) {
        self.canceled_at = Some(at);
    }

    pub(crate) fn set_paused_at(&mut self, at: DateTime<Utc>) {
        self.paused_at = Some(at);
    }

    pub(crate) fn schedule_next_occurrence(&mut self, now: DateTime<Utc>) {
        self.next_occurrence_at = schedule::next_occurrence(
            &self.frequency,
            self.delivery_number,
            self.completed_order_count(),
            now,
        );
    }

    /// Folds elapsed active time into the snapshot and re-bases the accrual
    /// clock. Called by the engine whenever an active state is left.
    pub(crate) fn snapshot_active_duration(&mut self, now: DateTime<Utc>) {
        if let Some(activated_at) = self.activated_at {
            self.active_duration_snapshot += (now - activated_at).num_seconds();
            self.activated_at = Some(now);
        }
    }

    pub(crate) fn set_cancellation_reason(&mut self, reason: Option<String>) {
        self.cancellation_reason = reason;
    }

    pub(crate) fn push_generated_order(&mut self, record: GeneratedOrderRecord) {
        self.generated_orders.push(record);
    }

    #[cfg(test)]
    pub(crate) fn force_state(&mut self, state: State) {
        self.state = state;
    }

    #[cfg(test)]
    pub(crate) fn force_activated_at(&mut self, at: DateTime<Utc>) {
        self.activated_at = Some(at);
    }
}

/// Read view of a subscription for serialized consumers.
///
/// `enabled` and `paused` are the flag names storefront clients knew before
/// the lifecycle moved to an explicit state column; they are derived here.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView<'a> {
    /// Subscription number.
    pub number: &'a str,
    /// True while the subscription is in an active state.
    pub enabled: bool,
    /// True while the subscription sits in the paused state.
    pub paused: bool,
    /// Next scheduled occurrence.
    pub next_occurrence_at: Option<DateTime<Utc>>,
    /// The recurring variant.
    pub variant: &'a VariantId,
    /// Delivery frequency.
    pub frequency: &'a Frequency,
}

impl<'a> From<&'a Subscription> for SubscriptionView<'a> {
    fn from(subscription: &'a Subscription) -> Self {
        Self {
            number: subscription.number(),
            enabled: subscription.is_active(),
            paused: subscription.state() == State::Paused,
            next_occurrence_at: subscription.next_occurrence_at(),
            variant: subscription.variant(),
            frequency: subscription.frequency(),
        }
    }
}

/// In-memory collection of subscriptions enforcing the
/// (parent order, variant) uniqueness invariant.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateSubscription`] if the variant is already
    /// subscribed from the same parent order.
    pub fn register(&mut self, subscription: Subscription) -> Result<&Subscription> {
        let duplicate = self.subscriptions.iter().any(|s| {
            s.parent_order().number == subscription.parent_order().number
                && s.variant() == subscription.variant()
        });
        if duplicate {
            return Err(Error::DuplicateSubscription {
                parent_order: subscription.parent_order().number.clone(),
                variant: subscription.variant().as_str().to_owned(),
            });
        }
        self.subscriptions.push(subscription);
        // Just pushed, the collection is non-empty.
        Ok(&self.subscriptions[self.subscriptions.len() - 1])
    }

    /// All registered subscriptions.
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, Subscription> {
        self.subscriptions.iter()
    }

    /// Mutable handle by number, for the renewal driver.
    pub fn get_mut(&mut self, number: &str) -> Option<&mut Subscription> {
        self.subscriptions.iter_mut().find(|s| s.number() == number)
    }

    /// Subscriptions sitting in pending or paused, i.e. awaiting payment.
    pub fn awaiting_payment(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| matches!(s.state(), State::Pending | State::Paused))
    }

    /// Active, never-canceled subscriptions.
    pub fn processable(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| s.is_active() && s.canceled_at().is_none())
    }

    /// Processable subscriptions whose next occurrence is due at `now`.
    ///
    /// Records with no forward occurrence are exhausted and excluded.
    pub fn eligible_for_renewal(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Subscription> {
        self.processable()
            .filter(move |s| s.next_occurrence_at().is_some_and(|at| at <= now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pending_attributes, pending_subscription};

    // ========================================================================
    // SubscriptionNumber Tests
    // ========================================================================

    #[test]
    fn test_number_format() {
        let number = SubscriptionNumber::generate();
        assert!(number.as_str().starts_with('S'));
        assert_eq!(number.as_str().len(), 10);
    }

    #[test]
    fn test_number_parse_valid() {
        let number = SubscriptionNumber::parse("S123456789").unwrap();
        assert_eq!(number.as_str(), "S123456789");
    }

    #[test]
    fn test_number_parse_rejects_bad_prefix() {
        assert!(SubscriptionNumber::parse("R123456789").is_err());
    }

    #[test]
    fn test_number_parse_rejects_short_digits() {
        assert!(SubscriptionNumber::parse("S12345").is_err());
    }

    // ========================================================================
    // Validation Tests
    // ========================================================================

    #[test]
    fn test_create_pending_subscription() {
        let subscription = pending_subscription();
        assert_eq!(subscription.state(), State::Pending);
        assert_eq!(subscription.quantity(), 2);
        assert!(subscription.activated_at().is_none());
        assert!(subscription.generated_orders().is_empty());
    }

    #[test]
    fn test_create_rejects_negative_price() {
        let mut attributes = pending_attributes();
        attributes.price = Decimal::new(-100, 2);
        let err = Subscription::create(attributes).unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_create_rejects_zero_quantity() {
        let mut attributes = pending_attributes();
        attributes.quantity = 0;
        let err = Subscription::create(attributes).unwrap_err();
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn test_create_accumulates_all_failures() {
        let mut attributes = pending_attributes();
        attributes.price = Decimal::new(-1, 0);
        attributes.quantity = 0;
        let Error::Validation(errors) = Subscription::create(attributes).unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.errors().len(), 2);
    }

    #[test]
    fn test_active_requires_source_and_occurrence() {
        let mut subscription = pending_subscription();
        subscription.source = None;
        subscription.force_state(State::ActiveAndRenewable);

        let Error::Validation(errors) = subscription.validate().unwrap_err() else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field).collect();
        assert!(fields.contains(&"next_occurrence_at"));
        assert!(fields.contains(&"source"));
    }

    #[test]
    fn test_delivery_number_defaults_to_sentinel() {
        let mut attributes = pending_attributes();
        attributes.delivery_number = None;
        let subscription = Subscription::create(attributes).unwrap();
        assert_eq!(subscription.delivery_number(), DEFAULT_DELIVERY_NUMBER);
    }

    // ========================================================================
    // Active Duration Tests
    // ========================================================================

    #[test]
    fn test_active_duration_frozen_when_inactive() {
        let subscription = pending_subscription();
        assert_eq!(subscription.active_duration(), 0);
    }

    #[test]
    fn test_active_duration_accrues_while_active() {
        let mut subscription = pending_subscription();
        subscription.force_state(State::ActiveAndRenewable);
        subscription.force_activated_at(Utc::now() - chrono::Duration::seconds(90));

        let duration = subscription.active_duration();
        assert!(duration >= 90);
    }

    #[test]
    fn test_snapshot_folds_and_rebases() {
        let mut subscription = pending_subscription();
        subscription.force_state(State::ActiveAndRenewable);
        let now = Utc::now();
        subscription.force_activated_at(now - chrono::Duration::seconds(120));

        subscription.snapshot_active_duration(now);

        assert_eq!(subscription.active_duration_snapshot, 120);
        assert_eq!(subscription.activated_at(), Some(now));
    }

    // ========================================================================
    // View Tests
    // ========================================================================

    #[test]
    fn test_view_reflects_state_flags() {
        let mut subscription = pending_subscription();
        subscription.force_state(State::Paused);

        let view = SubscriptionView::from(&subscription);
        assert!(!view.enabled);
        assert!(view.paused);

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"paused\":true"));
        assert!(json.contains("\"months_count\""));
    }

    // ========================================================================
    // Registry Tests
    // ========================================================================

    #[test]
    fn test_registry_rejects_duplicate_pair() {
        let mut registry = SubscriptionRegistry::new();
        registry.register(pending_subscription()).unwrap();

        let err = registry.register(pending_subscription()).unwrap_err();
        assert!(matches!(err, Error::DuplicateSubscription { .. }));
    }

    #[test]
    fn test_registry_allows_same_variant_from_other_order() {
        let mut registry = SubscriptionRegistry::new();
        registry.register(pending_subscription()).unwrap();

        let mut attributes = pending_attributes();
        attributes.parent_order.number = "R000000099".to_owned();
        registry.register(Subscription::create(attributes).unwrap()).unwrap();

        assert_eq!(registry.iter().count(), 2);
    }

    #[test]
    fn test_registry_eligibility_excludes_exhausted() {
        let mut registry = SubscriptionRegistry::new();
        let mut due = pending_subscription();
        due.force_state(State::ActiveAndRenewable);
        due.next_occurrence_at = Some(Utc::now() - chrono::Duration::days(1));
        registry.register(due).unwrap();

        let mut exhausted = {
            let mut attributes = pending_attributes();
            attributes.parent_order.number = "R000000050".to_owned();
            Subscription::create(attributes).unwrap()
        };
        exhausted.force_state(State::ActiveAndRenewable);
        exhausted.next_occurrence_at = None;
        registry.register(exhausted).unwrap();

        assert_eq!(registry.eligible_for_renewal(Utc::now()).count(), 1);
    }
}
