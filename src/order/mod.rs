//! Order workflow collaborator contracts.
//!
//! The checkout engine that owns orders lives outside this crate. The
//! regeneration pipeline only depends on the narrow slice of its behavior
//! specified here: adding items, stepping the workflow forward, addresses,
//! shipments and their rates, payments, and the completed check.
//!
//! [`memory`] ships a complete in-memory implementation of these contracts.
//! It is what the test suite drives, and it doubles as executable
//! documentation of what the pipeline expects from a real checkout engine.

pub mod memory;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::Result;
use crate::payment::Payment;

/// Identifier of a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId(pub String);

impl VariantId {
    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a shipping method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShippingMethodId(pub String);

/// A shipping rate proposed on a shipment.
///
/// Exactly one rate per shipment is expected to carry `selected = true` once
/// the delivery step has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingRate {
    /// Shipping method this rate belongs to.
    pub shipping_method: ShippingMethodId,
    /// Cost of shipping at this rate.
    pub cost: Decimal,
    /// Whether this rate is the one currently chosen for the shipment.
    pub selected: bool,
}

/// A shipment on an order, carrying its candidate shipping rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    /// Rates the checkout engine proposed for this shipment.
    pub shipping_rates: Vec<ShippingRate>,
}

impl Shipment {
    /// Returns the currently selected rate, if any.
    #[must_use]
    pub fn selected_rate(&self) -> Option<&ShippingRate> {
        self.shipping_rates.iter().find(|r| r.selected)
    }

    /// Selects the rate matching `method`, deselecting the current one.
    ///
    /// Best-effort: if no rate matches, or the matching rate is already
    /// selected, nothing changes. Returns true if the selection moved.
    pub fn select_method(&mut self, method: &ShippingMethodId) -> bool {
        let already = self
            .selected_rate()
            .is_some_and(|r| &r.shipping_method == method);
        if already || !self.shipping_rates.iter().any(|r| &r.shipping_method == method) {
            return false;
        }
        for rate in &mut self.shipping_rates {
            rate.selected = &rate.shipping_method == method;
        }
        true
    }
}

/// Snapshot of the originating order's attributes a regenerated order is
/// seeded from.
///
/// Captured once at subscription time so the pipeline never has to reach back
/// into the checkout engine for the parent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSeed {
    /// Number of the originating order.
    pub number: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Guest token, for subscriptions created without an account.
    pub guest_token: Option<String>,
    /// Store the order was placed against.
    pub store_id: String,
    /// User who placed the order, when authenticated.
    pub user_id: Option<String>,
    /// Creator of the regenerated orders (same user in practice).
    pub created_by: Option<String>,
    /// Last IP address seen on the originating order.
    pub last_ip_address: Option<String>,
    /// Shipping method selected on the originating order's first shipment.
    ///
    /// Used by the delivery step to carry the subscriber's chosen method over
    /// to regenerated orders, best-effort.
    pub shipping_method: Option<ShippingMethodId>,
}

/// Record of an order produced by the regeneration pipeline.
///
/// Appended to the subscription for every attempt that created an order,
/// whether or not the order reached completion. Stalled artifacts are
/// retained for audit rather than deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedOrderRecord {
    /// Order number assigned by the checkout engine.
    pub number: String,
    /// When the pipeline created the order.
    pub created_at: DateTime<Utc>,
    /// Order total when the record was captured, items plus shipping.
    pub total: Decimal,
    /// Whether the order reached the completed workflow state.
    pub completed: bool,
}

/// The slice of the checkout engine's order workflow the pipeline depends on.
///
/// Step predicates (`is_address_step`, `is_delivery_step`, `can_confirm`)
/// describe where the workflow currently stands; [`advance`](Self::advance)
/// moves it one step forward and fails if the current step's requirements are
/// not met. Step-by-step durability of the order belongs to the implementor,
/// not to this crate.
pub trait OrderWorkflow {
    /// Order number assigned at creation.
    fn number(&self) -> &str;

    /// Adds `quantity` units of `variant` to the order contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkout engine rejects the line item.
    fn add_item(&mut self, variant: &VariantId, quantity: u32) -> Result<()>;

    /// True while the workflow is waiting for addresses.
    fn is_address_step(&self) -> bool;

    /// True while the workflow is waiting for a delivery method.
    fn is_delivery_step(&self) -> bool;

    /// True when the workflow allows a confirmation step.
    fn can_confirm(&self) -> bool;

    /// Advances the workflow one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the current step's requirements are unmet (for
    /// example, advancing past payment with no payment attached).
    fn advance(&mut self) -> Result<()>;

    /// Sets the shipping address.
    fn set_ship_address(&mut self, address: Address);

    /// Sets the billing address.
    fn set_bill_address(&mut self, address: Address);

    /// Shipments currently on the order.
    fn shipments(&self) -> &[Shipment];

    /// Mutable access to shipments, for rate selection.
    fn shipments_mut(&mut self) -> &mut [Shipment];

    /// Recomputes shipment costs from the selected rates.
    fn set_shipments_cost(&mut self);

    /// The order's payment, if one has been attached.
    fn payment_mut(&mut self) -> Option<&mut Payment>;

    /// Attaches a new payment to the order.
    fn add_payment(&mut self, payment: Payment);

    /// Current order total, in the order's currency.
    fn total(&self) -> Decimal;

    /// True once the workflow reached its completed terminal state.
    fn is_complete(&self) -> bool;
}

/// Creates new orders seeded from a parent order's attributes.
pub trait OrderFactory {
    /// Concrete order type produced by this factory.
    type Order: OrderWorkflow;

    /// Creates a fresh order carrying the seed's currency, tokens, store,
    /// user, creator, and last-known IP.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkout engine cannot create the order.
    fn create_order(&mut self, seed: &OrderSeed) -> Result<Self::Order>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(method: &str, cost: i64, selected: bool) -> ShippingRate {
        ShippingRate {
            shipping_method: ShippingMethodId(method.to_owned()),
            cost: Decimal::new(cost, 2),
            selected,
        }
    }

    #[test]
    fn test_select_method_moves_selection() {
        let mut shipment =
            Shipment { shipping_rates: vec![rate("express", 999, true), rate("ground", 499, false)] };

        let moved = shipment.select_method(&ShippingMethodId("ground".to_owned()));

        assert!(moved);
        let selected = shipment.selected_rate().unwrap();
        assert_eq!(selected.shipping_method, ShippingMethodId("ground".to_owned()));
        assert_eq!(shipment.shipping_rates.iter().filter(|r| r.selected).count(), 1);
    }

    #[test]
    fn test_select_method_noop_when_already_selected() {
        let mut shipment =
            Shipment { shipping_rates: vec![rate("ground", 499, true), rate("express", 999, false)] };

        let moved = shipment.select_method(&ShippingMethodId("ground".to_owned()));

        assert!(!moved);
        assert!(shipment.selected_rate().unwrap().selected);
    }

    #[test]
    fn test_select_method_noop_when_no_matching_rate() {
        let mut shipment = Shipment { shipping_rates: vec![rate("ground", 499, true)] };

        let moved = shipment.select_method(&ShippingMethodId("drone".to_owned()));

        assert!(!moved);
        assert_eq!(
            shipment.selected_rate().unwrap().shipping_method,
            ShippingMethodId("ground".to_owned())
        );
    }
}
