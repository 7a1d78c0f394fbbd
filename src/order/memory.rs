//! In-memory order workflow, a reference implementation of the collaborator
//! contracts.
//!
//! Models a conventional checkout progression: cart, address, delivery,
//! payment, confirm, complete. The factory can be configured to stall orders
//! before completion, which is how tests exercise the renewal-failure paths
//! without a real checkout engine.

use rust_decimal::Decimal;

use super::{OrderFactory, OrderSeed, OrderWorkflow, Shipment, VariantId};
use crate::address::Address;
use crate::error::{Error, Result};
use crate::payment::Payment;

/// Workflow step of an in-memory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Items are being added.
    Cart,
    /// Waiting for ship/bill addresses.
    Address,
    /// Waiting for a delivery method.
    Delivery,
    /// Waiting for a payment.
    Payment,
    /// Ready for final confirmation.
    Confirm,
    /// Terminal, billable state.
    Complete,
}

/// An order held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryOrder {
    number: String,
    step: Step,
    line_items: Vec<(VariantId, u32, Decimal)>,
    ship_address: Option<Address>,
    bill_address: Option<Address>,
    shipments: Vec<Shipment>,
    shipping_total: Decimal,
    payment: Option<Payment>,
    unit_price: Decimal,
    stall_before_complete: bool,
}

impl MemoryOrder {
    /// Ship address currently on the order, if set.
    #[must_use]
    pub fn ship_address(&self) -> Option<&Address> {
        self.ship_address.as_ref()
    }

    /// Bill address currently on the order, if set.
    #[must_use]
    pub fn bill_address(&self) -> Option<&Address> {
        self.bill_address.as_ref()
    }

    /// Payment currently attached, if any.
    #[must_use]
    pub fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    /// Current workflow step.
    #[must_use]
    pub fn step(&self) -> Step {
        self.step
    }

    fn item_total(&self) -> Decimal {
        self.line_items.iter().map(|(_, qty, unit)| unit * Decimal::from(*qty)).sum()
    }
}

impl OrderWorkflow for MemoryOrder {
    fn number(&self) -> &str {
        &self.number
    }

    fn add_item(&mut self, variant: &VariantId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(Error::Order("cannot add zero quantity".into()));
        }
        // Flat catalog: every variant costs the factory's unit price.
        self.line_items.push((variant.clone(), quantity, self.unit_price));
        Ok(())
    }

    fn is_address_step(&self) -> bool {
        self.step == Step::Address
    }

    fn is_delivery_step(&self) -> bool {
        self.step == Step::Delivery
    }

    fn can_confirm(&self) -> bool {
        self.step == Step::Confirm
    }

    fn advance(&mut self) -> Result<()> {
        self.step = match self.step {
            Step::Cart => Step::Address,
            Step::Address => {
                if self.ship_address.is_none() || self.bill_address.is_none() {
                    return Err(Error::Order("addresses required before delivery".into()));
                }
                Step::Delivery
            }
            Step::Delivery => Step::Payment,
            Step::Payment => {
                if self.payment.is_none() {
                    return Err(Error::Order("payment required before confirmation".into()));
                }
                Step::Confirm
            }
            Step::Confirm => {
                if self.stall_before_complete {
                    return Err(Error::Order("order cannot complete".into()));
                }
                Step::Complete
            }
            Step::Complete => return Err(Error::Order("order is already complete".into())),
        };
        Ok(())
    }

    fn set_ship_address(&mut self, address: Address) {
        self.ship_address = Some(address);
    }

    fn set_bill_address(&mut self, address: Address) {
        self.bill_address = Some(address);
    }

    fn shipments(&self) -> &[Shipment] {
        &self.shipments
    }

    fn shipments_mut(&mut self) -> &mut [Shipment] {
        &mut self.shipments
    }

    fn set_shipments_cost(&mut self) {
        self.shipping_total = self
            .shipments
            .iter()
            .filter_map(Shipment::selected_rate)
            .map(|r| r.cost)
            .sum();
    }

    fn payment_mut(&mut self) -> Option<&mut Payment> {
        self.payment.as_mut()
    }

    fn add_payment(&mut self, payment: Payment) {
        self.payment = Some(payment);
    }

    fn total(&self) -> Decimal {
        self.item_total() + self.shipping_total
    }

    fn is_complete(&self) -> bool {
        self.step == Step::Complete
    }
}

/// Factory producing [`MemoryOrder`]s.
#[derive(Debug)]
pub struct MemoryOrderFactory {
    counter: u64,
    unit_price: Decimal,
    shipments_template: Vec<Shipment>,
    stall_before_complete: bool,
}

impl MemoryOrderFactory {
    /// Creates a factory pricing every variant at `unit_price` and seeding
    /// each order with the given shipments.
    #[must_use]
    pub fn new(unit_price: Decimal, shipments_template: Vec<Shipment>) -> Self {
        Self { counter: 0, unit_price, shipments_template, stall_before_complete: false }
    }

    /// Makes every subsequent order refuse to advance past confirmation.
    ///
    /// Simulates downstream completion failures (stock, gateway declines).
    pub fn stall_before_complete(&mut self, stall: bool) {
        self.stall_before_complete = stall;
    }
}

impl OrderFactory for MemoryOrderFactory {
    type Order = MemoryOrder;

    fn create_order(&mut self, seed: &OrderSeed) -> Result<Self::Order> {
        if seed.currency.len() != 3 {
            return Err(Error::Order(format!("invalid currency code {:?}", seed.currency)));
        }
        self.counter += 1;
        Ok(MemoryOrder {
            number: format!("R{:09}", self.counter),
            step: Step::Cart,
            line_items: Vec::new(),
            ship_address: None,
            bill_address: None,
            shipments: self.shipments_template.clone(),
            shipping_total: Decimal::ZERO,
            payment: None,
            unit_price: self.unit_price,
            stall_before_complete: self.stall_before_complete,
        })
    }
}
