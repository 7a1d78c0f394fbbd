//! Product Subscriptions Engine
//!
//! A recurring-delivery engine for commerce platforms: customers subscribe a
//! product variant from a completed order, and the engine periodically
//! regenerates delivery orders on the contracted frequency until the
//! subscription is exhausted or canceled.
//!
//! # Overview
//!
//! The crate is organized around two cores:
//!
//! - a declarative lifecycle state machine ([`subscription::state`]) driven
//!   by an engine ([`subscription::LifecycleEngine`]) that applies hooks and
//!   commits transitions atomically, notifying subscribers only after a
//!   commit;
//! - an order regeneration pipeline ([`subscription::regenerate_order`]) that
//!   rebuilds a full checkout (items, addresses, delivery, payment,
//!   confirmation) against a pluggable [`order::OrderFactory`] collaborator.
//!
//! Renewal failures are routed, not raised: a stalled checkout pauses the
//! subscription for a later wholesale retry and keeps the incomplete order
//! for audit.
//!
//! # Examples
//!
//! ```
//! use product_subscriptions::notify::NullNotifier;
//! use product_subscriptions::subscription::{LifecycleEngine, Subscription, SubscriptionAttributes};
//! use product_subscriptions::order::memory::MemoryOrderFactory;
//! use product_subscriptions::order::{OrderSeed, VariantId};
//! use product_subscriptions::payment::{PaymentMethodId, PaymentSource};
//! use product_subscriptions::frequency::Frequency;
//! use product_subscriptions::address::Address;
//! use rust_decimal::Decimal;
//!
//! # fn main() -> product_subscriptions::error::Result<()> {
//! let address = Address {
//!     firstname: "Ada".into(),
//!     lastname: "Lovelace".into(),
//!     address1: "12 St James Square".into(),
//!     address2: None,
//!     city: "London".into(),
//!     zipcode: "SW1Y 4JH".into(),
//!     phone: None,
//!     state: "LND".into(),
//!     country: "GB".into(),
//! };
//! let mut subscription = Subscription::create(SubscriptionAttributes {
//!     price: Decimal::new(1500, 2),
//!     quantity: 1,
//!     delivery_number: Some(6),
//!     variant: VariantId("V42".into()),
//!     frequency: Frequency::monthly(),
//!     parent_order: OrderSeed {
//!         number: "R000000007".into(),
//!         currency: "GBP".into(),
//!         guest_token: None,
//!         store_id: "main".into(),
//!         user_id: Some("user-7".into()),
//!         created_by: Some("user-7".into()),
//!         last_ip_address: None,
//!         shipping_method: None,
//!     },
//!     ship_address: address.clone(),
//!     bill_address: address,
//!     source: Some(PaymentSource::Card {
//!         token: "tok_abc".into(),
//!         payment_method: PaymentMethodId("pm-card".into()),
//!     }),
//! })?;
//!
//! let engine = LifecycleEngine::new(NullNotifier);
//! engine.activate(&mut subscription)?;
//!
//! let mut factory = MemoryOrderFactory::new(Decimal::new(1500, 2), vec![]);
//! let outcome = engine.renew(&mut subscription, &mut factory, &[])?;
//! assert!(outcome.is_renewed());
//! assert_eq!(subscription.completed_order_count(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod address;
pub mod error;
pub mod frequency;
pub mod notify;
pub mod order;
pub mod payment;
pub mod subscription;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use subscription::{LifecycleEngine, RenewalOutcome, Subscription};
