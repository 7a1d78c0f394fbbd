//! Shared fixtures for the unit test suite.

use rust_decimal::Decimal;

use crate::address::Address;
use crate::frequency::Frequency;
use crate::order::memory::MemoryOrderFactory;
use crate::order::{OrderSeed, Shipment, ShippingMethodId, ShippingRate, VariantId};
use crate::payment::{PaymentMethodId, PaymentSource};
use crate::subscription::model::{Subscription, SubscriptionAttributes};

pub(crate) fn test_address() -> Address {
    Address {
        firstname: "Grace".to_owned(),
        lastname: "Hopper".to_owned(),
        address1: "1 Navy Yard".to_owned(),
        address2: None,
        city: "Arlington".to_owned(),
        zipcode: "22202".to_owned(),
        phone: Some("555-0100".to_owned()),
        state: "VA".to_owned(),
        country: "US".to_owned(),
    }
}

pub(crate) fn parent_order_seed() -> OrderSeed {
    OrderSeed {
        number: "R000000001".to_owned(),
        currency: "USD".to_owned(),
        guest_token: None,
        store_id: "main".to_owned(),
        user_id: Some("user-1".to_owned()),
        created_by: Some("user-1".to_owned()),
        last_ip_address: Some("203.0.113.7".to_owned()),
        shipping_method: Some(ShippingMethodId("ground".to_owned())),
    }
}

pub(crate) fn card_source() -> PaymentSource {
    PaymentSource::Card {
        token: "tok_123".to_owned(),
        payment_method: PaymentMethodId("pm-card".to_owned()),
    }
}

/// Attributes for a four-delivery monthly subscription.
pub(crate) fn pending_attributes() -> SubscriptionAttributes {
    SubscriptionAttributes {
        price: Decimal::new(2000, 2),
        quantity: 2,
        delivery_number: Some(4),
        variant: VariantId("V1".to_owned()),
        frequency: Frequency::monthly(),
        parent_order: parent_order_seed(),
        ship_address: test_address(),
        bill_address: test_address(),
        source: Some(card_source()),
    }
}

pub(crate) fn pending_subscription() -> Subscription {
    Subscription::create(pending_attributes())
        .unwrap_or_else(|e| panic!("fixture attributes must validate: {e}"))
}

/// Factory pricing every variant at 10.00 with one ground/express shipment.
pub(crate) fn memory_factory() -> MemoryOrderFactory {
    let shipment = Shipment {
        shipping_rates: vec![
            ShippingRate {
                shipping_method: ShippingMethodId("express".to_owned()),
                cost: Decimal::new(999, 2),
                selected: true,
            },
            ShippingRate {
                shipping_method: ShippingMethodId("ground".to_owned()),
                cost: Decimal::new(500, 2),
                selected: false,
            },
        ],
    };
    MemoryOrderFactory::new(Decimal::new(1000, 2), vec![shipment])
}
