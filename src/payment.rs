//! Payment sources and payment method resolution.
//!
//! The original system attached a polymorphic payment source to each
//! subscription and inspected its runtime type during renewal. Here the
//! source is a tagged enum over the supported kinds, each exposing the same
//! "resolve a payment method" capability, so the pipeline never branches on
//! type names.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of a payment method configured on the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentMethodId(pub String);

impl PaymentMethodId {
    /// Returns the inner string reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payment instrument a subscription bills against.
///
/// Card-like sources carry their own payment method; store-credit sources do
/// not, and are billed through whichever store-credit payment method the
/// store currently offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentSource {
    /// A tokenized card (or card-like gateway instrument).
    Card {
        /// Gateway token for the stored card.
        token: String,
        /// Payment method the card was created under.
        payment_method: PaymentMethodId,
    },
    /// Store credit held on the subscriber's account.
    StoreCredit {
        /// Account the credit belongs to.
        account_id: String,
    },
}

impl PaymentSource {
    /// Resolves the payment method this source bills through.
    ///
    /// Card-like sources use their own method. Store-credit sources take the
    /// first available store-credit method; `None` means the store offers no
    /// store-credit method right now, which stalls the renewal's payment step
    /// (routed to a paused subscription, not an error).
    #[must_use]
    pub fn resolve_payment_method(
        &self,
        store_credit_methods: &[PaymentMethodId],
    ) -> Option<PaymentMethodId> {
        match self {
            Self::Card { payment_method, .. } => Some(payment_method.clone()),
            Self::StoreCredit { .. } => store_credit_methods.first().cloned(),
        }
    }
}

/// A payment attached to a generated order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Source the payment draws from.
    pub source: PaymentSource,
    /// Payment method the payment is processed through.
    pub payment_method: PaymentMethodId,
    /// Amount, in the order's currency.
    pub amount: Decimal,
    /// When the payment record was created.
    pub created_at: DateTime<Utc>,
}
