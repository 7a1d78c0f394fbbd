//! Owned address value objects.
//!
//! A subscription carries its own ship and bill addresses as value copies
//! taken at subscription time, not shared references to the parent order's
//! addresses. Either side can be edited afterwards without affecting the
//! other; the regeneration pipeline clones them again onto each new order.

use serde::{Deserialize, Serialize};

/// Postal address used for shipping or billing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Recipient first name.
    pub firstname: String,
    /// Recipient last name.
    pub lastname: String,
    /// Street address, first line.
    pub address1: String,
    /// Street address, second line.
    pub address2: Option<String>,
    /// City.
    pub city: String,
    /// Postal or ZIP code.
    pub zipcode: String,
    /// Contact phone number.
    pub phone: Option<String>,
    /// State or province code.
    pub state: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}
