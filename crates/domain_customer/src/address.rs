//! Customer addresses
//!
//! An address belongs to exactly one customer and carries a kind. The
//! principal flag is scoped per (customer, kind): each kind may have its own
//! principal address, but never two principals of the same kind for the same
//! customer. That uniqueness is enforced by the update engine, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AddressId, CustomerId};

/// Country assigned when an address is created or updated without one
pub const DEFAULT_COUNTRY: &str = "BR";

/// Address kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressKind {
    Residential,
    Commercial,
    Delivery,
    Billing,
    Pickup,
}

/// A postal address owned by a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    /// Owning customer; ownership is permanent
    pub customer_id: CustomerId,
    pub kind: AddressKind,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    /// Principal flag, unique per (customer, kind)
    pub principal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Creates a new address, defaulting the country when blank
    pub fn new(
        customer_id: CustomerId,
        kind: AddressKind,
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AddressId::new_v7(),
            customer_id,
            kind,
            street: street.into(),
            number: None,
            complement: None,
            district: None,
            city: city.into(),
            state: None,
            postal_code: postal_code.into(),
            country: country
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            principal: false,
            created_at: now,
            updated_at: now,
        }
    }
}
