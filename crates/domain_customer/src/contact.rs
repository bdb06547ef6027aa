//! Customer contact methods
//!
//! A contact belongs to exactly one customer. At most one contact per
//! customer may be principal, regardless of kind; the update engine enforces
//! that through the uniqueness strategy. Changing the channel (kind or
//! value) always resets the verified flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ContactId, CustomerId};

/// Contact kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactKind {
    Phone,
    Mobile,
    Email,
    Whatsapp,
}

/// A contact method owned by a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    /// Owning customer; ownership is permanent
    pub customer_id: CustomerId,
    pub kind: ContactKind,
    pub value: String,
    /// Principal flag, unique per customer across all kinds
    pub principal: bool,
    pub verified: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Creates a new unverified contact
    pub fn new(customer_id: CustomerId, kind: ContactKind, value: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ContactId::new_v7(),
            customer_id,
            kind,
            value: value.into(),
            principal: false,
            verified: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a channel change, dropping verification when it actually changes
    ///
    /// Verification attests a specific (kind, value) pair and does not carry
    /// across either changing.
    pub fn apply_channel(&mut self, kind: ContactKind, value: String) {
        if self.kind != kind || self.value != value {
            self.verified = false;
        }
        self.kind = kind;
        self.value = value;
    }

    /// Marks the current channel as verified
    pub fn mark_verified(&mut self) {
        self.verified = true;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> Contact {
        Contact::new(CustomerId::new_v7(), ContactKind::Email, "ana@example.com")
    }

    #[test]
    fn test_new_contact_unverified() {
        let c = contact();
        assert!(!c.verified);
        assert!(!c.principal);
    }

    #[test]
    fn test_value_change_resets_verified() {
        let mut c = contact();
        c.mark_verified();
        c.apply_channel(ContactKind::Email, "ana@new.example.com".to_string());
        assert!(!c.verified);
    }

    #[test]
    fn test_kind_change_resets_verified() {
        let mut c = contact();
        c.mark_verified();
        c.apply_channel(ContactKind::Whatsapp, "ana@example.com".to_string());
        assert!(!c.verified);
    }

    #[test]
    fn test_same_channel_keeps_verified() {
        let mut c = contact();
        c.mark_verified();
        c.apply_channel(ContactKind::Email, "ana@example.com".to_string());
        assert!(c.verified);
    }
}
