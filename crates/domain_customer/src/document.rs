//! Customer documents
//!
//! A document belongs to exactly one customer for its whole life. The number
//! is fixed at creation; the validity window and issuer may change through
//! the update engine, which recomputes the derived status afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CustomerId, DocumentId};

/// Document kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    NationalId,
    Passport,
    DriverLicense,
    VoterId,
    WorkPermit,
}

/// Derived verification status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    /// Awaiting (re-)verification
    PendingVerification,
    /// Verified by an operator
    Verified,
    /// Validity window has ended
    Expired,
    /// Rejected during verification
    Rejected,
}

/// An identity document owned by a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Owning customer; ownership is permanent
    pub customer_id: CustomerId,
    pub kind: DocumentKind,
    /// Document number, immutable after creation
    pub number: String,
    pub issuing_authority: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub status: DocumentStatus,
    pub principal: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a new document pending verification
    pub fn new(customer_id: CustomerId, kind: DocumentKind, number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new_v7(),
            customer_id,
            kind,
            number: number.into(),
            issuing_authority: None,
            issue_date: None,
            expiry_date: None,
            status: DocumentStatus::PendingVerification,
            principal: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the validity window has ended as of `today`
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|exp| exp < today)
    }

    /// Recomputes the derived status from the validity window
    ///
    /// A document whose expiry has passed becomes `Expired`. An `Expired`
    /// document whose expiry was extended back into the future returns to
    /// `PendingVerification` (verification does not survive expiry).
    pub fn refresh_status(&mut self, today: NaiveDate) {
        if self.is_expired(today) {
            self.status = DocumentStatus::Expired;
        } else if self.status == DocumentStatus::Expired {
            self.status = DocumentStatus::PendingVerification;
        }
    }
}
