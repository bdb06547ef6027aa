//! Customer aggregate
//!
//! A customer is either an individual (PF) or an organization (PJ): one core
//! struct with the shared fields plus a profile sum type selected by an
//! explicit discriminant. The aggregate owns its documents, addresses, and
//! contacts; those collections are only ever mutated in place through the
//! update engine, never replaced wholesale.
//!
//! # Immutability
//!
//! The public identifier, the person/organization tax identifier, and the
//! birth date are write-once: set at creation, absent from every update
//! request shape. Lifecycle flags move together with their stamps: a
//! soft-deleted customer always carries a delete stamp and a blocked
//! customer always carries a block stamp.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AddressId, ContactId, CustomerId, DocumentId};

use crate::address::Address;
use crate::contact::Contact;
use crate::document::Document;
use crate::error::CustomerError;
use crate::tax_id;

/// Discriminant for the two customer kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerKind {
    /// Natural person (PF)
    Individual,
    /// Legal entity (PJ)
    Organization,
}

impl fmt::Display for CustomerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerKind::Individual => write!(f, "individual"),
            CustomerKind::Organization => write!(f, "organization"),
        }
    }
}

/// Gender, for demographic fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Commercial classification of the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerRole {
    Client,
    Prospect,
    Partner,
}

/// Where the customer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadSource {
    Website,
    Referral,
    SocialMedia,
    Advertising,
    Event,
}

/// Individual (PF) profile details
///
/// `cpf` and `birth_date` are write-once; everything else is mutable
/// through the update engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualDetails {
    /// Normalized CPF digits, immutable after creation
    pub cpf: String,
    /// Immutable after creation
    pub birth_date: NaiveDate,
    pub first_name: String,
    pub last_name: String,
    pub social_name: Option<String>,
    /// Secondary national registry number (RG)
    pub national_registry: Option<String>,
    pub gender: Option<Gender>,
    pub nationality: Option<String>,
    pub profession: Option<String>,
}

/// Organization (PJ) profile details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationDetails {
    /// Normalized CNPJ digits, immutable after creation
    pub cnpj: String,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub state_registration: Option<String>,
    pub municipal_registration: Option<String>,
    pub legal_representative: Option<String>,
    pub share_capital: Option<Decimal>,
}

/// The kind-specific payload of a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CustomerProfile {
    Individual(IndividualDetails),
    Organization(OrganizationDetails),
}

impl CustomerProfile {
    /// Returns the discriminant for this profile
    pub fn kind(&self) -> CustomerKind {
        match self {
            CustomerProfile::Individual(_) => CustomerKind::Individual,
            CustomerProfile::Organization(_) => CustomerKind::Organization,
        }
    }
}

/// Reason, timestamp, and acting user recorded for a block or soft delete
///
/// The three fields are always set together with the corresponding flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleStamp {
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
    pub by: Option<String>,
}

impl LifecycleStamp {
    /// Creates a stamp dated now
    pub fn now(reason: Option<String>, by: Option<String>) -> Self {
        Self {
            reason,
            at: Utc::now(),
            by,
        }
    }
}

/// The customer aggregate root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Public stable identifier, assigned at creation, never changes
    pub id: CustomerId,
    /// Kind-specific payload
    pub profile: CustomerProfile,
    pub role: CustomerRole,
    pub lead_source: Option<LeadSource>,
    /// False only for soft-deleted customers
    pub active: bool,
    pub blocked: bool,
    /// Present iff `blocked`
    pub block_stamp: Option<LifecycleStamp>,
    /// Present iff not `active`
    pub delete_stamp: Option<LifecycleStamp>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a new individual customer
    ///
    /// The CPF is checksum-validated and normalized; an invalid identifier
    /// is rejected with `InvalidTaxId`.
    pub fn new_individual(
        mut details: IndividualDetails,
        role: CustomerRole,
    ) -> Result<Self, CustomerError> {
        if !tax_id::is_valid_cpf(&details.cpf) {
            return Err(CustomerError::InvalidTaxId(details.cpf));
        }
        details.cpf = tax_id::normalize(&details.cpf);
        Ok(Self::from_profile(CustomerProfile::Individual(details), role))
    }

    /// Creates a new organization customer
    pub fn new_organization(
        mut details: OrganizationDetails,
        role: CustomerRole,
    ) -> Result<Self, CustomerError> {
        if !tax_id::is_valid_cnpj(&details.cnpj) {
            return Err(CustomerError::InvalidTaxId(details.cnpj));
        }
        details.cnpj = tax_id::normalize(&details.cnpj);
        Ok(Self::from_profile(CustomerProfile::Organization(details), role))
    }

    fn from_profile(profile: CustomerProfile, role: CustomerRole) -> Self {
        let now = Utc::now();
        Self {
            id: CustomerId::new_v7(),
            profile,
            role,
            lead_source: None,
            active: true,
            blocked: false,
            block_stamp: None,
            delete_stamp: None,
            documents: Vec::new(),
            addresses: Vec::new(),
            contacts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the discriminant
    pub fn kind(&self) -> CustomerKind {
        self.profile.kind()
    }

    /// Returns the normalized tax identifier digits (CPF or CNPJ)
    pub fn tax_id_digits(&self) -> &str {
        match &self.profile {
            CustomerProfile::Individual(i) => &i.cpf,
            CustomerProfile::Organization(o) => &o.cnpj,
        }
    }

    /// Returns a human-readable name for the customer
    pub fn display_name(&self) -> String {
        match &self.profile {
            CustomerProfile::Individual(i) => match &i.social_name {
                Some(social) => social.clone(),
                None => format!("{} {}", i.first_name, i.last_name),
            },
            CustomerProfile::Organization(o) => o
                .trade_name
                .clone()
                .unwrap_or_else(|| o.legal_name.clone()),
        }
    }

    /// Capability accessor for individual updates
    ///
    /// Returns `KindMismatch` when this customer is not an individual.
    pub fn individual_mut(&mut self) -> Result<&mut IndividualDetails, CustomerError> {
        let actual = self.kind();
        match &mut self.profile {
            CustomerProfile::Individual(details) => Ok(details),
            CustomerProfile::Organization(_) => Err(CustomerError::KindMismatch {
                expected: CustomerKind::Individual,
                actual,
            }),
        }
    }

    /// Capability accessor for organization updates
    pub fn organization_mut(&mut self) -> Result<&mut OrganizationDetails, CustomerError> {
        let actual = self.kind();
        match &mut self.profile {
            CustomerProfile::Organization(details) => Ok(details),
            CustomerProfile::Individual(_) => Err(CustomerError::KindMismatch {
                expected: CustomerKind::Organization,
                actual,
            }),
        }
    }

    /// Blocks the customer, stamping reason, time, and acting user
    pub fn block(&mut self, reason: Option<String>, by: Option<String>) {
        self.blocked = true;
        self.block_stamp = Some(LifecycleStamp::now(reason, by));
        self.touch();
    }

    /// Removes the block and its stamp
    pub fn unblock(&mut self) {
        self.blocked = false;
        self.block_stamp = None;
        self.touch();
    }

    /// Soft-deletes the customer: clears `active` and stamps the deletion
    pub fn soft_delete(&mut self, reason: Option<String>, by: Option<String>) {
        self.active = false;
        self.delete_stamp = Some(LifecycleStamp::now(reason, by));
        self.touch();
    }

    /// Restores a soft-deleted customer
    pub fn restore(&mut self) {
        self.active = true;
        self.delete_stamp = None;
        self.touch();
    }

    /// Bumps the updated-at timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Looks up an owned document
    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Looks up an owned address
    pub fn address(&self, id: AddressId) -> Option<&Address> {
        self.addresses.iter().find(|a| a.id == id)
    }

    /// Looks up an owned contact
    pub fn contact(&self, id: ContactId) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    /// Replaces an owned document by id, or appends it
    pub fn upsert_document(&mut self, document: Document) {
        match self.documents.iter_mut().find(|d| d.id == document.id) {
            Some(slot) => *slot = document,
            None => self.documents.push(document),
        }
    }

    /// Replaces an owned address by id, or appends it
    pub fn upsert_address(&mut self, address: Address) {
        match self.addresses.iter_mut().find(|a| a.id == address.id) {
            Some(slot) => *slot = address,
            None => self.addresses.push(address),
        }
    }

    /// Replaces an owned contact by id, or appends it
    pub fn upsert_contact(&mut self, contact: Contact) {
        match self.contacts.iter_mut().find(|c| c.id == contact.id) {
            Some(slot) => *slot = contact,
            None => self.contacts.push(contact),
        }
    }
}
