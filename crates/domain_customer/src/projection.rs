//! Read projection of the customer aggregate
//!
//! Every successful operation returns a [`CustomerView`] built from the
//! post-commit aggregate state, so callers always observe the result of
//! their own write. The view is a plain serializable shape: prefixed string
//! identifiers, the tax identifier in its display format, and the nested
//! collections in full.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::address::{Address, AddressKind};
use crate::contact::{Contact, ContactKind};
use crate::customer::{
    Customer, CustomerKind, CustomerProfile, CustomerRole, Gender, LeadSource, LifecycleStamp,
};
use crate::document::{Document, DocumentKind, DocumentStatus};
use crate::tax_id;

/// Serializable snapshot of a customer aggregate
#[derive(Debug, Clone, Serialize)]
pub struct CustomerView {
    pub id: String,
    pub kind: CustomerKind,
    /// CPF or CNPJ in display format
    pub tax_id: String,
    pub display_name: String,
    pub profile: ProfileView,
    pub role: CustomerRole,
    pub lead_source: Option<LeadSource>,
    pub active: bool,
    pub blocked: bool,
    pub block_stamp: Option<LifecycleStampView>,
    pub delete_stamp: Option<LifecycleStampView>,
    pub documents: Vec<DocumentView>,
    pub addresses: Vec<AddressView>,
    pub contacts: Vec<ContactView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind-specific fields of the view
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileView {
    Individual(IndividualView),
    Organization(OrganizationView),
}

#[derive(Debug, Clone, Serialize)]
pub struct IndividualView {
    pub first_name: String,
    pub last_name: String,
    pub social_name: Option<String>,
    pub birth_date: NaiveDate,
    pub national_registry: Option<String>,
    pub gender: Option<Gender>,
    pub nationality: Option<String>,
    pub profession: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizationView {
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub state_registration: Option<String>,
    pub municipal_registration: Option<String>,
    pub legal_representative: Option<String>,
    pub share_capital: Option<rust_decimal::Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LifecycleStampView {
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
    pub by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    pub id: String,
    pub kind: DocumentKind,
    pub number: String,
    pub issuing_authority: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub status: DocumentStatus,
    pub principal: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddressView {
    pub id: String,
    pub kind: AddressKind,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub principal: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactView {
    pub id: String,
    pub kind: ContactKind,
    pub value: String,
    pub principal: bool,
    pub verified: bool,
    pub notes: Option<String>,
}

/// Builds the read projection of a customer aggregate
pub fn project(customer: &Customer) -> CustomerView {
    let (tax_id, profile) = match &customer.profile {
        CustomerProfile::Individual(i) => (
            tax_id::format_cpf(&i.cpf),
            ProfileView::Individual(IndividualView {
                first_name: i.first_name.clone(),
                last_name: i.last_name.clone(),
                social_name: i.social_name.clone(),
                birth_date: i.birth_date,
                national_registry: i.national_registry.clone(),
                gender: i.gender,
                nationality: i.nationality.clone(),
                profession: i.profession.clone(),
            }),
        ),
        CustomerProfile::Organization(o) => (
            tax_id::format_cnpj(&o.cnpj),
            ProfileView::Organization(OrganizationView {
                legal_name: o.legal_name.clone(),
                trade_name: o.trade_name.clone(),
                state_registration: o.state_registration.clone(),
                municipal_registration: o.municipal_registration.clone(),
                legal_representative: o.legal_representative.clone(),
                share_capital: o.share_capital,
            }),
        ),
    };

    CustomerView {
        id: customer.id.to_string(),
        kind: customer.kind(),
        tax_id,
        display_name: customer.display_name(),
        profile,
        role: customer.role,
        lead_source: customer.lead_source,
        active: customer.active,
        blocked: customer.blocked,
        block_stamp: customer.block_stamp.as_ref().map(stamp_view),
        delete_stamp: customer.delete_stamp.as_ref().map(stamp_view),
        documents: customer.documents.iter().map(document_view).collect(),
        addresses: customer.addresses.iter().map(address_view).collect(),
        contacts: customer.contacts.iter().map(contact_view).collect(),
        created_at: customer.created_at,
        updated_at: customer.updated_at,
    }
}

fn stamp_view(stamp: &LifecycleStamp) -> LifecycleStampView {
    LifecycleStampView {
        reason: stamp.reason.clone(),
        at: stamp.at,
        by: stamp.by.clone(),
    }
}

fn document_view(document: &Document) -> DocumentView {
    DocumentView {
        id: document.id.to_string(),
        kind: document.kind,
        number: document.number.clone(),
        issuing_authority: document.issuing_authority.clone(),
        issue_date: document.issue_date,
        expiry_date: document.expiry_date,
        status: document.status,
        principal: document.principal,
        notes: document.notes.clone(),
    }
}

fn address_view(address: &Address) -> AddressView {
    AddressView {
        id: address.id.to_string(),
        kind: address.kind,
        street: address.street.clone(),
        number: address.number.clone(),
        complement: address.complement.clone(),
        district: address.district.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        postal_code: address.postal_code.clone(),
        country: address.country.clone(),
        principal: address.principal,
    }
}

fn contact_view(contact: &Contact) -> ContactView {
    ContactView {
        id: contact.id.to_string(),
        kind: contact.kind,
        value: contact.value.clone(),
        principal: contact.principal,
        verified: contact.verified,
        notes: contact.notes.clone(),
    }
}
