//! Selective aggregate update engine
//!
//! Applies a partial, multi-entity update to a customer aggregate in one
//! atomic operation. The central contract is selective-update semantics:
//! absent fields mean "do not touch", an empty nested list means "do not
//! touch that section", and a non-empty list touches only the entities it
//! names. A client can therefore patch one address without resending the
//! customer's whole document and contact state.
//!
//! # Processing order
//!
//! The order is fixed because later steps assume earlier ones committed in
//! memory: customer scalars, then documents, then addresses, then contacts,
//! then one commit of the whole aggregate through the gateway. Any failure
//! along the way is terminal for the whole request; nothing reaches the
//! gateway, so no partial effect becomes visible to readers.
//!
//! Immutable identity fields (CPF, CNPJ, birth date, document numbers) are
//! simply absent from the request shapes; they cannot be altered through
//! this path and need no runtime check.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument};

use core_kernel::{AddressId, ContactId, CustomerId, DocumentId, OperationContext};

use crate::address::{AddressKind, DEFAULT_COUNTRY};
use crate::contact::ContactKind;
use crate::customer::{Customer, CustomerRole, Gender, LeadSource};
use crate::error::CustomerError;
use crate::ports::{ChangeSet, CustomerGateway};
use crate::projection::{project, CustomerView};
use crate::validation;

/// Partial update for one owned document, keyed by its identifier
///
/// The document number is immutable and has no field here.
#[derive(Debug, Clone)]
pub struct DocumentPatch {
    pub id: DocumentId,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub issuing_authority: Option<String>,
    pub notes: Option<String>,
}

impl DocumentPatch {
    /// Creates an empty patch for a document
    pub fn new(id: DocumentId) -> Self {
        Self {
            id,
            issue_date: None,
            expiry_date: None,
            issuing_authority: None,
            notes: None,
        }
    }
}

/// Partial update for one owned address, keyed by its identifier
///
/// Location fields are replaced wholesale when present; there is no
/// partial-sub-field semantics at this granularity.
#[derive(Debug, Clone)]
pub struct AddressPatch {
    pub id: AddressId,
    pub kind: Option<AddressKind>,
    pub principal: Option<bool>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl AddressPatch {
    /// Creates an empty patch for an address
    pub fn new(id: AddressId) -> Self {
        Self {
            id,
            kind: None,
            principal: None,
            street: None,
            number: None,
            complement: None,
            district: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
        }
    }
}

/// Update for one owned contact, keyed by its identifier
///
/// Kind and value are always carried and applied unconditionally; the
/// verified flag drops whenever either actually changes.
#[derive(Debug, Clone)]
pub struct ContactPatch {
    pub id: ContactId,
    pub kind: ContactKind,
    pub value: String,
    pub principal: Option<bool>,
    pub notes: Option<String>,
}

impl ContactPatch {
    /// Creates a patch carrying the contact's channel
    pub fn new(id: ContactId, kind: ContactKind, value: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            value: value.into(),
            principal: None,
            notes: None,
        }
    }
}

/// Partial update request for an individual (PF) customer
///
/// CPF and birth date are write-once and structurally absent here.
#[derive(Debug, Clone, Default)]
pub struct UpdateIndividualRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub social_name: Option<String>,
    pub national_registry: Option<String>,
    pub gender: Option<Gender>,
    pub nationality: Option<String>,
    pub profession: Option<String>,
    pub role: Option<CustomerRole>,
    pub lead_source: Option<LeadSource>,
    pub documents: Vec<DocumentPatch>,
    pub addresses: Vec<AddressPatch>,
    pub contacts: Vec<ContactPatch>,
}

/// Partial update request for an organization (PJ) customer
///
/// The CNPJ is write-once and structurally absent here.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrganizationRequest {
    pub legal_name: Option<String>,
    pub trade_name: Option<String>,
    pub state_registration: Option<String>,
    pub municipal_registration: Option<String>,
    pub legal_representative: Option<String>,
    pub share_capital: Option<Decimal>,
    pub role: Option<CustomerRole>,
    pub lead_source: Option<LeadSource>,
    pub documents: Vec<DocumentPatch>,
    pub addresses: Vec<AddressPatch>,
    pub contacts: Vec<ContactPatch>,
}

/// Orchestrates selective aggregate updates against the gateway
///
/// One entry point per customer kind; the nested-section passes are shared.
/// The service holds no locks and performs no concurrency check of its own:
/// serialization of concurrent writers to the same aggregate is delegated
/// to the gateway's transaction discipline.
pub struct CustomerUpdateService {
    gateway: Arc<dyn CustomerGateway>,
}

impl CustomerUpdateService {
    /// Creates the update service over a gateway
    pub fn new(gateway: Arc<dyn CustomerGateway>) -> Self {
        Self { gateway }
    }

    /// Applies a partial update to an individual customer
    ///
    /// Terminal errors: customer not found, kind mismatch, nested entity
    /// not found or not owned, date-range violation, duplicate principal.
    /// On any of them no effect is persisted.
    #[instrument(skip(self, request), fields(customer = %id, operation = %ctx.operation))]
    pub async fn update_individual(
        &self,
        id: CustomerId,
        request: UpdateIndividualRequest,
        ctx: &OperationContext,
    ) -> Result<CustomerView, CustomerError> {
        let mut customer = self.gateway.load_customer(id).await?;

        {
            let details = customer.individual_mut()?;
            if let Some(first_name) = request.first_name {
                details.first_name = first_name;
            }
            if let Some(last_name) = request.last_name {
                details.last_name = last_name;
            }
            if let Some(social_name) = request.social_name {
                details.social_name = Some(social_name);
            }
            if let Some(national_registry) = request.national_registry {
                details.national_registry = Some(national_registry);
            }
            if let Some(gender) = request.gender {
                details.gender = Some(gender);
            }
            if let Some(nationality) = request.nationality {
                details.nationality = Some(nationality);
            }
            if let Some(profession) = request.profession {
                details.profession = Some(profession);
            }
        }
        self.apply_classification(&mut customer, request.role, request.lead_source);

        let changes = self
            .apply_nested(
                &mut customer,
                &request.documents,
                &request.addresses,
                &request.contacts,
            )
            .await?;

        self.finish(customer, changes).await
    }

    /// Applies a partial update to an organization customer
    #[instrument(skip(self, request), fields(customer = %id, operation = %ctx.operation))]
    pub async fn update_organization(
        &self,
        id: CustomerId,
        request: UpdateOrganizationRequest,
        ctx: &OperationContext,
    ) -> Result<CustomerView, CustomerError> {
        let mut customer = self.gateway.load_customer(id).await?;

        {
            let details = customer.organization_mut()?;
            if let Some(legal_name) = request.legal_name {
                details.legal_name = legal_name;
            }
            if let Some(trade_name) = request.trade_name {
                details.trade_name = Some(trade_name);
            }
            if let Some(state_registration) = request.state_registration {
                details.state_registration = Some(state_registration);
            }
            if let Some(municipal_registration) = request.municipal_registration {
                details.municipal_registration = Some(municipal_registration);
            }
            if let Some(legal_representative) = request.legal_representative {
                details.legal_representative = Some(legal_representative);
            }
            if let Some(share_capital) = request.share_capital {
                details.share_capital = Some(share_capital);
            }
        }
        self.apply_classification(&mut customer, request.role, request.lead_source);

        let changes = self
            .apply_nested(
                &mut customer,
                &request.documents,
                &request.addresses,
                &request.contacts,
            )
            .await?;

        self.finish(customer, changes).await
    }

    fn apply_classification(
        &self,
        customer: &mut Customer,
        role: Option<CustomerRole>,
        lead_source: Option<LeadSource>,
    ) {
        if let Some(role) = role {
            customer.role = role;
        }
        if let Some(lead_source) = lead_source {
            customer.lead_source = Some(lead_source);
        }
    }

    /// Runs the document, address, and contact passes in order
    async fn apply_nested(
        &self,
        customer: &mut Customer,
        documents: &[DocumentPatch],
        addresses: &[AddressPatch],
        contacts: &[ContactPatch],
    ) -> Result<ChangeSet, CustomerError> {
        let mut changes = ChangeSet::new();
        self.apply_document_patches(customer, documents, &mut changes)
            .await?;
        self.apply_address_patches(customer, addresses, &mut changes)
            .await?;
        self.apply_contact_patches(customer, contacts, &mut changes)
            .await?;
        Ok(changes)
    }

    async fn apply_document_patches(
        &self,
        customer: &mut Customer,
        patches: &[DocumentPatch],
        changes: &mut ChangeSet,
    ) -> Result<(), CustomerError> {
        let today = Utc::now().date_naive();
        for patch in patches {
            // An earlier patch in the same list may already have touched this
            // entity; the aggregate copy carries those changes, the stored
            // copy does not.
            let mut document = match customer.document(patch.id) {
                Some(document) => document.clone(),
                None => self.gateway.load_document(patch.id).await?,
            };
            validation::assert_owned(document.customer_id, customer.id, "document", patch.id)?;
            validation::check_document_dates(patch.issue_date, patch.expiry_date, today)?;

            if let Some(issue_date) = patch.issue_date {
                document.issue_date = Some(issue_date);
            }
            if let Some(expiry_date) = patch.expiry_date {
                document.expiry_date = Some(expiry_date);
            }
            if let Some(issuing_authority) = &patch.issuing_authority {
                document.issuing_authority = Some(issuing_authority.clone());
            }
            if let Some(notes) = &patch.notes {
                document.notes = Some(notes.clone());
            }
            document.refresh_status(today);
            document.updated_at = Utc::now();

            customer.upsert_document(document.clone());
            changes.record_document(document);
        }
        Ok(())
    }

    async fn apply_address_patches(
        &self,
        customer: &mut Customer,
        patches: &[AddressPatch],
        changes: &mut ChangeSet,
    ) -> Result<(), CustomerError> {
        for patch in patches {
            let mut address = match customer.address(patch.id) {
                Some(address) => address.clone(),
                None => self.gateway.load_address(patch.id).await?,
            };
            validation::assert_owned(address.customer_id, customer.id, "address", patch.id)?;

            if let Some(principal) = patch.principal {
                // Toggling the flag without repeating the kind still has to
                // validate against the right scope.
                let scope_kind = patch.kind.unwrap_or(address.kind);
                validation::check_principal_address_in_aggregate(
                    customer,
                    patch.id,
                    scope_kind,
                    patch.principal,
                )?;
                validation::check_principal_address(
                    self.gateway.as_ref(),
                    customer.id,
                    patch.id,
                    scope_kind,
                    patch.principal,
                )
                .await?;
                address.principal = principal;
            }

            if let Some(kind) = patch.kind {
                address.kind = kind;
            }
            if let Some(street) = &patch.street {
                address.street = street.clone();
            }
            if let Some(number) = &patch.number {
                address.number = Some(number.clone());
            }
            if let Some(complement) = &patch.complement {
                address.complement = Some(complement.clone());
            }
            if let Some(district) = &patch.district {
                address.district = Some(district.clone());
            }
            if let Some(city) = &patch.city {
                address.city = city.clone();
            }
            if let Some(state) = &patch.state {
                address.state = Some(state.clone());
            }
            if let Some(postal_code) = &patch.postal_code {
                address.postal_code = postal_code.clone();
            }
            if let Some(country) = &patch.country {
                address.country = if country.trim().is_empty() {
                    DEFAULT_COUNTRY.to_string()
                } else {
                    country.clone()
                };
            }
            address.updated_at = Utc::now();

            customer.upsert_address(address.clone());
            changes.record_address(address);
        }
        Ok(())
    }

    async fn apply_contact_patches(
        &self,
        customer: &mut Customer,
        patches: &[ContactPatch],
        changes: &mut ChangeSet,
    ) -> Result<(), CustomerError> {
        for patch in patches {
            let mut contact = match customer.contact(patch.id) {
                Some(contact) => contact.clone(),
                None => self.gateway.load_contact(patch.id).await?,
            };
            validation::assert_owned(contact.customer_id, customer.id, "contact", patch.id)?;

            if let Some(principal) = patch.principal {
                validation::check_principal_contact_in_aggregate(
                    customer,
                    patch.id,
                    patch.principal,
                )?;
                validation::check_principal_contact(
                    self.gateway.as_ref(),
                    customer.id,
                    patch.id,
                    patch.principal,
                )
                .await?;
                contact.principal = principal;
            }

            contact.apply_channel(patch.kind, patch.value.clone());
            if let Some(notes) = &patch.notes {
                contact.notes = Some(notes.clone());
            }
            contact.updated_at = Utc::now();

            customer.upsert_contact(contact.clone());
            changes.record_contact(contact);
        }
        Ok(())
    }

    /// Commits the aggregate plus changes atomically and projects the result
    async fn finish(
        &self,
        mut customer: Customer,
        changes: ChangeSet,
    ) -> Result<CustomerView, CustomerError> {
        customer.touch();
        self.gateway.commit(&customer, &changes).await?;
        debug!(
            documents = changes.documents.len(),
            addresses = changes.addresses.len(),
            contacts = changes.contacts.len(),
            "customer update committed"
        );
        Ok(project(&customer))
    }
}
