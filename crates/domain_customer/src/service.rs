//! Registration and lifecycle operations
//!
//! Everything here other than the selective update engine: registering an
//! individual or organization (optionally with initial documents, addresses,
//! and contacts), reading a customer back, and the block / unblock /
//! soft-delete / restore lifecycle transitions. Lifecycle stamps record the
//! acting user from the operation context.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use validator::Validate;

use core_kernel::{CustomerId, OperationContext};

use crate::address::{Address, AddressKind};
use crate::contact::{Contact, ContactKind};
use crate::customer::{
    Customer, CustomerRole, Gender, IndividualDetails, LeadSource, OrganizationDetails,
};
use crate::document::{Document, DocumentKind};
use crate::error::CustomerError;
use crate::ports::{ChangeSet, CustomerGateway};
use crate::projection::{project, CustomerView};
use crate::validation;

/// Initial document supplied at registration
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub number: String,
    pub issuing_authority: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub principal: bool,
}

/// Initial address supplied at registration
#[derive(Debug, Clone, Deserialize)]
pub struct NewAddress {
    pub kind: AddressKind,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: Option<String>,
    #[serde(default)]
    pub principal: bool,
}

/// Initial contact supplied at registration
#[derive(Debug, Clone, Deserialize)]
pub struct NewContact {
    pub kind: ContactKind,
    pub value: String,
    #[serde(default)]
    pub principal: bool,
    pub notes: Option<String>,
}

/// Registration request for an individual (PF) customer
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterIndividualRequest {
    pub cpf: String,
    pub birth_date: NaiveDate,
    #[validate(length(min = 1, max = 120))]
    pub first_name: String,
    #[validate(length(min = 1, max = 120))]
    pub last_name: String,
    pub social_name: Option<String>,
    pub national_registry: Option<String>,
    pub gender: Option<Gender>,
    pub nationality: Option<String>,
    pub profession: Option<String>,
    pub role: CustomerRole,
    pub lead_source: Option<LeadSource>,
    #[serde(default)]
    pub documents: Vec<NewDocument>,
    #[serde(default)]
    pub addresses: Vec<NewAddress>,
    #[serde(default)]
    pub contacts: Vec<NewContact>,
}

/// Registration request for an organization (PJ) customer
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterOrganizationRequest {
    pub cnpj: String,
    #[validate(length(min = 1, max = 200))]
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub state_registration: Option<String>,
    pub municipal_registration: Option<String>,
    pub legal_representative: Option<String>,
    pub share_capital: Option<Decimal>,
    pub role: CustomerRole,
    pub lead_source: Option<LeadSource>,
    #[serde(default)]
    pub documents: Vec<NewDocument>,
    #[serde(default)]
    pub addresses: Vec<NewAddress>,
    #[serde(default)]
    pub contacts: Vec<NewContact>,
}

/// Registration, read, and lifecycle operations over the gateway
pub struct CustomerService {
    gateway: Arc<dyn CustomerGateway>,
}

impl CustomerService {
    /// Creates the service over a gateway
    pub fn new(gateway: Arc<dyn CustomerGateway>) -> Self {
        Self { gateway }
    }

    /// Registers a new individual customer
    ///
    /// The CPF is checksum-validated, normalized, and checked for
    /// uniqueness. Initial nested entities are validated with the same
    /// rules the update engine applies.
    #[instrument(skip(self, request), fields(operation = %ctx.operation))]
    pub async fn register_individual(
        &self,
        request: RegisterIndividualRequest,
        ctx: &OperationContext,
    ) -> Result<CustomerView, CustomerError> {
        request
            .validate()
            .map_err(|e| CustomerError::validation(e.to_string()))?;

        let mut customer = Customer::new_individual(
            IndividualDetails {
                cpf: request.cpf,
                birth_date: request.birth_date,
                first_name: request.first_name,
                last_name: request.last_name,
                social_name: request.social_name,
                national_registry: request.national_registry,
                gender: request.gender,
                nationality: request.nationality,
                profession: request.profession,
            },
            request.role,
        )?;
        customer.lead_source = request.lead_source;

        self.register(
            &mut customer,
            request.documents,
            request.addresses,
            request.contacts,
        )
        .await?;
        Ok(project(&customer))
    }

    /// Registers a new organization customer
    #[instrument(skip(self, request), fields(operation = %ctx.operation))]
    pub async fn register_organization(
        &self,
        request: RegisterOrganizationRequest,
        ctx: &OperationContext,
    ) -> Result<CustomerView, CustomerError> {
        request
            .validate()
            .map_err(|e| CustomerError::validation(e.to_string()))?;

        let mut customer = Customer::new_organization(
            OrganizationDetails {
                cnpj: request.cnpj,
                legal_name: request.legal_name,
                trade_name: request.trade_name,
                state_registration: request.state_registration,
                municipal_registration: request.municipal_registration,
                legal_representative: request.legal_representative,
                share_capital: request.share_capital,
            },
            request.role,
        )?;
        customer.lead_source = request.lead_source;

        self.register(
            &mut customer,
            request.documents,
            request.addresses,
            request.contacts,
        )
        .await?;
        Ok(project(&customer))
    }

    /// Shared tail of both registrations: uniqueness, nested entities, save
    async fn register(
        &self,
        customer: &mut Customer,
        documents: Vec<NewDocument>,
        addresses: Vec<NewAddress>,
        contacts: Vec<NewContact>,
    ) -> Result<(), CustomerError> {
        if self.gateway.exists_tax_id(customer.tax_id_digits()).await? {
            return Err(CustomerError::DuplicateTaxId(
                customer.tax_id_digits().to_string(),
            ));
        }

        attach_documents(customer, documents)?;
        attach_addresses(customer, addresses)?;
        attach_contacts(customer, contacts)?;

        self.gateway.save_new(customer).await?;
        debug!(customer = %customer.id, kind = %customer.kind(), "customer registered");
        Ok(())
    }

    /// Loads a customer and projects it
    #[instrument(skip(self))]
    pub async fn get(&self, id: CustomerId) -> Result<CustomerView, CustomerError> {
        let customer = self.gateway.load_customer(id).await?;
        Ok(project(&customer))
    }

    /// Blocks a customer, recording reason and acting user
    #[instrument(skip(self, reason), fields(operation = %ctx.operation))]
    pub async fn block(
        &self,
        id: CustomerId,
        reason: Option<String>,
        ctx: &OperationContext,
    ) -> Result<CustomerView, CustomerError> {
        self.transition(id, |customer| {
            customer.block(reason, ctx.initiated_by.clone());
        })
        .await
    }

    /// Removes a customer's block
    #[instrument(skip(self), fields(operation = %ctx.operation))]
    pub async fn unblock(
        &self,
        id: CustomerId,
        ctx: &OperationContext,
    ) -> Result<CustomerView, CustomerError> {
        self.transition(id, |customer| customer.unblock()).await
    }

    /// Soft-deletes a customer, recording reason and acting user
    ///
    /// The aggregate stays loadable; only the active flag drops.
    #[instrument(skip(self, reason), fields(operation = %ctx.operation))]
    pub async fn soft_delete(
        &self,
        id: CustomerId,
        reason: Option<String>,
        ctx: &OperationContext,
    ) -> Result<CustomerView, CustomerError> {
        self.transition(id, |customer| {
            customer.soft_delete(reason, ctx.initiated_by.clone());
        })
        .await
    }

    /// Restores a soft-deleted customer
    #[instrument(skip(self), fields(operation = %ctx.operation))]
    pub async fn restore(
        &self,
        id: CustomerId,
        ctx: &OperationContext,
    ) -> Result<CustomerView, CustomerError> {
        self.transition(id, |customer| customer.restore()).await
    }

    async fn transition(
        &self,
        id: CustomerId,
        apply: impl FnOnce(&mut Customer),
    ) -> Result<CustomerView, CustomerError> {
        let mut customer = self.gateway.load_customer(id).await?;
        apply(&mut customer);
        self.gateway.commit(&customer, &ChangeSet::new()).await?;
        Ok(project(&customer))
    }
}

fn attach_documents(
    customer: &mut Customer,
    documents: Vec<NewDocument>,
) -> Result<(), CustomerError> {
    let today = Utc::now().date_naive();
    for spec in documents {
        validation::check_document_dates(spec.issue_date, spec.expiry_date, today)?;
        let mut document = Document::new(customer.id, spec.kind, spec.number);
        document.issuing_authority = spec.issuing_authority;
        document.issue_date = spec.issue_date;
        document.expiry_date = spec.expiry_date;
        document.principal = spec.principal;
        document.refresh_status(today);
        customer.upsert_document(document);
    }
    Ok(())
}

fn attach_addresses(
    customer: &mut Customer,
    addresses: Vec<NewAddress>,
) -> Result<(), CustomerError> {
    for spec in addresses {
        if spec.principal
            && customer
                .addresses
                .iter()
                .any(|a| a.kind == spec.kind && a.principal)
        {
            return Err(CustomerError::duplicate_principal(format!(
                "address of kind {:?} for customer {}",
                spec.kind, customer.id
            )));
        }
        let mut address = Address::new(
            customer.id,
            spec.kind,
            spec.street,
            spec.city,
            spec.postal_code,
            spec.country,
        );
        address.number = spec.number;
        address.complement = spec.complement;
        address.district = spec.district;
        address.state = spec.state;
        address.principal = spec.principal;
        customer.upsert_address(address);
    }
    Ok(())
}

fn attach_contacts(customer: &mut Customer, contacts: Vec<NewContact>) -> Result<(), CustomerError> {
    for spec in contacts {
        if spec.principal && customer.contacts.iter().any(|c| c.principal) {
            return Err(CustomerError::duplicate_principal(format!(
                "contact for customer {}",
                customer.id
            )));
        }
        let mut contact = Contact::new(customer.id, spec.kind, spec.value);
        contact.principal = spec.principal;
        contact.notes = spec.notes;
        customer.upsert_contact(contact);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentStatus;
    use crate::ports::mock::MockCustomerGateway;

    fn service() -> (CustomerService, Arc<MockCustomerGateway>) {
        let gateway = Arc::new(MockCustomerGateway::new());
        (CustomerService::new(gateway.clone()), gateway)
    }

    fn ctx() -> OperationContext {
        OperationContext::new("test").initiated_by("tester")
    }

    fn individual_request() -> RegisterIndividualRequest {
        RegisterIndividualRequest {
            cpf: "529.982.247-25".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 3, 12).unwrap(),
            first_name: "Ana".to_string(),
            last_name: "Souza".to_string(),
            social_name: None,
            national_registry: None,
            gender: Some(Gender::Female),
            nationality: None,
            profession: Some("Engineer".to_string()),
            role: CustomerRole::Client,
            lead_source: Some(LeadSource::Referral),
            documents: vec![],
            addresses: vec![],
            contacts: vec![],
        }
    }

    fn organization_request() -> RegisterOrganizationRequest {
        RegisterOrganizationRequest {
            cnpj: "11.222.333/0001-40".to_string(),
            legal_name: "Acme Comercio Ltda".to_string(),
            trade_name: Some("Acme".to_string()),
            state_registration: None,
            municipal_registration: None,
            legal_representative: None,
            share_capital: None,
            role: CustomerRole::Prospect,
            lead_source: None,
            documents: vec![],
            addresses: vec![],
            contacts: vec![],
        }
    }

    #[tokio::test]
    async fn test_register_individual() {
        let (service, _) = service();
        let view = service
            .register_individual(individual_request(), &ctx())
            .await
            .unwrap();
        assert_eq!(view.tax_id, "529.982.247-25");
        assert_eq!(view.display_name, "Ana Souza");
        assert!(view.active);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_cpf() {
        let (service, _) = service();
        let mut request = individual_request();
        request.cpf = "52998224726".to_string();
        let err = service
            .register_individual(request, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::InvalidTaxId(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_tax_id() {
        let (service, _) = service();
        service
            .register_individual(individual_request(), &ctx())
            .await
            .unwrap();
        let err = service
            .register_individual(individual_request(), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::DuplicateTaxId(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_blank_name() {
        let (service, _) = service();
        let mut request = individual_request();
        request.first_name = String::new();
        let err = service
            .register_individual(request, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_organization_with_nested_entities() {
        let (service, _) = service();
        let mut request = organization_request();
        request.addresses = vec![NewAddress {
            kind: AddressKind::Commercial,
            street: "Av. Central".to_string(),
            number: Some("1200".to_string()),
            complement: None,
            district: None,
            city: "Sao Paulo".to_string(),
            state: Some("SP".to_string()),
            postal_code: "01000-000".to_string(),
            country: None,
            principal: true,
        }];
        request.contacts = vec![NewContact {
            kind: ContactKind::Email,
            value: "contato@acme.example".to_string(),
            principal: true,
            notes: None,
        }];
        let view = service
            .register_organization(request, &ctx())
            .await
            .unwrap();
        assert_eq!(view.tax_id, "11.222.333/0001-40");
        assert_eq!(view.addresses.len(), 1);
        assert_eq!(view.addresses[0].country, "BR");
        assert!(view.contacts[0].principal);
    }

    #[tokio::test]
    async fn test_register_rejects_two_principal_addresses_same_kind() {
        let (service, _) = service();
        let mut request = organization_request();
        let addr = NewAddress {
            kind: AddressKind::Commercial,
            street: "Av. Central".to_string(),
            number: None,
            complement: None,
            district: None,
            city: "Sao Paulo".to_string(),
            state: None,
            postal_code: "01000-000".to_string(),
            country: None,
            principal: true,
        };
        request.addresses = vec![addr.clone(), addr];
        let err = service
            .register_organization(request, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::DuplicatePrincipal(_)));
    }

    #[tokio::test]
    async fn test_register_with_expired_document_gets_expired_status() {
        let (service, _) = service();
        let mut request = individual_request();
        request.documents = vec![NewDocument {
            kind: DocumentKind::Passport,
            number: "FX123456".to_string(),
            issuing_authority: Some("DPF".to_string()),
            issue_date: Some(NaiveDate::from_ymd_opt(2010, 1, 1).unwrap()),
            expiry_date: Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            principal: false,
        }];
        let view = service
            .register_individual(request, &ctx())
            .await
            .unwrap();
        assert_eq!(view.documents[0].status, DocumentStatus::Expired);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_document_window() {
        let (service, _) = service();
        let mut request = individual_request();
        request.documents = vec![NewDocument {
            kind: DocumentKind::Passport,
            number: "FX123456".to_string(),
            issuing_authority: None,
            issue_date: Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            expiry_date: Some(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()),
            principal: false,
        }];
        let err = service
            .register_individual(request, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, CustomerError::InvalidDateRange(_)));
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let (service, _) = service();
        let err = service.get(CustomerId::new_v7()).await.unwrap_err();
        assert!(matches!(err, CustomerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_block_and_unblock() {
        let (service, _) = service();
        let view = service
            .register_individual(individual_request(), &ctx())
            .await
            .unwrap();
        let id: CustomerId = view.id.parse().unwrap();

        let blocked = service
            .block(id, Some("fraud review".to_string()), &ctx())
            .await
            .unwrap();
        assert!(blocked.blocked);
        let stamp = blocked.block_stamp.unwrap();
        assert_eq!(stamp.reason.as_deref(), Some("fraud review"));
        assert_eq!(stamp.by.as_deref(), Some("tester"));

        let unblocked = service.unblock(id, &ctx()).await.unwrap();
        assert!(!unblocked.blocked);
        assert!(unblocked.block_stamp.is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore() {
        let (service, gateway) = service();
        let view = service
            .register_organization(organization_request(), &ctx())
            .await
            .unwrap();
        let id: CustomerId = view.id.parse().unwrap();

        let deleted = service.soft_delete(id, None, &ctx()).await.unwrap();
        assert!(!deleted.active);
        assert!(deleted.delete_stamp.is_some());

        // Soft-deleted aggregates stay loadable
        assert!(gateway.load_customer(id).await.is_ok());

        let restored = service.restore(id, &ctx()).await.unwrap();
        assert!(restored.active);
        assert!(restored.delete_stamp.is_none());
    }
}
