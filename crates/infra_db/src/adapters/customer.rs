//! PostgreSQL customer gateway adapter
//!
//! Implements the `CustomerGateway` port over the `CustomerRepository`:
//! translates domain aggregates to row shapes and back, and maps database
//! errors to port errors at the seam. The commit path hands the aggregate
//! plus the changed nested rows to a single repository transaction, which is
//! the atomicity boundary the update engine relies on.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{AddressId, ContactId, CustomerId, DocumentId, DomainPort, PortError};
use domain_customer::{
    Address, AddressKind, ChangeSet, Contact, ContactKind, Customer, CustomerGateway,
    CustomerKind, CustomerProfile, CustomerRole, Document, DocumentKind, DocumentStatus, Gender,
    IndividualDetails, LeadSource, LifecycleStamp, OrganizationDetails,
};

use crate::error::DatabaseError;
use crate::repositories::customer::{
    AddressRow, ContactRow, CustomerRepository, CustomerRow, DbAddressKind, DbContactKind,
    DbCustomerKind, DbCustomerRole, DbDocumentKind, DbDocumentStatus, DbGender, DbLeadSource,
    DocumentRow,
};

/// PostgreSQL-backed implementation of the `CustomerGateway` port
#[derive(Debug, Clone)]
pub struct PostgresCustomerGateway {
    repository: CustomerRepository,
}

impl PostgresCustomerGateway {
    /// Creates a new gateway over the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: CustomerRepository::new(pool),
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &CustomerRepository {
        &self.repository
    }
}

impl DomainPort for PostgresCustomerGateway {}

#[async_trait]
impl CustomerGateway for PostgresCustomerGateway {
    #[instrument(skip(self), fields(customer = %id))]
    async fn load_customer(&self, id: CustomerId) -> Result<Customer, PortError> {
        debug!("loading customer aggregate");
        let row = self
            .repository
            .get_customer(id.into())
            .await
            .map_err(db_to_port_error)?;
        let documents = self
            .repository
            .list_documents(id.into())
            .await
            .map_err(db_to_port_error)?;
        let addresses = self
            .repository
            .list_addresses(id.into())
            .await
            .map_err(db_to_port_error)?;
        let contacts = self
            .repository
            .list_contacts(id.into())
            .await
            .map_err(db_to_port_error)?;

        let mut customer = row_to_customer(row)?;
        customer.documents = documents.into_iter().map(row_to_document).collect();
        customer.addresses = addresses.into_iter().map(row_to_address).collect();
        customer.contacts = contacts.into_iter().map(row_to_contact).collect();
        Ok(customer)
    }

    async fn load_document(&self, id: DocumentId) -> Result<Document, PortError> {
        let row = self
            .repository
            .get_document(id.into())
            .await
            .map_err(db_to_port_error)?;
        Ok(row_to_document(row))
    }

    async fn load_address(&self, id: AddressId) -> Result<Address, PortError> {
        let row = self
            .repository
            .get_address(id.into())
            .await
            .map_err(db_to_port_error)?;
        Ok(row_to_address(row))
    }

    async fn load_contact(&self, id: ContactId) -> Result<Contact, PortError> {
        let row = self
            .repository
            .get_contact(id.into())
            .await
            .map_err(db_to_port_error)?;
        Ok(row_to_contact(row))
    }

    async fn exists_tax_id(&self, digits: &str) -> Result<bool, PortError> {
        self.repository
            .tax_id_exists(digits)
            .await
            .map_err(db_to_port_error)
    }

    async fn exists_other_principal_address(
        &self,
        customer_id: CustomerId,
        kind: AddressKind,
        exclude: AddressId,
    ) -> Result<bool, PortError> {
        self.repository
            .other_principal_address_exists(
                customer_id.into(),
                address_kind_to_db(kind),
                exclude.into(),
            )
            .await
            .map_err(db_to_port_error)
    }

    async fn exists_other_principal_contact(
        &self,
        customer_id: CustomerId,
        exclude: ContactId,
    ) -> Result<bool, PortError> {
        self.repository
            .other_principal_contact_exists(customer_id.into(), exclude.into())
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, customer), fields(customer = %customer.id))]
    async fn save_new(&self, customer: &Customer) -> Result<(), PortError> {
        debug!("inserting new customer aggregate");
        let row = customer_to_row(customer);
        let documents: Vec<_> = customer.documents.iter().map(document_to_row).collect();
        let addresses: Vec<_> = customer.addresses.iter().map(address_to_row).collect();
        let contacts: Vec<_> = customer.contacts.iter().map(contact_to_row).collect();
        self.repository
            .insert_aggregate(&row, &documents, &addresses, &contacts)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, customer, changes), fields(customer = %customer.id))]
    async fn commit(&self, customer: &Customer, changes: &ChangeSet) -> Result<(), PortError> {
        debug!(
            documents = changes.documents.len(),
            addresses = changes.addresses.len(),
            contacts = changes.contacts.len(),
            "committing aggregate update"
        );
        let row = customer_to_row(customer);
        let documents: Vec<_> = changes.documents.iter().map(document_to_row).collect();
        let addresses: Vec<_> = changes.addresses.iter().map(address_to_row).collect();
        let contacts: Vec<_> = changes.contacts.iter().map(contact_to_row).collect();
        self.repository
            .commit_update(&row, &documents, &addresses, &contacts)
            .await
            .map_err(db_to_port_error)
    }
}

// ============================================================================
// Conversion functions
// ============================================================================

/// Converts a database error to a port error
fn db_to_port_error(e: DatabaseError) -> PortError {
    match e {
        DatabaseError::NotFound { entity, id } => PortError::not_found(entity, id),
        DatabaseError::DuplicateEntry(msg) => PortError::conflict(msg),
        DatabaseError::ConnectionFailed(msg) => PortError::connection(msg),
        DatabaseError::PoolExhausted => PortError::connection(e.to_string()),
        other => PortError::internal(other.to_string()),
    }
}

fn row_to_customer(row: CustomerRow) -> Result<Customer, PortError> {
    let profile = match row.kind {
        DbCustomerKind::Individual => CustomerProfile::Individual(IndividualDetails {
            cpf: row.cpf.unwrap_or_default(),
            birth_date: row
                .birth_date
                .ok_or_else(|| PortError::internal("individual row missing birth_date"))?,
            first_name: row.first_name.unwrap_or_default(),
            last_name: row.last_name.unwrap_or_default(),
            social_name: row.social_name,
            national_registry: row.national_registry,
            gender: row.gender.map(gender_from_db),
            nationality: row.nationality,
            profession: row.profession,
        }),
        DbCustomerKind::Organization => CustomerProfile::Organization(OrganizationDetails {
            cnpj: row.cnpj.unwrap_or_default(),
            legal_name: row.legal_name.unwrap_or_default(),
            trade_name: row.trade_name,
            state_registration: row.state_registration,
            municipal_registration: row.municipal_registration,
            legal_representative: row.legal_representative,
            share_capital: row.share_capital,
        }),
    };

    let block_stamp = row.blocked_at.map(|at| LifecycleStamp {
        reason: row.block_reason,
        at,
        by: row.blocked_by,
    });
    let delete_stamp = row.deleted_at.map(|at| LifecycleStamp {
        reason: row.delete_reason,
        at,
        by: row.deleted_by,
    });

    Ok(Customer {
        id: CustomerId::from(row.id),
        profile,
        role: role_from_db(row.role),
        lead_source: row.lead_source.map(lead_source_from_db),
        active: row.active,
        blocked: row.blocked,
        block_stamp,
        delete_stamp,
        documents: Vec::new(),
        addresses: Vec::new(),
        contacts: Vec::new(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn customer_to_row(customer: &Customer) -> CustomerRow {
    let mut row = CustomerRow {
        id: customer.id.into(),
        kind: match customer.kind() {
            CustomerKind::Individual => DbCustomerKind::Individual,
            CustomerKind::Organization => DbCustomerKind::Organization,
        },
        role: role_to_db(customer.role),
        lead_source: customer.lead_source.map(lead_source_to_db),
        cpf: None,
        birth_date: None,
        first_name: None,
        last_name: None,
        social_name: None,
        national_registry: None,
        gender: None,
        nationality: None,
        profession: None,
        cnpj: None,
        legal_name: None,
        trade_name: None,
        state_registration: None,
        municipal_registration: None,
        legal_representative: None,
        share_capital: None,
        active: customer.active,
        blocked: customer.blocked,
        block_reason: customer.block_stamp.as_ref().and_then(|s| s.reason.clone()),
        blocked_at: customer.block_stamp.as_ref().map(|s| s.at),
        blocked_by: customer.block_stamp.as_ref().and_then(|s| s.by.clone()),
        delete_reason: customer.delete_stamp.as_ref().and_then(|s| s.reason.clone()),
        deleted_at: customer.delete_stamp.as_ref().map(|s| s.at),
        deleted_by: customer.delete_stamp.as_ref().and_then(|s| s.by.clone()),
        created_at: customer.created_at,
        updated_at: customer.updated_at,
    };

    match &customer.profile {
        CustomerProfile::Individual(i) => {
            row.cpf = Some(i.cpf.clone());
            row.birth_date = Some(i.birth_date);
            row.first_name = Some(i.first_name.clone());
            row.last_name = Some(i.last_name.clone());
            row.social_name = i.social_name.clone();
            row.national_registry = i.national_registry.clone();
            row.gender = i.gender.map(gender_to_db);
            row.nationality = i.nationality.clone();
            row.profession = i.profession.clone();
        }
        CustomerProfile::Organization(o) => {
            row.cnpj = Some(o.cnpj.clone());
            row.legal_name = Some(o.legal_name.clone());
            row.trade_name = o.trade_name.clone();
            row.state_registration = o.state_registration.clone();
            row.municipal_registration = o.municipal_registration.clone();
            row.legal_representative = o.legal_representative.clone();
            row.share_capital = o.share_capital;
        }
    }

    row
}

fn row_to_document(row: DocumentRow) -> Document {
    Document {
        id: DocumentId::from(row.id),
        customer_id: CustomerId::from(row.customer_id),
        kind: document_kind_from_db(row.kind),
        number: row.number,
        issuing_authority: row.issuing_authority,
        issue_date: row.issue_date,
        expiry_date: row.expiry_date,
        status: document_status_from_db(row.status),
        principal: row.principal,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn document_to_row(document: &Document) -> DocumentRow {
    DocumentRow {
        id: document.id.into(),
        customer_id: document.customer_id.into(),
        kind: document_kind_to_db(document.kind),
        number: document.number.clone(),
        issuing_authority: document.issuing_authority.clone(),
        issue_date: document.issue_date,
        expiry_date: document.expiry_date,
        status: document_status_to_db(document.status),
        principal: document.principal,
        notes: document.notes.clone(),
        created_at: document.created_at,
        updated_at: document.updated_at,
    }
}

fn row_to_address(row: AddressRow) -> Address {
    Address {
        id: AddressId::from(row.id),
        customer_id: CustomerId::from(row.customer_id),
        kind: address_kind_from_db(row.kind),
        street: row.street,
        number: row.number,
        complement: row.complement,
        district: row.district,
        city: row.city,
        state: row.state,
        postal_code: row.postal_code,
        country: row.country,
        principal: row.principal,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn address_to_row(address: &Address) -> AddressRow {
    AddressRow {
        id: address.id.into(),
        customer_id: address.customer_id.into(),
        kind: address_kind_to_db(address.kind),
        street: address.street.clone(),
        number: address.number.clone(),
        complement: address.complement.clone(),
        district: address.district.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        postal_code: address.postal_code.clone(),
        country: address.country.clone(),
        principal: address.principal,
        created_at: address.created_at,
        updated_at: address.updated_at,
    }
}

fn row_to_contact(row: ContactRow) -> Contact {
    Contact {
        id: ContactId::from(row.id),
        customer_id: CustomerId::from(row.customer_id),
        kind: contact_kind_from_db(row.kind),
        value: row.value,
        principal: row.principal,
        verified: row.verified,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn contact_to_row(contact: &Contact) -> ContactRow {
    ContactRow {
        id: contact.id.into(),
        customer_id: contact.customer_id.into(),
        kind: contact_kind_to_db(contact.kind),
        value: contact.value.clone(),
        principal: contact.principal,
        verified: contact.verified,
        notes: contact.notes.clone(),
        created_at: contact.created_at,
        updated_at: contact.updated_at,
    }
}

// ============================================================================
// Enum mappings
// ============================================================================

fn role_to_db(role: CustomerRole) -> DbCustomerRole {
    match role {
        CustomerRole::Client => DbCustomerRole::Client,
        CustomerRole::Prospect => DbCustomerRole::Prospect,
        CustomerRole::Partner => DbCustomerRole::Partner,
    }
}

fn role_from_db(role: DbCustomerRole) -> CustomerRole {
    match role {
        DbCustomerRole::Client => CustomerRole::Client,
        DbCustomerRole::Prospect => CustomerRole::Prospect,
        DbCustomerRole::Partner => CustomerRole::Partner,
    }
}

fn lead_source_to_db(source: LeadSource) -> DbLeadSource {
    match source {
        LeadSource::Website => DbLeadSource::Website,
        LeadSource::Referral => DbLeadSource::Referral,
        LeadSource::SocialMedia => DbLeadSource::SocialMedia,
        LeadSource::Advertising => DbLeadSource::Advertising,
        LeadSource::Event => DbLeadSource::Event,
    }
}

fn lead_source_from_db(source: DbLeadSource) -> LeadSource {
    match source {
        DbLeadSource::Website => LeadSource::Website,
        DbLeadSource::Referral => LeadSource::Referral,
        DbLeadSource::SocialMedia => LeadSource::SocialMedia,
        DbLeadSource::Advertising => LeadSource::Advertising,
        DbLeadSource::Event => LeadSource::Event,
    }
}

fn gender_to_db(gender: Gender) -> DbGender {
    match gender {
        Gender::Male => DbGender::Male,
        Gender::Female => DbGender::Female,
        Gender::Other => DbGender::Other,
    }
}

fn gender_from_db(gender: DbGender) -> Gender {
    match gender {
        DbGender::Male => Gender::Male,
        DbGender::Female => Gender::Female,
        DbGender::Other => Gender::Other,
    }
}

fn document_kind_to_db(kind: DocumentKind) -> DbDocumentKind {
    match kind {
        DocumentKind::NationalId => DbDocumentKind::NationalId,
        DocumentKind::Passport => DbDocumentKind::Passport,
        DocumentKind::DriverLicense => DbDocumentKind::DriverLicense,
        DocumentKind::VoterId => DbDocumentKind::VoterId,
        DocumentKind::WorkPermit => DbDocumentKind::WorkPermit,
    }
}

fn document_kind_from_db(kind: DbDocumentKind) -> DocumentKind {
    match kind {
        DbDocumentKind::NationalId => DocumentKind::NationalId,
        DbDocumentKind::Passport => DocumentKind::Passport,
        DbDocumentKind::DriverLicense => DocumentKind::DriverLicense,
        DbDocumentKind::VoterId => DocumentKind::VoterId,
        DbDocumentKind::WorkPermit => DocumentKind::WorkPermit,
    }
}

fn document_status_to_db(status: DocumentStatus) -> DbDocumentStatus {
    match status {
        DocumentStatus::PendingVerification => DbDocumentStatus::PendingVerification,
        DocumentStatus::Verified => DbDocumentStatus::Verified,
        DocumentStatus::Expired => DbDocumentStatus::Expired,
        DocumentStatus::Rejected => DbDocumentStatus::Rejected,
    }
}

fn document_status_from_db(status: DbDocumentStatus) -> DocumentStatus {
    match status {
        DbDocumentStatus::PendingVerification => DocumentStatus::PendingVerification,
        DbDocumentStatus::Verified => DocumentStatus::Verified,
        DbDocumentStatus::Expired => DocumentStatus::Expired,
        DbDocumentStatus::Rejected => DocumentStatus::Rejected,
    }
}

fn address_kind_to_db(kind: AddressKind) -> DbAddressKind {
    match kind {
        AddressKind::Residential => DbAddressKind::Residential,
        AddressKind::Commercial => DbAddressKind::Commercial,
        AddressKind::Delivery => DbAddressKind::Delivery,
        AddressKind::Billing => DbAddressKind::Billing,
        AddressKind::Pickup => DbAddressKind::Pickup,
    }
}

fn address_kind_from_db(kind: DbAddressKind) -> AddressKind {
    match kind {
        DbAddressKind::Residential => AddressKind::Residential,
        DbAddressKind::Commercial => AddressKind::Commercial,
        DbAddressKind::Delivery => AddressKind::Delivery,
        DbAddressKind::Billing => AddressKind::Billing,
        DbAddressKind::Pickup => AddressKind::Pickup,
    }
}

fn contact_kind_to_db(kind: ContactKind) -> DbContactKind {
    match kind {
        ContactKind::Phone => DbContactKind::Phone,
        ContactKind::Mobile => DbContactKind::Mobile,
        ContactKind::Email => DbContactKind::Email,
        ContactKind::Whatsapp => DbContactKind::Whatsapp,
    }
}

fn contact_kind_from_db(kind: DbContactKind) -> ContactKind {
    match kind {
        DbContactKind::Phone => ContactKind::Phone,
        DbContactKind::Mobile => ContactKind::Mobile,
        DbContactKind::Email => ContactKind::Email,
        DbContactKind::Whatsapp => ContactKind::Whatsapp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn individual() -> Customer {
        Customer::new_individual(
            IndividualDetails {
                cpf: "52998224725".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1990, 3, 12).unwrap(),
                first_name: "Ana".to_string(),
                last_name: "Souza".to_string(),
                social_name: None,
                national_registry: None,
                gender: Some(Gender::Female),
                nationality: None,
                profession: Some("Engineer".to_string()),
            },
            CustomerRole::Client,
        )
        .unwrap()
    }

    #[test]
    fn test_customer_row_roundtrip_individual() {
        let mut customer = individual();
        customer.block(Some("fraud review".to_string()), Some("ops".to_string()));
        let row = customer_to_row(&customer);
        assert_eq!(row.kind, DbCustomerKind::Individual);
        assert_eq!(row.cpf.as_deref(), Some("52998224725"));
        assert!(row.cnpj.is_none());

        let back = row_to_customer(row).unwrap();
        assert_eq!(back.id, customer.id);
        assert_eq!(back.profile, customer.profile);
        assert!(back.blocked);
        assert_eq!(back.block_stamp, customer.block_stamp);
    }

    #[test]
    fn test_individual_row_without_birth_date_is_rejected() {
        let mut row = customer_to_row(&individual());
        row.birth_date = None;
        assert!(row_to_customer(row).is_err());
    }

    #[test]
    fn test_document_row_roundtrip() {
        let customer = individual();
        let mut document = Document::new(customer.id, DocumentKind::Passport, "FX123456");
        document.status = DocumentStatus::Verified;
        document.expiry_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        let row = document_to_row(&document);
        assert_eq!(row.status, DbDocumentStatus::Verified);
        let back = row_to_document(row);
        assert_eq!(back, document);
    }

    #[test]
    fn test_db_error_translation() {
        let err = db_to_port_error(DatabaseError::not_found("Customer", "abc"));
        assert!(err.is_not_found());

        let err = db_to_port_error(DatabaseError::PoolExhausted);
        assert!(err.is_transient());

        let err = db_to_port_error(DatabaseError::DuplicateEntry("cpf".to_string()));
        assert!(matches!(err, PortError::Conflict { .. }));
    }
}
