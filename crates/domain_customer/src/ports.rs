//! Customer domain ports
//!
//! The `CustomerGateway` trait defines everything the registry core needs
//! from its data source: aggregate and nested-entity loads, the read-only
//! principal-uniqueness probes, and the unit-of-work commit. Adapters
//! implement it over a database or an external system; the in-memory mock
//! here backs the unit tests.
//!
//! # Atomicity contract
//!
//! The update engine never persists mid-pass. It collects every mutated
//! nested entity into a [`ChangeSet`] and hands the whole aggregate plus the
//! change set to [`CustomerGateway::commit`], which must apply everything
//! under one transaction boundary. Concurrent writers to the same aggregate
//! are serialized (or conflict-detected) by the adapter's transaction
//! discipline, not by the engine.

use async_trait::async_trait;

use core_kernel::{AddressId, ContactId, CustomerId, DocumentId, DomainPort, PortError};

use crate::address::{Address, AddressKind};
use crate::contact::Contact;
use crate::customer::Customer;
use crate::document::Document;

/// Nested entities mutated during one update pass
///
/// Recording the same entity twice keeps only the latest copy.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub documents: Vec<Document>,
    pub addresses: Vec<Address>,
    pub contacts: Vec<Contact>,
}

impl ChangeSet {
    /// Creates an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no nested entity was touched
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.addresses.is_empty() && self.contacts.is_empty()
    }

    /// Records a mutated document
    pub fn record_document(&mut self, document: Document) {
        self.documents.retain(|d| d.id != document.id);
        self.documents.push(document);
    }

    /// Records a mutated address
    pub fn record_address(&mut self, address: Address) {
        self.addresses.retain(|a| a.id != address.id);
        self.addresses.push(address);
    }

    /// Records a mutated contact
    pub fn record_contact(&mut self, contact: Contact) {
        self.contacts.retain(|c| c.id != contact.id);
        self.contacts.push(contact);
    }
}

/// The persistence gateway consumed by the registry core
///
/// Nested-entity loads resolve globally by identifier; the caller runs the
/// ownership guard on the result. The `exists_other_principal_*` probes are
/// read-only and exclude the entity being updated.
#[async_trait]
pub trait CustomerGateway: DomainPort {
    /// Loads a customer aggregate (with nested collections) by public id
    async fn load_customer(&self, id: CustomerId) -> Result<Customer, PortError>;

    /// Loads a document by id, whoever owns it
    async fn load_document(&self, id: DocumentId) -> Result<Document, PortError>;

    /// Loads an address by id, whoever owns it
    async fn load_address(&self, id: AddressId) -> Result<Address, PortError>;

    /// Loads a contact by id, whoever owns it
    async fn load_contact(&self, id: ContactId) -> Result<Contact, PortError>;

    /// Whether any customer is already registered with these tax id digits
    async fn exists_tax_id(&self, digits: &str) -> Result<bool, PortError>;

    /// Whether another address of this kind for this customer is principal
    async fn exists_other_principal_address(
        &self,
        customer_id: CustomerId,
        kind: AddressKind,
        exclude: AddressId,
    ) -> Result<bool, PortError>;

    /// Whether another contact for this customer is principal
    async fn exists_other_principal_contact(
        &self,
        customer_id: CustomerId,
        exclude: ContactId,
    ) -> Result<bool, PortError>;

    /// Persists a newly registered aggregate
    async fn save_new(&self, customer: &Customer) -> Result<(), PortError>;

    /// Persists the aggregate and its mutated nested entities atomically
    async fn commit(&self, customer: &Customer, changes: &ChangeSet) -> Result<(), PortError>;
}

/// In-memory mock implementation of `CustomerGateway`
///
/// Stores aggregates and nested entities in hash maps, useful for unit
/// testing without a database.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory mock gateway
    #[derive(Debug, Default)]
    pub struct MockCustomerGateway {
        customers: Arc<RwLock<HashMap<CustomerId, Customer>>>,
        documents: Arc<RwLock<HashMap<DocumentId, Document>>>,
        addresses: Arc<RwLock<HashMap<AddressId, Address>>>,
        contacts: Arc<RwLock<HashMap<ContactId, Contact>>>,
    }

    impl MockCustomerGateway {
        /// Creates an empty mock gateway
        pub fn new() -> Self {
            Self::default()
        }

        /// Seeds an aggregate, indexing its nested entities by id
        pub async fn seed(&self, customer: Customer) {
            for document in &customer.documents {
                self.documents.write().await.insert(document.id, document.clone());
            }
            for address in &customer.addresses {
                self.addresses.write().await.insert(address.id, address.clone());
            }
            for contact in &customer.contacts {
                self.contacts.write().await.insert(contact.id, contact.clone());
            }
            self.customers.write().await.insert(customer.id, customer);
        }
    }

    impl DomainPort for MockCustomerGateway {}

    #[async_trait]
    impl CustomerGateway for MockCustomerGateway {
        async fn load_customer(&self, id: CustomerId) -> Result<Customer, PortError> {
            self.customers
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("customer", id))
        }

        async fn load_document(&self, id: DocumentId) -> Result<Document, PortError> {
            self.documents
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("document", id))
        }

        async fn load_address(&self, id: AddressId) -> Result<Address, PortError> {
            self.addresses
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("address", id))
        }

        async fn load_contact(&self, id: ContactId) -> Result<Contact, PortError> {
            self.contacts
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("contact", id))
        }

        async fn exists_tax_id(&self, digits: &str) -> Result<bool, PortError> {
            Ok(self
                .customers
                .read()
                .await
                .values()
                .any(|c| c.tax_id_digits() == digits))
        }

        async fn exists_other_principal_address(
            &self,
            customer_id: CustomerId,
            kind: AddressKind,
            exclude: AddressId,
        ) -> Result<bool, PortError> {
            Ok(self.addresses.read().await.values().any(|a| {
                a.customer_id == customer_id && a.kind == kind && a.principal && a.id != exclude
            }))
        }

        async fn exists_other_principal_contact(
            &self,
            customer_id: CustomerId,
            exclude: ContactId,
        ) -> Result<bool, PortError> {
            Ok(self
                .contacts
                .read()
                .await
                .values()
                .any(|c| c.customer_id == customer_id && c.principal && c.id != exclude))
        }

        async fn save_new(&self, customer: &Customer) -> Result<(), PortError> {
            self.seed(customer.clone()).await;
            Ok(())
        }

        async fn commit(&self, customer: &Customer, changes: &ChangeSet) -> Result<(), PortError> {
            for document in &changes.documents {
                self.documents.write().await.insert(document.id, document.clone());
            }
            for address in &changes.addresses {
                self.addresses.write().await.insert(address.id, address.clone());
            }
            for contact in &changes.contacts {
                self.contacts.write().await.insert(contact.id, contact.clone());
            }
            self.customers
                .write()
                .await
                .insert(customer.id, customer.clone());
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::customer::{CustomerRole, IndividualDetails};
        use chrono::NaiveDate;

        fn customer() -> Customer {
            Customer::new_individual(
                IndividualDetails {
                    cpf: "52998224725".to_string(),
                    birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                    first_name: "Ana".to_string(),
                    last_name: "Souza".to_string(),
                    social_name: None,
                    national_registry: None,
                    gender: None,
                    nationality: None,
                    profession: None,
                },
                CustomerRole::Client,
            )
            .unwrap()
        }

        #[tokio::test]
        async fn test_mock_load_not_found() {
            let gateway = MockCustomerGateway::new();
            let result = gateway.load_customer(CustomerId::new_v7()).await;
            assert!(result.unwrap_err().is_not_found());
        }

        #[tokio::test]
        async fn test_mock_seed_and_load() {
            let gateway = MockCustomerGateway::new();
            let customer = customer();
            let id = customer.id;
            gateway.seed(customer).await;
            let loaded = gateway.load_customer(id).await.unwrap();
            assert_eq!(loaded.id, id);
        }

        #[tokio::test]
        async fn test_mock_exists_tax_id() {
            let gateway = MockCustomerGateway::new();
            gateway.seed(customer()).await;
            assert!(gateway.exists_tax_id("52998224725").await.unwrap());
            assert!(!gateway.exists_tax_id("12345678909").await.unwrap());
        }

        #[tokio::test]
        async fn test_changeset_dedupes_by_id() {
            let mut changes = ChangeSet::new();
            let mut doc = Document::new(CustomerId::new_v7(), crate::document::DocumentKind::Passport, "A1");
            changes.record_document(doc.clone());
            doc.notes = Some("second".to_string());
            changes.record_document(doc);
            assert_eq!(changes.documents.len(), 1);
            assert_eq!(changes.documents[0].notes.as_deref(), Some("second"));
        }
    }
}
