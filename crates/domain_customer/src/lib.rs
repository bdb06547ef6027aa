//! Customer registry domain
//!
//! Aggregates individual (PF) and organization (PJ) customers with their
//! documents, addresses, and contacts, and exposes the operations of the
//! registry: registration, reads, lifecycle transitions, and the selective
//! aggregate update engine that applies partial multi-entity updates
//! atomically under the cross-entity invariants.
//!
//! Persistence is reached only through the [`CustomerGateway`] port; the
//! `mock` feature exposes an in-memory gateway for consumers' tests.

pub mod address;
pub mod contact;
pub mod customer;
pub mod document;
pub mod error;
pub mod ports;
pub mod projection;
pub mod service;
pub mod tax_id;
pub mod update;
pub mod validation;

pub use address::{Address, AddressKind, DEFAULT_COUNTRY};
pub use contact::{Contact, ContactKind};
pub use customer::{
    Customer, CustomerKind, CustomerProfile, CustomerRole, Gender, IndividualDetails, LeadSource,
    LifecycleStamp, OrganizationDetails,
};
pub use document::{Document, DocumentKind, DocumentStatus};
pub use error::CustomerError;
pub use ports::{ChangeSet, CustomerGateway};
pub use projection::{project, CustomerView};
pub use service::{
    CustomerService, NewAddress, NewContact, NewDocument, RegisterIndividualRequest,
    RegisterOrganizationRequest,
};
pub use update::{
    AddressPatch, ContactPatch, CustomerUpdateService, DocumentPatch, UpdateIndividualRequest,
    UpdateOrganizationRequest,
};
