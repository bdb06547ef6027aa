//! Core Kernel - Foundational types for the customer registry
//!
//! This crate provides the building blocks used across all domain modules:
//! - Strongly-typed identifiers for aggregates and nested entities
//! - Port error and marker types for the persistence gateway seam
//! - Explicit operation context for audit and correlation tagging

pub mod identifiers;
pub mod ports;

pub use identifiers::{AddressId, ContactId, CustomerId, DocumentId};
pub use ports::{DomainPort, OperationContext, PortError};
