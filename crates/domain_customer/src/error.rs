//! Customer domain errors
//!
//! Every error here is a deterministic validation outcome: the update engine
//! raises it at the point of detection and aborts the rest of the operation.
//! The transport layer owns the translation to user-visible statuses; this
//! taxonomy only guarantees the kind is distinguishable and carries the
//! offending identifier or field.

use thiserror::Error;

use core_kernel::PortError;

use crate::customer::CustomerKind;

/// Errors that can occur in the customer domain
#[derive(Debug, Error)]
pub enum CustomerError {
    /// Customer or nested entity identifier did not resolve
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Nested entity resolves but belongs to a different customer
    #[error("{entity} {id} does not belong to customer {customer_id}")]
    OwnershipViolation {
        entity: String,
        id: String,
        customer_id: String,
    },

    /// Person or organization identifier failed the checksum
    #[error("Invalid tax identifier: {0}")]
    InvalidTaxId(String),

    /// Person or organization identifier already registered
    #[error("Tax identifier already registered: {0}")]
    DuplicateTaxId(String),

    /// Document validity window violates the date rules
    #[error("Invalid validity window: {0}")]
    InvalidDateRange(String),

    /// A second principal address of the same kind, or a second principal
    /// contact, would result
    #[error("Duplicate principal {0}")]
    DuplicatePrincipal(String),

    /// Operation dispatched against the wrong customer kind
    #[error("Operation expects an {expected} customer, found {actual}")]
    KindMismatch {
        expected: CustomerKind,
        actual: CustomerKind,
    },

    /// Request-level field validation failed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Failure inside the persistence gateway
    #[error("Gateway error: {0}")]
    Gateway(PortError),
}

impl CustomerError {
    /// Creates a NotFound error
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        CustomerError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates an OwnershipViolation error
    pub fn not_owned(
        entity: impl Into<String>,
        id: impl std::fmt::Display,
        customer_id: impl std::fmt::Display,
    ) -> Self {
        CustomerError::OwnershipViolation {
            entity: entity.into(),
            id: id.to_string(),
            customer_id: customer_id.to_string(),
        }
    }

    /// Creates an InvalidDateRange error
    pub fn invalid_date_range(message: impl Into<String>) -> Self {
        CustomerError::InvalidDateRange(message.into())
    }

    /// Creates a DuplicatePrincipal error
    pub fn duplicate_principal(scope: impl Into<String>) -> Self {
        CustomerError::DuplicatePrincipal(scope.into())
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        CustomerError::Validation(message.into())
    }
}

impl From<PortError> for CustomerError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => CustomerError::NotFound {
                entity: entity_type,
                id,
            },
            other => CustomerError::Gateway(other),
        }
    }
}
