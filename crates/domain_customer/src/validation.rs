//! Field-validity strategies and the ownership guard
//!
//! Three independent, stateless checks used by the update engine:
//!
//! - the document validity-window rule (dates in the patch itself),
//! - principal-uniqueness for addresses, scoped per (customer, kind),
//! - principal-uniqueness for contacts, scoped per customer.
//!
//! The uniqueness checks come in two forms: a read-only probe against the
//! gateway for stored state, and a scan of the in-memory aggregate for
//! changes applied earlier in the same request that the gateway has not
//! seen yet. The engine runs both and only applies the flag after they
//! pass. The ownership guard
//! runs right after each nested-entity load, before any field is touched,
//! so a request can never reach another customer's entity by reusing its
//! identifier.

use chrono::{Months, NaiveDate};

use core_kernel::{AddressId, ContactId, CustomerId};

use crate::address::AddressKind;
use crate::customer::Customer;
use crate::error::CustomerError;
use crate::ports::CustomerGateway;

/// Upper bound on how far in the future a document may expire
pub const MAX_EXPIRY_HORIZON_MONTHS: u32 = 50 * 12;

/// Validates the validity window carried by a document patch
///
/// An absent expiry always passes. The horizon check is evaluated against
/// `today`, independent of the issue date.
pub fn check_document_dates(
    issue_date: Option<NaiveDate>,
    expiry_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), CustomerError> {
    let Some(expiry) = expiry_date else {
        return Ok(());
    };
    if let Some(issue) = issue_date {
        if expiry < issue {
            return Err(CustomerError::invalid_date_range(format!(
                "expiry date {expiry} precedes issue date {issue}"
            )));
        }
    }
    let horizon = today
        .checked_add_months(Months::new(MAX_EXPIRY_HORIZON_MONTHS))
        .unwrap_or(NaiveDate::MAX);
    if expiry > horizon {
        return Err(CustomerError::invalid_date_range(format!(
            "expiry date {expiry} is more than 50 years in the future"
        )));
    }
    Ok(())
}

/// Enforces at most one principal address per (customer, kind)
///
/// A `false` or absent desired flag passes without querying. The address
/// being updated is excluded from the scan, so re-asserting the flag on the
/// current principal is idempotent.
pub async fn check_principal_address(
    gateway: &dyn CustomerGateway,
    customer_id: CustomerId,
    address_id: AddressId,
    kind: AddressKind,
    desired: Option<bool>,
) -> Result<(), CustomerError> {
    if desired != Some(true) {
        return Ok(());
    }
    if gateway
        .exists_other_principal_address(customer_id, kind, address_id)
        .await?
    {
        return Err(CustomerError::duplicate_principal(format!(
            "address of kind {kind:?} for customer {customer_id}"
        )));
    }
    Ok(())
}

/// Enforces the per-kind principal rule against the in-memory aggregate
///
/// The aggregate carries every address mutation applied earlier in the
/// current request, so this catches a second principal introduced by the
/// request itself. The address under update is excluded from the scan.
pub fn check_principal_address_in_aggregate(
    customer: &Customer,
    address_id: AddressId,
    kind: AddressKind,
    desired: Option<bool>,
) -> Result<(), CustomerError> {
    if desired != Some(true) {
        return Ok(());
    }
    if customer
        .addresses
        .iter()
        .any(|a| a.id != address_id && a.kind == kind && a.principal)
    {
        return Err(CustomerError::duplicate_principal(format!(
            "address of kind {kind:?} for customer {}",
            customer.id
        )));
    }
    Ok(())
}

/// Enforces at most one principal contact per customer, regardless of kind
pub async fn check_principal_contact(
    gateway: &dyn CustomerGateway,
    customer_id: CustomerId,
    contact_id: ContactId,
    desired: Option<bool>,
) -> Result<(), CustomerError> {
    if desired != Some(true) {
        return Ok(());
    }
    if gateway
        .exists_other_principal_contact(customer_id, contact_id)
        .await?
    {
        return Err(CustomerError::duplicate_principal(format!(
            "contact for customer {customer_id}"
        )));
    }
    Ok(())
}

/// Enforces the single-principal-contact rule against the in-memory aggregate
pub fn check_principal_contact_in_aggregate(
    customer: &Customer,
    contact_id: ContactId,
    desired: Option<bool>,
) -> Result<(), CustomerError> {
    if desired != Some(true) {
        return Ok(());
    }
    if customer
        .contacts
        .iter()
        .any(|c| c.id != contact_id && c.principal)
    {
        return Err(CustomerError::duplicate_principal(format!(
            "contact for customer {}",
            customer.id
        )));
    }
    Ok(())
}

/// Verifies that a loaded nested entity belongs to the aggregate under update
pub fn assert_owned(
    entity_customer_id: CustomerId,
    target_customer_id: CustomerId,
    entity: &str,
    entity_id: impl std::fmt::Display,
) -> Result<(), CustomerError> {
    if entity_customer_id != target_customer_id {
        return Err(CustomerError::not_owned(entity, entity_id, target_customer_id));
    }
    Ok(())
}
