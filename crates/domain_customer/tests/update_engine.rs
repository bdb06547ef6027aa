//! End-to-end tests for the selective aggregate update engine
//!
//! Exercises the full flow against the in-memory gateway: selective
//! semantics, cross-entity invariants, and atomicity of rejected requests.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::{AddressId, OperationContext};
use domain_customer::ports::mock::MockCustomerGateway;
use domain_customer::{
    Address, AddressKind, AddressPatch, Contact, ContactKind, ContactPatch, Customer,
    CustomerError, CustomerGateway, CustomerRole, CustomerUpdateService, Document, DocumentKind,
    DocumentPatch, DocumentStatus, IndividualDetails, OrganizationDetails,
    UpdateIndividualRequest, UpdateOrganizationRequest,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ctx() -> OperationContext {
    OperationContext::new("update-test").initiated_by("tester")
}

fn individual() -> Customer {
    Customer::new_individual(
        IndividualDetails {
            cpf: "529.982.247-25".to_string(),
            birth_date: date(1990, 3, 12),
            first_name: "Ana".to_string(),
            last_name: "Souza".to_string(),
            social_name: None,
            national_registry: None,
            gender: None,
            nationality: Some("BR".to_string()),
            profession: Some("Engineer".to_string()),
        },
        CustomerRole::Client,
    )
    .unwrap()
}

fn organization() -> Customer {
    Customer::new_organization(
        OrganizationDetails {
            cnpj: "11.222.333/0001-40".to_string(),
            legal_name: "Acme Comercio Ltda".to_string(),
            trade_name: Some("Acme".to_string()),
            state_registration: None,
            municipal_registration: None,
            legal_representative: None,
            share_capital: Some(dec!(150000)),
        },
        CustomerRole::Client,
    )
    .unwrap()
}

/// Individual with one document, two addresses, and two contacts
fn populated_individual() -> Customer {
    let mut customer = individual();

    let mut passport = Document::new(customer.id, DocumentKind::Passport, "FX123456");
    passport.issue_date = Some(date(2018, 5, 1));
    passport.expiry_date = Some(date(2028, 5, 1));
    passport.status = DocumentStatus::Verified;
    customer.upsert_document(passport);

    let mut home = Address::new(
        customer.id,
        AddressKind::Residential,
        "Rua das Flores",
        "Recife",
        "50000-000",
        None,
    );
    home.principal = true;
    customer.upsert_address(home);
    customer.upsert_address(Address::new(
        customer.id,
        AddressKind::Residential,
        "Rua Nova",
        "Recife",
        "50000-001",
        None,
    ));

    let mut email = Contact::new(customer.id, ContactKind::Email, "ana@example.com");
    email.verified = true;
    email.principal = true;
    customer.upsert_contact(email);
    customer.upsert_contact(Contact::new(
        customer.id,
        ContactKind::Mobile,
        "+55 81 99999-0000",
    ));

    customer
}

async fn engine_with(customer: Customer) -> (CustomerUpdateService, Arc<MockCustomerGateway>) {
    let gateway = Arc::new(MockCustomerGateway::new());
    gateway.seed(customer).await;
    (CustomerUpdateService::new(gateway.clone()), gateway)
}

#[tokio::test]
async fn test_profession_only_update_touches_nothing_else() {
    let customer = populated_individual();
    let id = customer.id;
    let before = customer.clone();
    let (engine, gateway) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        profession: Some("Architect".to_string()),
        ..Default::default()
    };
    let view = engine.update_individual(id, request, &ctx()).await.unwrap();

    assert_eq!(view.display_name, "Ana Souza");
    assert_eq!(view.documents.len(), 1);
    assert_eq!(view.addresses.len(), 2);
    assert_eq!(view.contacts.len(), 2);

    let after = gateway.load_customer(id).await.unwrap();
    match &after.profile {
        domain_customer::CustomerProfile::Individual(i) => {
            assert_eq!(i.profession.as_deref(), Some("Architect"));
            assert_eq!(i.first_name, before_first_name(&before));
            assert_eq!(i.cpf, "52998224725");
        }
        _ => panic!("kind changed"),
    }
    assert_eq!(after.documents, before.documents);
    assert_eq!(after.addresses, before.addresses);
    assert_eq!(after.contacts, before.contacts);
}

fn before_first_name(customer: &Customer) -> String {
    match &customer.profile {
        domain_customer::CustomerProfile::Individual(i) => i.first_name.clone(),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_empty_request_is_a_committed_noop() {
    let customer = populated_individual();
    let id = customer.id;
    let (engine, _) = engine_with(customer).await;

    let view = engine
        .update_individual(id, UpdateIndividualRequest::default(), &ctx())
        .await
        .unwrap();
    assert_eq!(view.addresses.len(), 2);
}

#[tokio::test]
async fn test_update_organization_scalars() {
    let customer = organization();
    let id = customer.id;
    let (engine, _) = engine_with(customer).await;

    let request = UpdateOrganizationRequest {
        trade_name: Some("Acme Brasil".to_string()),
        share_capital: Some(dec!(500000)),
        ..Default::default()
    };
    let view = engine
        .update_organization(id, request, &ctx())
        .await
        .unwrap();
    assert_eq!(view.display_name, "Acme Brasil");
    match view.profile {
        domain_customer::projection::ProfileView::Organization(o) => {
            assert_eq!(o.share_capital, Some(dec!(500000)));
            assert_eq!(o.legal_name, "Acme Comercio Ltda");
        }
        _ => panic!("wrong profile"),
    }
}

#[tokio::test]
async fn test_kind_mismatch_is_rejected() {
    let customer = organization();
    let id = customer.id;
    let (engine, _) = engine_with(customer).await;

    let err = engine
        .update_individual(id, UpdateIndividualRequest::default(), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, CustomerError::KindMismatch { .. }));
}

#[tokio::test]
async fn test_unknown_customer_is_not_found() {
    let (engine, _) = engine_with(individual()).await;
    let err = engine
        .update_individual(
            core_kernel::CustomerId::new_v7(),
            UpdateIndividualRequest::default(),
            &ctx(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CustomerError::NotFound { .. }));
}

#[tokio::test]
async fn test_document_expiry_extension_resets_expired_to_pending() {
    let mut customer = individual();
    let mut doc = Document::new(customer.id, DocumentKind::NationalId, "99887766");
    doc.expiry_date = Some(date(2020, 1, 1));
    doc.status = DocumentStatus::Expired;
    let doc_id = doc.id;
    customer.upsert_document(doc);
    let id = customer.id;
    let (engine, gateway) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        documents: vec![DocumentPatch {
            expiry_date: Some(date(2030, 1, 1)),
            ..DocumentPatch::new(doc_id)
        }],
        ..Default::default()
    };
    engine.update_individual(id, request, &ctx()).await.unwrap();

    let stored = gateway.load_document(doc_id).await.unwrap();
    assert_eq!(stored.status, DocumentStatus::PendingVerification);
    assert_eq!(stored.expiry_date, Some(date(2030, 1, 1)));
}

#[tokio::test]
async fn test_document_window_violation_aborts_whole_request() {
    let customer = populated_individual();
    let id = customer.id;
    let doc_id = customer.documents[0].id;
    let (engine, gateway) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        profession: Some("Architect".to_string()),
        documents: vec![DocumentPatch {
            issue_date: Some(date(2025, 1, 1)),
            expiry_date: Some(date(2024, 1, 1)),
            ..DocumentPatch::new(doc_id)
        }],
        ..Default::default()
    };
    let err = engine
        .update_individual(id, request, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, CustomerError::InvalidDateRange(_)));

    // Nothing reached the gateway, including the scalar change
    let stored = gateway.load_customer(id).await.unwrap();
    match &stored.profile {
        domain_customer::CustomerProfile::Individual(i) => {
            assert_eq!(i.profession.as_deref(), Some("Engineer"));
        }
        _ => unreachable!(),
    }
    let doc = gateway.load_document(doc_id).await.unwrap();
    assert_eq!(doc.issue_date, Some(date(2018, 5, 1)));
}

#[tokio::test]
async fn test_far_future_expiry_is_rejected() {
    let customer = populated_individual();
    let id = customer.id;
    let doc_id = customer.documents[0].id;
    let (engine, _) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        documents: vec![DocumentPatch {
            expiry_date: Some(date(2999, 1, 1)),
            ..DocumentPatch::new(doc_id)
        }],
        ..Default::default()
    };
    let err = engine
        .update_individual(id, request, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, CustomerError::InvalidDateRange(_)));
}

#[tokio::test]
async fn test_second_principal_address_same_kind_rejected() {
    let customer = populated_individual();
    let id = customer.id;
    let other_id = customer.addresses[1].id;
    let (engine, gateway) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        addresses: vec![AddressPatch {
            principal: Some(true),
            ..AddressPatch::new(other_id)
        }],
        ..Default::default()
    };
    let err = engine
        .update_individual(id, request, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, CustomerError::DuplicatePrincipal(_)));

    let stored = gateway.load_address(other_id).await.unwrap();
    assert!(!stored.principal);
}

#[tokio::test]
async fn test_principal_allowed_when_kind_changes_in_same_patch() {
    let customer = populated_individual();
    let id = customer.id;
    let other_id = customer.addresses[1].id;
    let (engine, gateway) = engine_with(customer).await;

    // Moving the address to a kind with no principal makes the flag legal
    let request = UpdateIndividualRequest {
        addresses: vec![AddressPatch {
            kind: Some(AddressKind::Delivery),
            principal: Some(true),
            ..AddressPatch::new(other_id)
        }],
        ..Default::default()
    };
    engine.update_individual(id, request, &ctx()).await.unwrap();

    let stored = gateway.load_address(other_id).await.unwrap();
    assert!(stored.principal);
    assert_eq!(stored.kind, AddressKind::Delivery);
}

#[tokio::test]
async fn test_reasserting_principal_on_current_principal_is_idempotent() {
    let customer = populated_individual();
    let id = customer.id;
    let principal_id = customer.addresses[0].id;
    let (engine, _) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        addresses: vec![AddressPatch {
            principal: Some(true),
            ..AddressPatch::new(principal_id)
        }],
        ..Default::default()
    };
    assert!(engine.update_individual(id, request, &ctx()).await.is_ok());
}

#[tokio::test]
async fn test_two_principal_addresses_same_kind_in_one_request_rejected() {
    // No principal exists yet; the request itself tries to create two
    let mut customer = individual();
    let first = Address::new(
        customer.id,
        AddressKind::Residential,
        "Rua A",
        "Recife",
        "50000-000",
        None,
    );
    let second = Address::new(
        customer.id,
        AddressKind::Residential,
        "Rua B",
        "Recife",
        "50000-001",
        None,
    );
    let (first_id, second_id) = (first.id, second.id);
    customer.upsert_address(first);
    customer.upsert_address(second);
    let id = customer.id;
    let (engine, gateway) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        addresses: vec![
            AddressPatch {
                principal: Some(true),
                ..AddressPatch::new(first_id)
            },
            AddressPatch {
                principal: Some(true),
                ..AddressPatch::new(second_id)
            },
        ],
        ..Default::default()
    };
    let err = engine
        .update_individual(id, request, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, CustomerError::DuplicatePrincipal(_)));

    assert!(!gateway.load_address(first_id).await.unwrap().principal);
    assert!(!gateway.load_address(second_id).await.unwrap().principal);
}

#[tokio::test]
async fn test_two_principal_contacts_in_one_request_rejected() {
    let mut customer = individual();
    let phone = Contact::new(customer.id, ContactKind::Phone, "+55 11 98888-0000");
    let email = Contact::new(customer.id, ContactKind::Email, "ana@example.com");
    let (phone_id, email_id) = (phone.id, email.id);
    customer.upsert_contact(phone);
    customer.upsert_contact(email);
    let id = customer.id;
    let (engine, gateway) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        contacts: vec![
            ContactPatch {
                principal: Some(true),
                ..ContactPatch::new(phone_id, ContactKind::Phone, "+55 11 98888-0000")
            },
            ContactPatch {
                principal: Some(true),
                ..ContactPatch::new(email_id, ContactKind::Email, "ana@example.com")
            },
        ],
        ..Default::default()
    };
    let err = engine
        .update_individual(id, request, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, CustomerError::DuplicatePrincipal(_)));

    assert!(!gateway.load_contact(phone_id).await.unwrap().principal);
    assert!(!gateway.load_contact(email_id).await.unwrap().principal);
}

#[tokio::test]
async fn test_repeated_patches_for_one_document_accumulate() {
    let customer = populated_individual();
    let id = customer.id;
    let doc_id = customer.documents[0].id;
    let (engine, gateway) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        documents: vec![
            DocumentPatch {
                issuing_authority: Some("DPF".to_string()),
                ..DocumentPatch::new(doc_id)
            },
            DocumentPatch {
                notes: Some("renewal scheduled".to_string()),
                ..DocumentPatch::new(doc_id)
            },
        ],
        ..Default::default()
    };
    engine.update_individual(id, request, &ctx()).await.unwrap();

    let stored = gateway.load_document(doc_id).await.unwrap();
    assert_eq!(stored.issuing_authority.as_deref(), Some("DPF"));
    assert_eq!(stored.notes.as_deref(), Some("renewal scheduled"));
}

#[tokio::test]
async fn test_blank_country_falls_back_to_default() {
    let customer = populated_individual();
    let id = customer.id;
    let address_id = customer.addresses[1].id;
    let (engine, gateway) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        addresses: vec![AddressPatch {
            country: Some("  ".to_string()),
            street: Some("Rua Atualizada".to_string()),
            ..AddressPatch::new(address_id)
        }],
        ..Default::default()
    };
    engine.update_individual(id, request, &ctx()).await.unwrap();

    let stored = gateway.load_address(address_id).await.unwrap();
    assert_eq!(stored.country, domain_customer::DEFAULT_COUNTRY);
    assert_eq!(stored.street, "Rua Atualizada");
}

#[tokio::test]
async fn test_contact_value_change_resets_verified() {
    let customer = populated_individual();
    let id = customer.id;
    let email_id = customer.contacts[0].id;
    let (engine, gateway) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        contacts: vec![ContactPatch::new(
            email_id,
            ContactKind::Email,
            "ana.souza@example.com",
        )],
        ..Default::default()
    };
    engine.update_individual(id, request, &ctx()).await.unwrap();

    let stored = gateway.load_contact(email_id).await.unwrap();
    assert!(!stored.verified);
    assert_eq!(stored.value, "ana.souza@example.com");
}

#[tokio::test]
async fn test_contact_identical_channel_keeps_verified() {
    let customer = populated_individual();
    let id = customer.id;
    let email_id = customer.contacts[0].id;
    let (engine, gateway) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        contacts: vec![ContactPatch {
            notes: Some("preferred channel".to_string()),
            ..ContactPatch::new(email_id, ContactKind::Email, "ana@example.com")
        }],
        ..Default::default()
    };
    engine.update_individual(id, request, &ctx()).await.unwrap();

    let stored = gateway.load_contact(email_id).await.unwrap();
    assert!(stored.verified);
    assert_eq!(stored.notes.as_deref(), Some("preferred channel"));
}

#[tokio::test]
async fn test_second_principal_contact_rejected() {
    let customer = populated_individual();
    let id = customer.id;
    let mobile_id = customer.contacts[1].id;
    let mobile_value = customer.contacts[1].value.clone();
    let (engine, _) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        contacts: vec![ContactPatch {
            principal: Some(true),
            ..ContactPatch::new(mobile_id, ContactKind::Mobile, mobile_value)
        }],
        ..Default::default()
    };
    let err = engine
        .update_individual(id, request, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, CustomerError::DuplicatePrincipal(_)));
}

#[tokio::test]
async fn test_reasserting_principal_on_current_principal_contact_is_idempotent() {
    let customer = populated_individual();
    let id = customer.id;
    let email_id = customer.contacts[0].id;
    let (engine, gateway) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        contacts: vec![ContactPatch {
            principal: Some(true),
            ..ContactPatch::new(email_id, ContactKind::Email, "ana@example.com")
        }],
        ..Default::default()
    };
    engine.update_individual(id, request, &ctx()).await.unwrap();

    let stored = gateway.load_contact(email_id).await.unwrap();
    assert!(stored.principal);
    assert!(stored.verified);
}

#[tokio::test]
async fn test_patching_another_customers_entity_is_rejected() {
    let victim = populated_individual();
    let victim_address = victim.addresses[0].id;
    let gateway = Arc::new(MockCustomerGateway::new());
    gateway.seed(victim).await;

    let attacker = organization();
    let attacker_id = attacker.id;
    gateway.seed(attacker).await;

    let engine = CustomerUpdateService::new(gateway.clone());
    let request = UpdateOrganizationRequest {
        addresses: vec![AddressPatch {
            street: Some("Hijacked".to_string()),
            ..AddressPatch::new(victim_address)
        }],
        ..Default::default()
    };
    let err = engine
        .update_organization(attacker_id, request, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, CustomerError::OwnershipViolation { .. }));

    let stored = gateway.load_address(victim_address).await.unwrap();
    assert_eq!(stored.street, "Rua das Flores");
}

#[tokio::test]
async fn test_unknown_nested_id_is_not_found() {
    let customer = individual();
    let id = customer.id;
    let (engine, _) = engine_with(customer).await;

    let request = UpdateIndividualRequest {
        addresses: vec![AddressPatch::new(AddressId::new_v7())],
        ..Default::default()
    };
    let err = engine
        .update_individual(id, request, &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, CustomerError::NotFound { .. }));
}
