//! Customer repository implementation
//!
//! Database access for the customer registry. The aggregate is stored in one
//! `customers` table covering both kinds (the individual and organization
//! column groups are nullable, with the discriminant column selecting which
//! group is populated) plus one table per nested entity.
//!
//! Aggregate writes go through [`CustomerRepository::insert_aggregate`] and
//! [`CustomerRepository::commit_update`], each a single transaction; the
//! update path never persists nested entities outside of it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const CUSTOMER_COLUMNS: &str = r#"
    id, kind, role, lead_source,
    cpf, birth_date, first_name, last_name, social_name,
    national_registry, gender, nationality, profession,
    cnpj, legal_name, trade_name, state_registration,
    municipal_registration, legal_representative, share_capital,
    active, blocked, block_reason, blocked_at, blocked_by,
    delete_reason, deleted_at, deleted_by,
    created_at, updated_at
"#;

const DOCUMENT_COLUMNS: &str = r#"
    id, customer_id, kind, number, issuing_authority,
    issue_date, expiry_date, status, principal, notes,
    created_at, updated_at
"#;

const ADDRESS_COLUMNS: &str = r#"
    id, customer_id, kind, street, number, complement, district,
    city, state, postal_code, country, principal,
    created_at, updated_at
"#;

const CONTACT_COLUMNS: &str = r#"
    id, customer_id, kind, value, principal, verified, notes,
    created_at, updated_at
"#;

/// Repository for customer aggregates and their nested entities
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    /// Creates a new repository over the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Retrieves a customer row by identifier
    pub async fn get_customer(&self, id: Uuid) -> Result<CustomerRow, DatabaseError> {
        let query = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        sqlx::query_as::<_, CustomerRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::classify)?
            .ok_or_else(|| DatabaseError::not_found("Customer", id))
    }

    /// Retrieves all documents owned by a customer
    pub async fn list_documents(&self, customer_id: Uuid) -> Result<Vec<DocumentRow>, DatabaseError> {
        let query = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM customer_documents \
             WHERE customer_id = $1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, DocumentRow>(&query)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::classify)
    }

    /// Retrieves all addresses owned by a customer
    pub async fn list_addresses(&self, customer_id: Uuid) -> Result<Vec<AddressRow>, DatabaseError> {
        let query = format!(
            "SELECT {ADDRESS_COLUMNS} FROM customer_addresses \
             WHERE customer_id = $1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, AddressRow>(&query)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::classify)
    }

    /// Retrieves all contacts owned by a customer
    pub async fn list_contacts(&self, customer_id: Uuid) -> Result<Vec<ContactRow>, DatabaseError> {
        let query = format!(
            "SELECT {CONTACT_COLUMNS} FROM customer_contacts \
             WHERE customer_id = $1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, ContactRow>(&query)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::classify)
    }

    /// Retrieves a single document by identifier, whoever owns it
    pub async fn get_document(&self, id: Uuid) -> Result<DocumentRow, DatabaseError> {
        let query = format!("SELECT {DOCUMENT_COLUMNS} FROM customer_documents WHERE id = $1");
        sqlx::query_as::<_, DocumentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::classify)?
            .ok_or_else(|| DatabaseError::not_found("Document", id))
    }

    /// Retrieves a single address by identifier, whoever owns it
    pub async fn get_address(&self, id: Uuid) -> Result<AddressRow, DatabaseError> {
        let query = format!("SELECT {ADDRESS_COLUMNS} FROM customer_addresses WHERE id = $1");
        sqlx::query_as::<_, AddressRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::classify)?
            .ok_or_else(|| DatabaseError::not_found("Address", id))
    }

    /// Retrieves a single contact by identifier, whoever owns it
    pub async fn get_contact(&self, id: Uuid) -> Result<ContactRow, DatabaseError> {
        let query = format!("SELECT {CONTACT_COLUMNS} FROM customer_contacts WHERE id = $1");
        sqlx::query_as::<_, ContactRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::classify)?
            .ok_or_else(|| DatabaseError::not_found("Contact", id))
    }

    /// Checks whether a CPF or CNPJ is already registered
    pub async fn tax_id_exists(&self, digits: &str) -> Result<bool, DatabaseError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE cpf = $1 OR cnpj = $1)",
        )
        .bind(digits)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::classify)
    }

    /// Checks for another principal address of the same kind for a customer
    pub async fn other_principal_address_exists(
        &self,
        customer_id: Uuid,
        kind: DbAddressKind,
        exclude: Uuid,
    ) -> Result<bool, DatabaseError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM customer_addresses
                WHERE customer_id = $1 AND kind = $2 AND principal AND id <> $3
            )
            "#,
        )
        .bind(customer_id)
        .bind(kind)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::classify)
    }

    /// Checks for another principal contact for a customer
    pub async fn other_principal_contact_exists(
        &self,
        customer_id: Uuid,
        exclude: Uuid,
    ) -> Result<bool, DatabaseError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM customer_contacts
                WHERE customer_id = $1 AND principal AND id <> $2
            )
            "#,
        )
        .bind(customer_id)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::classify)
    }

    /// Inserts a new aggregate with its nested entities in one transaction
    pub async fn insert_aggregate(
        &self,
        customer: &CustomerRow,
        documents: &[DocumentRow],
        addresses: &[AddressRow],
        contacts: &[ContactRow],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::classify)?;

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, kind, role, lead_source,
                cpf, birth_date, first_name, last_name, social_name,
                national_registry, gender, nationality, profession,
                cnpj, legal_name, trade_name, state_registration,
                municipal_registration, legal_representative, share_capital,
                active, blocked, block_reason, blocked_at, blocked_by,
                delete_reason, deleted_at, deleted_by,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26, $27, $28, $29, $30
            )
            "#,
        )
        .bind(customer.id)
        .bind(customer.kind)
        .bind(customer.role)
        .bind(customer.lead_source)
        .bind(&customer.cpf)
        .bind(customer.birth_date)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.social_name)
        .bind(&customer.national_registry)
        .bind(customer.gender)
        .bind(&customer.nationality)
        .bind(&customer.profession)
        .bind(&customer.cnpj)
        .bind(&customer.legal_name)
        .bind(&customer.trade_name)
        .bind(&customer.state_registration)
        .bind(&customer.municipal_registration)
        .bind(&customer.legal_representative)
        .bind(customer.share_capital)
        .bind(customer.active)
        .bind(customer.blocked)
        .bind(&customer.block_reason)
        .bind(customer.blocked_at)
        .bind(&customer.blocked_by)
        .bind(&customer.delete_reason)
        .bind(customer.deleted_at)
        .bind(&customer.deleted_by)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::classify)?;

        for document in documents {
            upsert_document(&mut tx, document).await?;
        }
        for address in addresses {
            upsert_address(&mut tx, address).await?;
        }
        for contact in contacts {
            upsert_contact(&mut tx, contact).await?;
        }

        tx.commit().await.map_err(DatabaseError::classify)?;
        Ok(())
    }

    /// Applies an aggregate update and its changed nested entities atomically
    ///
    /// Updates the customer row's mutable columns and upserts exactly the
    /// nested rows handed in. The surrounding transaction is the atomicity
    /// boundary of the whole update operation.
    pub async fn commit_update(
        &self,
        customer: &CustomerRow,
        documents: &[DocumentRow],
        addresses: &[AddressRow],
        contacts: &[ContactRow],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::classify)?;

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                role = $2, lead_source = $3,
                first_name = $4, last_name = $5, social_name = $6,
                national_registry = $7, gender = $8, nationality = $9,
                profession = $10,
                legal_name = $11, trade_name = $12, state_registration = $13,
                municipal_registration = $14, legal_representative = $15,
                share_capital = $16,
                active = $17, blocked = $18,
                block_reason = $19, blocked_at = $20, blocked_by = $21,
                delete_reason = $22, deleted_at = $23, deleted_by = $24,
                updated_at = $25
            WHERE id = $1
            "#,
        )
        .bind(customer.id)
        .bind(customer.role)
        .bind(customer.lead_source)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.social_name)
        .bind(&customer.national_registry)
        .bind(customer.gender)
        .bind(&customer.nationality)
        .bind(&customer.profession)
        .bind(&customer.legal_name)
        .bind(&customer.trade_name)
        .bind(&customer.state_registration)
        .bind(&customer.municipal_registration)
        .bind(&customer.legal_representative)
        .bind(customer.share_capital)
        .bind(customer.active)
        .bind(customer.blocked)
        .bind(&customer.block_reason)
        .bind(customer.blocked_at)
        .bind(&customer.blocked_by)
        .bind(&customer.delete_reason)
        .bind(customer.deleted_at)
        .bind(&customer.deleted_by)
        .bind(customer.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::classify)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Customer", customer.id));
        }

        for document in documents {
            upsert_document(&mut tx, document).await?;
        }
        for address in addresses {
            upsert_address(&mut tx, address).await?;
        }
        for contact in contacts {
            upsert_contact(&mut tx, contact).await?;
        }

        tx.commit().await.map_err(DatabaseError::classify)?;
        Ok(())
    }
}

async fn upsert_document(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    document: &DocumentRow,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO customer_documents (
            id, customer_id, kind, number, issuing_authority,
            issue_date, expiry_date, status, principal, notes,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO UPDATE SET
            issuing_authority = EXCLUDED.issuing_authority,
            issue_date = EXCLUDED.issue_date,
            expiry_date = EXCLUDED.expiry_date,
            status = EXCLUDED.status,
            principal = EXCLUDED.principal,
            notes = EXCLUDED.notes,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(document.id)
    .bind(document.customer_id)
    .bind(document.kind)
    .bind(&document.number)
    .bind(&document.issuing_authority)
    .bind(document.issue_date)
    .bind(document.expiry_date)
    .bind(document.status)
    .bind(document.principal)
    .bind(&document.notes)
    .bind(document.created_at)
    .bind(document.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(DatabaseError::classify)?;
    Ok(())
}

async fn upsert_address(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    address: &AddressRow,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO customer_addresses (
            id, customer_id, kind, street, number, complement, district,
            city, state, postal_code, country, principal,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (id) DO UPDATE SET
            kind = EXCLUDED.kind,
            street = EXCLUDED.street,
            number = EXCLUDED.number,
            complement = EXCLUDED.complement,
            district = EXCLUDED.district,
            city = EXCLUDED.city,
            state = EXCLUDED.state,
            postal_code = EXCLUDED.postal_code,
            country = EXCLUDED.country,
            principal = EXCLUDED.principal,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(address.id)
    .bind(address.customer_id)
    .bind(address.kind)
    .bind(&address.street)
    .bind(&address.number)
    .bind(&address.complement)
    .bind(&address.district)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.postal_code)
    .bind(&address.country)
    .bind(address.principal)
    .bind(address.created_at)
    .bind(address.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(DatabaseError::classify)?;
    Ok(())
}

async fn upsert_contact(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    contact: &ContactRow,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO customer_contacts (
            id, customer_id, kind, value, principal, verified, notes,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE SET
            kind = EXCLUDED.kind,
            value = EXCLUDED.value,
            principal = EXCLUDED.principal,
            verified = EXCLUDED.verified,
            notes = EXCLUDED.notes,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(contact.id)
    .bind(contact.customer_id)
    .bind(contact.kind)
    .bind(&contact.value)
    .bind(contact.principal)
    .bind(contact.verified)
    .bind(&contact.notes)
    .bind(contact.created_at)
    .bind(contact.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(DatabaseError::classify)?;
    Ok(())
}

// ============================================================================
// Type definitions
// ============================================================================

/// Customer kind discriminant column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "customer_kind", rename_all = "snake_case")]
pub enum DbCustomerKind {
    Individual,
    Organization,
}

/// Customer role column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "customer_role", rename_all = "snake_case")]
pub enum DbCustomerRole {
    Client,
    Prospect,
    Partner,
}

/// Lead source column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "lead_source", rename_all = "snake_case")]
pub enum DbLeadSource {
    Website,
    Referral,
    SocialMedia,
    Advertising,
    Event,
}

/// Gender column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "gender", rename_all = "snake_case")]
pub enum DbGender {
    Male,
    Female,
    Other,
}

/// Document kind column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "document_kind", rename_all = "snake_case")]
pub enum DbDocumentKind {
    NationalId,
    Passport,
    DriverLicense,
    VoterId,
    WorkPermit,
}

/// Document status column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "document_status", rename_all = "snake_case")]
pub enum DbDocumentStatus {
    PendingVerification,
    Verified,
    Expired,
    Rejected,
}

/// Address kind column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "address_kind", rename_all = "snake_case")]
pub enum DbAddressKind {
    Residential,
    Commercial,
    Delivery,
    Billing,
    Pickup,
}

/// Contact kind column
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "contact_kind", rename_all = "snake_case")]
pub enum DbContactKind {
    Phone,
    Mobile,
    Email,
    Whatsapp,
}

// ============================================================================
// Row types
// ============================================================================

/// Database row for the customer aggregate root
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRow {
    pub id: Uuid,
    pub kind: DbCustomerKind,
    pub role: DbCustomerRole,
    pub lead_source: Option<DbLeadSource>,
    pub cpf: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub social_name: Option<String>,
    pub national_registry: Option<String>,
    pub gender: Option<DbGender>,
    pub nationality: Option<String>,
    pub profession: Option<String>,
    pub cnpj: Option<String>,
    pub legal_name: Option<String>,
    pub trade_name: Option<String>,
    pub state_registration: Option<String>,
    pub municipal_registration: Option<String>,
    pub legal_representative: Option<String>,
    pub share_capital: Option<Decimal>,
    pub active: bool,
    pub blocked: bool,
    pub block_reason: Option<String>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub blocked_by: Option<String>,
    pub delete_reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a customer document
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub kind: DbDocumentKind,
    pub number: String,
    pub issuing_authority: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub status: DbDocumentStatus,
    pub principal: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a customer address
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AddressRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub kind: DbAddressKind,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub district: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub principal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a customer contact
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContactRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub kind: DbContactKind,
    pub value: String,
    pub principal: bool,
    pub verified: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
