//! PostgreSQL persistence for the customer registry
//!
//! Implements the domain's `CustomerGateway` port over SQLx. The crate is
//! split in two layers: repositories own the SQL and row types, adapters
//! translate rows to domain aggregates and database errors to port errors.
//!
//! The commit path is the transaction boundary the update engine relies on:
//! the aggregate row and every changed nested entity are applied in one
//! transaction or not at all.

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresCustomerGateway;
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};
pub use repositories::CustomerRepository;
