//! Port adapters
//!
//! Adapters implement the domain port traits over the repositories,
//! translating between domain aggregates and database rows and between
//! database errors and port errors.

pub mod customer;

pub use customer::PostgresCustomerGateway;
