//! Repository implementations
//!
//! Repositories own the SQL: queries, transactions, and row types. They know
//! nothing about the domain model; the adapters translate between the two.

pub mod customer;

pub use customer::CustomerRepository;
