//! # warden-database
//!
//! PostgreSQL connection management and concrete store implementations
//! for the Warden persistence seams.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
