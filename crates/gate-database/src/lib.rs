//! Session persistence for the Atrium Gate service.
//!
//! Exposes the [`SessionStore`] trait plus two backends: PostgreSQL for
//! production and an in-memory map for tests and dev.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemorySessionStore;
pub use migration::run_migrations;
pub use postgres::PostgresSessionStore;
pub use store::SessionStore;
