//! `PostgreSQL` adapters for item persistence.

pub mod models;
pub mod schema;
mod store;

pub use store::{ItemPgPool, PostgresItemStore};
