//! # Chronicle Infrastructure
//!
//! Concrete implementations of the ports defined in `chronicle-core`:
//! SeaORM/Postgres repositories, an in-memory repository set used as
//! fallback and test double, and the JWT/Argon2 auth services.

pub mod auth;
pub mod database;
pub mod memory;

pub use auth::{Argon2PasswordService, JwtTokenService};
pub use database::DatabaseConnection;
pub use memory::MemoryStore;
