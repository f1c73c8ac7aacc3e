//! # Chronicle Core
//!
//! The domain layer of the Chronicle blogging platform.
//! This crate contains pure business logic with zero infrastructure
//! dependencies: the entities, the viewer identity, the visibility
//! resolver and the ownership gate that the HTTP layer consults on
//! every request.

pub mod domain;
pub mod error;
pub mod ownership;
pub mod ports;
pub mod viewer;
pub mod visibility;

pub use error::DomainError;
pub use viewer::Viewer;
