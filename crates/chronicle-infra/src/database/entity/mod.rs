//! SeaORM entities mirroring the domain model.
//!
//! FK semantics: posts and comments cascade away with their author,
//! comments with their post; a deleted category or location is nulled
//! out on its posts instead.

pub mod author;
pub mod category;
pub mod comment;
pub mod location;
pub mod post;
