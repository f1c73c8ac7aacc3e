//! Domain entities - the core business objects.

mod author;
mod category;
mod comment;
mod location;
mod post;

pub use author::Author;
pub use category::Category;
pub use comment::{Comment, CommentWithAuthor};
pub use location::Location;
pub use post::{Post, PostWithMeta};
