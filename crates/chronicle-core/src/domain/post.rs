use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, Location};

/// Post entity - a dated publication owned by an author.
///
/// `pub_date` may lie in the future to schedule a delayed publication;
/// such a post stays invisible to everyone but its author until the
/// date passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post. Publication defaults to "now, published".
    pub fn new(author_id: Uuid, title: String, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            title,
            body,
            pub_date: now,
            is_published: true,
            category_id: None,
            location_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A post together with its joined relations and comment count, as
/// feeds and the detail view present it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithMeta {
    pub post: Post,
    pub author_username: String,
    pub category: Option<Category>,
    pub location: Option<Location>,
    pub comment_count: u64,
}
