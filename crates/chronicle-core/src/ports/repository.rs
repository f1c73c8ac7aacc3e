use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Author, Category, Comment, CommentWithAuthor, Location, Post, PostWithMeta};
use crate::error::RepoError;
use crate::visibility::PostScope;

/// A page of a feed query: 1-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Row offset of this page. Saturates instead of overflowing, so
    /// an absurd page number yields an empty page, not a panic.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (create or update).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// Author repository with identity lookups.
#[async_trait]
pub trait AuthorRepository: BaseRepository<Author, Uuid> {
    async fn find_by_username(&self, username: &str) -> Result<Option<Author>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Author>, RepoError>;
}

/// Post repository: CRUD plus the scoped feed queries the visibility
/// resolver drives.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Load a post with its joined category, location, author username
    /// and comment count. Visibility is NOT applied here; callers run
    /// the result through the resolver.
    async fn find_detail(&self, id: Uuid) -> Result<Option<PostWithMeta>, RepoError>;

    /// Run a scoped feed query: filtered per the scope, ordered by
    /// `pub_date` descending, annotated with comment counts. Returns
    /// the page of entries and the total matching count.
    async fn feed(
        &self,
        scope: PostScope,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> Result<(Vec<PostWithMeta>, u64), RepoError>;
}

/// Category repository, addressed by slug from URLs.
#[async_trait]
pub trait CategoryRepository: BaseRepository<Category, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError>;
}

/// Location repository.
#[async_trait]
pub trait LocationRepository: BaseRepository<Location, Uuid> {}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// All comments of a post with author usernames, oldest first.
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_per_page_are_clamped_to_one() {
        let page = PageRequest::new(0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 1);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn offset_saturates_for_huge_page_numbers() {
        assert_eq!(PageRequest::new(u64::MAX, 100).offset(), u64::MAX);
        assert_eq!(PageRequest::new(2, u64::MAX).offset(), u64::MAX);
    }
}
