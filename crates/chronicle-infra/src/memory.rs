//! In-memory repository set - used as fallback when no database is
//! configured, and as the test double for visibility scenarios.
//! Data is lost on process restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use chronicle_core::domain::{
    Author, Category, Comment, CommentWithAuthor, Location, Post, PostWithMeta,
};
use chronicle_core::error::RepoError;
use chronicle_core::ports::{
    AuthorRepository, BaseRepository, CategoryRepository, CommentRepository, LocationRepository,
    PageRequest, PostRepository,
};
use chronicle_core::visibility::{self, PostScope};

#[derive(Default)]
struct Inner {
    authors: HashMap<Uuid, Author>,
    posts: HashMap<Uuid, Post>,
    categories: HashMap<Uuid, Category>,
    locations: HashMap<Uuid, Location>,
    comments: HashMap<Uuid, Comment>,
}

/// Shared in-memory entity store. Cheap to clone; all handles point at
/// the same maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authors(&self) -> MemoryAuthorRepository {
        MemoryAuthorRepository(self.clone())
    }

    pub fn posts(&self) -> MemoryPostRepository {
        MemoryPostRepository(self.clone())
    }

    pub fn categories(&self) -> MemoryCategoryRepository {
        MemoryCategoryRepository(self.clone())
    }

    pub fn locations(&self) -> MemoryLocationRepository {
        MemoryLocationRepository(self.clone())
    }

    pub fn comments(&self) -> MemoryCommentRepository {
        MemoryCommentRepository(self.clone())
    }
}

#[derive(Clone)]
pub struct MemoryAuthorRepository(MemoryStore);

#[derive(Clone)]
pub struct MemoryPostRepository(MemoryStore);

#[derive(Clone)]
pub struct MemoryCategoryRepository(MemoryStore);

#[derive(Clone)]
pub struct MemoryLocationRepository(MemoryStore);

#[derive(Clone)]
pub struct MemoryCommentRepository(MemoryStore);

#[async_trait]
impl BaseRepository<Author, Uuid> for MemoryAuthorRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Author>, RepoError> {
        Ok(self.0.inner.read().await.authors.get(&id).cloned())
    }

    async fn save(&self, entity: Author) -> Result<Author, RepoError> {
        let mut inner = self.0.inner.write().await;
        let clash = inner.authors.values().any(|a| {
            a.id != entity.id && (a.username == entity.username || a.email == entity.email)
        });
        if clash {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        inner.authors.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.0.inner.write().await;
        if inner.authors.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        // Cascade: the author's posts go with them, taking every comment
        // on those posts along, plus the author's comments elsewhere.
        let removed_posts: Vec<Uuid> = inner
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        inner.posts.retain(|_, p| p.author_id != id);
        inner
            .comments
            .retain(|_, c| c.author_id != id && !removed_posts.contains(&c.post_id));
        Ok(())
    }
}

#[async_trait]
impl AuthorRepository for MemoryAuthorRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Author>, RepoError> {
        let inner = self.0.inner.read().await;
        Ok(inner
            .authors
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Author>, RepoError> {
        let inner = self.0.inner.read().await;
        Ok(inner.authors.values().find(|a| a.email == email).cloned())
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for MemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.0.inner.read().await.posts.get(&id).cloned())
    }

    async fn save(&self, entity: Post) -> Result<Post, RepoError> {
        let mut inner = self.0.inner.write().await;
        inner.posts.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.0.inner.write().await;
        if inner.posts.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        inner.comments.retain(|_, c| c.post_id != id);
        Ok(())
    }
}

impl MemoryPostRepository {
    fn hydrate(inner: &Inner, post: &Post) -> PostWithMeta {
        PostWithMeta {
            post: post.clone(),
            author_username: inner
                .authors
                .get(&post.author_id)
                .map(|a| a.username.clone())
                .unwrap_or_default(),
            category: post
                .category_id
                .and_then(|id| inner.categories.get(&id).cloned()),
            location: post
                .location_id
                .and_then(|id| inner.locations.get(&id).cloned()),
            comment_count: inner
                .comments
                .values()
                .filter(|c| c.post_id == post.id)
                .count() as u64,
        }
    }

    fn in_scope(inner: &Inner, post: &Post, scope: PostScope, now: DateTime<Utc>) -> bool {
        let category = post.category_id.and_then(|id| inner.categories.get(&id));
        match scope {
            PostScope::EffectivelyPublished => {
                visibility::effectively_published(post, category, now)
            }
            PostScope::InCategory { category_id } => {
                post.category_id == Some(category_id)
                    && post.is_published
                    && post.pub_date <= now
            }
            PostScope::Profile {
                author_id,
                include_drafts,
            } => {
                post.author_id == author_id
                    && (include_drafts || visibility::effectively_published(post, category, now))
            }
        }
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn find_detail(&self, id: Uuid) -> Result<Option<PostWithMeta>, RepoError> {
        let inner = self.0.inner.read().await;
        Ok(inner.posts.get(&id).map(|p| Self::hydrate(&inner, p)))
    }

    async fn feed(
        &self,
        scope: PostScope,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> Result<(Vec<PostWithMeta>, u64), RepoError> {
        let inner = self.0.inner.read().await;

        let mut matching: Vec<&Post> = inner
            .posts
            .values()
            .filter(|p| Self::in_scope(&inner, p, scope, now))
            .collect();
        matching.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));

        let total = matching.len() as u64;
        let entries = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .map(|p| Self::hydrate(&inner, p))
            .collect();

        Ok((entries, total))
    }
}

#[async_trait]
impl BaseRepository<Category, Uuid> for MemoryCategoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        Ok(self.0.inner.read().await.categories.get(&id).cloned())
    }

    async fn save(&self, entity: Category) -> Result<Category, RepoError> {
        let mut inner = self.0.inner.write().await;
        let clash = inner
            .categories
            .values()
            .any(|c| c.id != entity.id && c.slug == entity.slug);
        if clash {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        inner.categories.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.0.inner.write().await;
        if inner.categories.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        // Weak reference: posts lose the category, not their life.
        for post in inner.posts.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MemoryCategoryRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let inner = self.0.inner.read().await;
        Ok(inner.categories.values().find(|c| c.slug == slug).cloned())
    }
}

#[async_trait]
impl BaseRepository<Location, Uuid> for MemoryLocationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Location>, RepoError> {
        Ok(self.0.inner.read().await.locations.get(&id).cloned())
    }

    async fn save(&self, entity: Location) -> Result<Location, RepoError> {
        let mut inner = self.0.inner.write().await;
        inner.locations.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.0.inner.write().await;
        if inner.locations.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        for post in inner.posts.values_mut() {
            if post.location_id == Some(id) {
                post.location_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LocationRepository for MemoryLocationRepository {}

#[async_trait]
impl BaseRepository<Comment, Uuid> for MemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.0.inner.read().await.comments.get(&id).cloned())
    }

    async fn save(&self, entity: Comment) -> Result<Comment, RepoError> {
        let mut inner = self.0.inner.write().await;
        inner.comments.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut inner = self.0.inner.write().await;
        if inner.comments.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for MemoryCommentRepository {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let inner = self.0.inner.read().await;
        let mut comments: Vec<&Comment> = inner
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(comments
            .into_iter()
            .map(|c| CommentWithAuthor {
                comment: c.clone(),
                author_username: inner
                    .authors
                    .get(&c.author_id)
                    .map(|a| a.username.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use chronicle_core::viewer::Viewer;
    use chronicle_core::visibility::{home_feed, profile_feed, resolve_single_post};

    async fn seed_author(store: &MemoryStore, username: &str) -> Author {
        let author = Author::new(username.into(), format!("{username}@example.com"), "h".into());
        store.authors().save(author).await.unwrap()
    }

    fn page() -> PageRequest {
        PageRequest::new(1, 10)
    }

    #[tokio::test]
    async fn home_feed_holds_only_effectively_published_posts() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let author = seed_author(&store, "alice").await;

        let mut visible = Post::new(author.id, "visible".into(), "b".into());
        visible.pub_date = now - TimeDelta::hours(2);
        store.posts().save(visible.clone()).await.unwrap();

        let mut draft = Post::new(author.id, "draft".into(), "b".into());
        draft.is_published = false;
        draft.pub_date = now - TimeDelta::hours(1);
        store.posts().save(draft).await.unwrap();

        let mut scheduled = Post::new(author.id, "scheduled".into(), "b".into());
        scheduled.pub_date = now + TimeDelta::hours(1);
        store.posts().save(scheduled).await.unwrap();

        let (entries, total) = store.posts().feed(home_feed(), now, page()).await.unwrap();

        assert_eq!(total, 1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].post.id, visible.id);
    }

    #[tokio::test]
    async fn unpublished_category_hides_post_except_from_author() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let author = seed_author(&store, "alice").await;

        let mut hidden = Category::new("Hidden".into(), "d".into(), "hidden".into());
        hidden.is_published = false;
        store.categories().save(hidden.clone()).await.unwrap();

        let mut post = Post::new(author.id, "post".into(), "b".into());
        post.pub_date = now - TimeDelta::hours(1);
        post.category_id = Some(hidden.id);
        store.posts().save(post.clone()).await.unwrap();

        // Hidden from the home feed and from another viewer's profile feed.
        let (entries, _) = store.posts().feed(home_feed(), now, page()).await.unwrap();
        assert!(entries.is_empty());

        let other = Viewer::User(Uuid::new_v4());
        let (entries, _) = store
            .posts()
            .feed(profile_feed(&other, author.id), now, page())
            .await
            .unwrap();
        assert!(entries.is_empty());

        // Present in the author's own profile feed.
        let own = Viewer::User(author.id);
        let (entries, _) = store
            .posts()
            .feed(profile_feed(&own, author.id), now, page())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].post.id, post.id);
    }

    #[tokio::test]
    async fn own_profile_feed_includes_drafts_ordered_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let author = seed_author(&store, "alice").await;

        let mut older = Post::new(author.id, "older".into(), "b".into());
        older.pub_date = now - TimeDelta::days(2);
        older.is_published = false;
        store.posts().save(older.clone()).await.unwrap();

        let mut newer = Post::new(author.id, "newer".into(), "b".into());
        newer.pub_date = now - TimeDelta::days(1);
        store.posts().save(newer.clone()).await.unwrap();

        let own = Viewer::User(author.id);
        let (entries, total) = store
            .posts()
            .feed(profile_feed(&own, author.id), now, page())
            .await
            .unwrap();

        assert_eq!(total, 2);
        assert_eq!(entries[0].post.id, newer.id);
        assert_eq!(entries[1].post.id, older.id);
    }

    #[tokio::test]
    async fn invisible_post_resolves_as_not_found_for_non_author() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let author = seed_author(&store, "alice").await;

        let mut draft = Post::new(author.id, "draft".into(), "b".into());
        draft.is_published = false;
        store.posts().save(draft.clone()).await.unwrap();

        let posts = store.posts();

        let for_author =
            resolve_single_post(&posts, &Viewer::User(author.id), draft.id, now)
                .await
                .unwrap();
        assert!(for_author.is_some());

        let for_other =
            resolve_single_post(&posts, &Viewer::User(Uuid::new_v4()), draft.id, now)
                .await
                .unwrap();
        assert!(for_other.is_none());

        let for_anon = resolve_single_post(&posts, &Viewer::Anonymous, draft.id, now)
            .await
            .unwrap();
        assert!(for_anon.is_none());
    }

    #[tokio::test]
    async fn comment_count_matches_comment_set() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let author = seed_author(&store, "alice").await;
        let commenter = seed_author(&store, "bob").await;

        let mut post = Post::new(author.id, "post".into(), "b".into());
        post.pub_date = now - TimeDelta::hours(1);
        store.posts().save(post.clone()).await.unwrap();

        for i in 0..3 {
            let comment = Comment::new(post.id, commenter.id, format!("comment {i}"));
            store.comments().save(comment).await.unwrap();
        }

        let detail = store.posts().find_detail(post.id).await.unwrap().unwrap();
        assert_eq!(detail.comment_count, 3);

        let listed = store.comments().list_for_post(post.id).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].author_username, "bob");
    }

    #[tokio::test]
    async fn comments_list_oldest_first() {
        let store = MemoryStore::new();
        let author = seed_author(&store, "alice").await;
        let post = Post::new(author.id, "post".into(), "b".into());
        store.posts().save(post.clone()).await.unwrap();

        let mut first = Comment::new(post.id, author.id, "first".into());
        first.created_at = Utc::now() - TimeDelta::minutes(10);
        store.comments().save(first).await.unwrap();

        let mut second = Comment::new(post.id, author.id, "second".into());
        second.created_at = Utc::now() - TimeDelta::minutes(5);
        store.comments().save(second).await.unwrap();

        let listed = store.comments().list_for_post(post.id).await.unwrap();
        assert_eq!(listed[0].comment.text, "first");
        assert_eq!(listed[1].comment.text, "second");
    }

    #[tokio::test]
    async fn deleting_category_nulls_post_reference() {
        let store = MemoryStore::new();
        let author = seed_author(&store, "alice").await;
        let category = Category::new("C".into(), "d".into(), "c".into());
        store.categories().save(category.clone()).await.unwrap();

        let mut post = Post::new(author.id, "post".into(), "b".into());
        post.category_id = Some(category.id);
        store.posts().save(post.clone()).await.unwrap();

        store.categories().delete(category.id).await.unwrap();

        let reloaded = store.posts().find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(reloaded.category_id, None);
    }

    #[tokio::test]
    async fn deleting_author_cascades_posts_and_comments() {
        let store = MemoryStore::new();
        let author = seed_author(&store, "alice").await;
        let post = Post::new(author.id, "post".into(), "b".into());
        store.posts().save(post.clone()).await.unwrap();
        let comment = Comment::new(post.id, author.id, "hi".into());
        store.comments().save(comment.clone()).await.unwrap();

        store.authors().delete(author.id).await.unwrap();

        assert!(store.posts().find_by_id(post.id).await.unwrap().is_none());
        assert!(
            store
                .comments()
                .find_by_id(comment.id)
                .await
                .unwrap()
                .is_none()
        );
    }
}
