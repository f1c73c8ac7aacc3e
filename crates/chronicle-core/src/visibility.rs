//! Visibility resolver - which posts a viewer may see.
//!
//! A post is *effectively published* iff its own flag is set, its
//! category (when it has one) is published, and its publication
//! timestamp is not in the future. Authors additionally see their own
//! drafts everywhere a draft can be addressed directly; public feeds
//! never include them.
//!
//! Feeds are not filtered post-by-post in memory. Instead the resolver
//! hands the storage layer an explicit [`PostScope`], a named query
//! replacing the implicit pre-filtered default collection the platform
//! historically relied on.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Category, Post, PostWithMeta};
use crate::error::RepoError;
use crate::ports::{PageRequest, PostRepository};
use crate::viewer::Viewer;

/// Named query scope over posts, consumed by repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    /// Effectively-published posts only: the home feed.
    EffectivelyPublished,
    /// Published, past-dated posts of one category. The category's own
    /// published flag is checked at lookup time, before this scope is
    /// ever built.
    InCategory { category_id: Uuid },
    /// One author's posts. `include_drafts` is true only when the
    /// profile owner is viewing their own profile.
    Profile {
        author_id: Uuid,
        include_drafts: bool,
    },
}

/// Scope for the home feed.
pub fn home_feed() -> PostScope {
    PostScope::EffectivelyPublished
}

/// Scope for a category feed. Callers must have already resolved the
/// category and treated an unpublished one as not found.
pub fn category_feed(category: &Category) -> PostScope {
    PostScope::InCategory {
        category_id: category.id,
    }
}

/// Scope for an author's profile feed: drafts are included only for
/// the profile owner.
pub fn profile_feed(viewer: &Viewer, profile_author_id: Uuid) -> PostScope {
    PostScope::Profile {
        author_id: profile_author_id,
        include_drafts: viewer.owns(profile_author_id),
    }
}

/// The effective-publication invariant.
pub fn effectively_published(post: &Post, category: Option<&Category>, now: DateTime<Utc>) -> bool {
    post.is_published
        && category.map(|c| c.is_published).unwrap_or(true)
        && post.pub_date <= now
}

/// Whether a single post is visible to the viewer: authors always see
/// their own posts (draft preview), everyone else only sees
/// effectively-published ones.
pub fn post_visible_to(
    viewer: &Viewer,
    post: &Post,
    category: Option<&Category>,
    now: DateTime<Utc>,
) -> bool {
    viewer.owns(post.author_id) || effectively_published(post, category, now)
}

/// Resolve a single post for a viewer. An invisible post is
/// indistinguishable from a missing one: both come back `None`.
pub async fn resolve_single_post(
    posts: &dyn PostRepository,
    viewer: &Viewer,
    post_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<PostWithMeta>, RepoError> {
    let Some(detail) = posts.find_detail(post_id).await? else {
        return Ok(None);
    };
    if post_visible_to(viewer, &detail.post, detail.category.as_ref(), now) {
        Ok(Some(detail))
    } else {
        Ok(None)
    }
}

/// Resolve a feed page for a scope: filtered in storage, ordered by
/// `pub_date` descending, each entry annotated with its comment count.
pub async fn resolve_visible_posts(
    posts: &dyn PostRepository,
    scope: PostScope,
    now: DateTime<Utc>,
    page: PageRequest,
) -> Result<(Vec<PostWithMeta>, u64), RepoError> {
    posts.feed(scope, now, page).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn published_post(author_id: Uuid, now: DateTime<Utc>) -> Post {
        let mut post = Post::new(author_id, "title".into(), "body".into());
        post.pub_date = now - TimeDelta::hours(1);
        post.is_published = true;
        post
    }

    fn category(is_published: bool) -> Category {
        let mut c = Category::new("c".into(), "d".into(), "c".into());
        c.is_published = is_published;
        c
    }

    #[test]
    fn published_past_dated_post_without_category_is_effective() {
        let now = Utc::now();
        let post = published_post(Uuid::new_v4(), now);
        assert!(effectively_published(&post, None, now));
    }

    #[test]
    fn unpublished_flag_hides_post() {
        let now = Utc::now();
        let mut post = published_post(Uuid::new_v4(), now);
        post.is_published = false;
        assert!(!effectively_published(&post, None, now));
    }

    #[test]
    fn unpublished_category_hides_published_post() {
        let now = Utc::now();
        let post = published_post(Uuid::new_v4(), now);
        assert!(!effectively_published(&post, Some(&category(false)), now));
        assert!(effectively_published(&post, Some(&category(true)), now));
    }

    #[test]
    fn future_pub_date_hides_post() {
        let now = Utc::now();
        let mut post = published_post(Uuid::new_v4(), now);
        post.pub_date = now + TimeDelta::hours(1);
        assert!(!effectively_published(&post, None, now));
    }

    #[test]
    fn pub_date_exactly_now_counts_as_published() {
        let now = Utc::now();
        let mut post = published_post(Uuid::new_v4(), now);
        post.pub_date = now;
        assert!(effectively_published(&post, None, now));
    }

    #[test]
    fn author_sees_own_draft() {
        let now = Utc::now();
        let author = Uuid::new_v4();
        let mut post = published_post(author, now);
        post.is_published = false;

        assert!(post_visible_to(&Viewer::User(author), &post, None, now));
        assert!(!post_visible_to(&Viewer::User(Uuid::new_v4()), &post, None, now));
        assert!(!post_visible_to(&Viewer::Anonymous, &post, None, now));
    }

    #[test]
    fn author_sees_own_post_in_hidden_category() {
        let now = Utc::now();
        let author = Uuid::new_v4();
        let post = published_post(author, now);
        let hidden = category(false);

        assert!(post_visible_to(&Viewer::User(author), &post, Some(&hidden), now));
        assert!(!post_visible_to(&Viewer::Anonymous, &post, Some(&hidden), now));
    }

    #[test]
    fn profile_scope_includes_drafts_only_for_owner() {
        let owner = Uuid::new_v4();

        let own = profile_feed(&Viewer::User(owner), owner);
        assert_eq!(
            own,
            PostScope::Profile {
                author_id: owner,
                include_drafts: true
            }
        );

        let other = profile_feed(&Viewer::User(Uuid::new_v4()), owner);
        assert_eq!(
            other,
            PostScope::Profile {
                author_id: owner,
                include_drafts: false
            }
        );

        let anon = profile_feed(&Viewer::Anonymous, owner);
        assert_eq!(
            anon,
            PostScope::Profile {
                author_id: owner,
                include_drafts: false
            }
        );
    }
}
