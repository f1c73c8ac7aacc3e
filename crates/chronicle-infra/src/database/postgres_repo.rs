//! Postgres repository implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};
use uuid::Uuid;

use chronicle_core::domain::{Author, Category, CommentWithAuthor, Location, PostWithMeta};
use chronicle_core::error::RepoError;
use chronicle_core::ports::{
    AuthorRepository, CategoryRepository, CommentRepository, LocationRepository, PageRequest,
    PostRepository,
};
use chronicle_core::visibility::PostScope;

use super::entity::{author, category, comment, location, post};
use super::postgres_base::PostgresBaseRepository;

/// Postgres author repository.
pub type PostgresAuthorRepository = PostgresBaseRepository<author::Entity>;

/// Postgres post repository.
pub type PostgresPostRepository = PostgresBaseRepository<post::Entity>;

/// Postgres category repository.
pub type PostgresCategoryRepository = PostgresBaseRepository<category::Entity>;

/// Postgres location repository.
pub type PostgresLocationRepository = PostgresBaseRepository<location::Entity>;

/// Postgres comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<comment::Entity>;

#[async_trait]
impl AuthorRepository for PostgresAuthorRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Author>, RepoError> {
        tracing::debug!(%username, "Finding author by username");

        let result = author::Entity::find()
            .filter(author::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Author>, RepoError> {
        // Mask email for logging to avoid PII in logs
        let masked = if let Some(at_pos) = email.find('@') {
            let (local, domain) = email.split_at(at_pos);
            let masked_local = if local.len() > 1 {
                format!("{}***", &local[..1])
            } else {
                "***".to_string()
            };
            format!("{}{}", masked_local, domain)
        } else {
            "***".to_string()
        };
        tracing::debug!(author_email = %masked, "Finding author by email");

        let result = author::Entity::find()
            .filter(author::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let result = category::Entity::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(result.map(Into::into))
    }
}

#[async_trait]
impl LocationRepository for PostgresLocationRepository {}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, RepoError> {
        let rows = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::CreatedAt)
            .find_also_related(author::Entity)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(c, a)| CommentWithAuthor {
                comment: c.into(),
                author_username: a.map(|a| a.username).unwrap_or_default(),
            })
            .collect())
    }
}

/// SQL filter for a post scope; the query joins `categories` so the
/// effectively-published check can see the category flag.
fn scope_condition(scope: PostScope, now: DateTime<Utc>) -> Condition {
    let effective = Condition::all()
        .add(post::Column::IsPublished.eq(true))
        .add(post::Column::PubDate.lte(now))
        .add(
            Condition::any()
                .add(post::Column::CategoryId.is_null())
                .add(category::Column::IsPublished.eq(true)),
        );

    match scope {
        PostScope::EffectivelyPublished => effective,
        PostScope::InCategory { category_id } => Condition::all()
            .add(post::Column::CategoryId.eq(category_id))
            .add(post::Column::IsPublished.eq(true))
            .add(post::Column::PubDate.lte(now)),
        PostScope::Profile {
            author_id,
            include_drafts,
        } => {
            let base = Condition::all().add(post::Column::AuthorId.eq(author_id));
            if include_drafts { base } else { base.add(effective) }
        }
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_detail(&self, id: Uuid) -> Result<Option<PostWithMeta>, RepoError> {
        let Some(model) = post::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?
        else {
            return Ok(None);
        };

        let category: Option<Category> = match model.category_id {
            Some(category_id) => category::Entity::find_by_id(category_id)
                .one(&self.db)
                .await
                .map_err(|e| RepoError::Query(e.to_string()))?
                .map(Into::into),
            None => None,
        };

        let location: Option<Location> = match model.location_id {
            Some(location_id) => location::Entity::find_by_id(location_id)
                .one(&self.db)
                .await
                .map_err(|e| RepoError::Query(e.to_string()))?
                .map(Into::into),
            None => None,
        };

        let author_username = author::Entity::find_by_id(model.author_id)
            .one(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?
            .map(|a| a.username)
            .unwrap_or_default();

        let comment_count = comment::Entity::find()
            .filter(comment::Column::PostId.eq(id))
            .count(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        Ok(Some(PostWithMeta {
            post: model.into(),
            author_username,
            category,
            location,
            comment_count,
        }))
    }

    async fn feed(
        &self,
        scope: PostScope,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> Result<(Vec<PostWithMeta>, u64), RepoError> {
        let query = post::Entity::find()
            .join(JoinType::LeftJoin, post::Relation::Category.def())
            .filter(scope_condition(scope, now))
            .order_by_desc(post::Column::PubDate);

        let paginator = query.paginate(&self.db, page.per_page);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;
        let models = paginator
            .fetch_page(page.page.saturating_sub(1))
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?;

        if models.is_empty() {
            return Ok((Vec::new(), total));
        }

        // Batch-load relations and comment counts for the page.
        let post_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let author_ids: Vec<Uuid> = models.iter().map(|m| m.author_id).collect();
        let category_ids: Vec<Uuid> = models.iter().filter_map(|m| m.category_id).collect();
        let location_ids: Vec<Uuid> = models.iter().filter_map(|m| m.location_id).collect();

        let authors: HashMap<Uuid, String> = author::Entity::find()
            .filter(author::Column::Id.is_in(author_ids))
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?
            .into_iter()
            .map(|a| (a.id, a.username))
            .collect();

        let categories: HashMap<Uuid, Category> = category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?
            .into_iter()
            .map(|c| (c.id, c.into()))
            .collect();

        let locations: HashMap<Uuid, Location> = location::Entity::find()
            .filter(location::Column::Id.is_in(location_ids))
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?
            .into_iter()
            .map(|l| (l.id, l.into()))
            .collect();

        let comment_counts: HashMap<Uuid, i64> = comment::Entity::find()
            .select_only()
            .column(comment::Column::PostId)
            .column_as(comment::Column::Id.count(), "count")
            .filter(comment::Column::PostId.is_in(post_ids))
            .group_by(comment::Column::PostId)
            .into_tuple::<(Uuid, i64)>()
            .all(&self.db)
            .await
            .map_err(|e| RepoError::Query(e.to_string()))?
            .into_iter()
            .collect();

        let entries = models
            .into_iter()
            .map(|m| {
                let author_username = authors.get(&m.author_id).cloned().unwrap_or_default();
                let category = m.category_id.and_then(|id| categories.get(&id).cloned());
                let location = m.location_id.and_then(|id| locations.get(&id).cloned());
                let comment_count = comment_counts.get(&m.id).copied().unwrap_or(0) as u64;

                PostWithMeta {
                    post: m.into(),
                    author_username,
                    category,
                    location,
                    comment_count,
                }
            })
            .collect();

        Ok((entries, total))
    }
}
