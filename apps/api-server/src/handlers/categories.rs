//! Category feed handler.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use chronicle_core::visibility::category_feed;
use chronicle_shared::Page;
use chronicle_shared::dto::{CategoryFeedResponse, CategoryResponse};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

use super::{PageQuery, post_response};

/// GET /api/categories/{slug}
///
/// An unpublished category is indistinguishable from a missing one,
/// for every viewer - author override does not apply to categories.
pub async fn feed(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();

    let category = state
        .categories
        .find_by_slug(&slug)
        .await?
        .filter(|c| c.is_published)
        .ok_or_else(|| AppError::NotFound(format!("Category '{slug}' not found")))?;

    let page = query.to_page_request(&state);
    let (entries, total) = state
        .posts
        .feed(category_feed(&category), Utc::now(), page)
        .await?;

    let items = entries.into_iter().map(post_response).collect();

    Ok(HttpResponse::Ok().json(CategoryFeedResponse {
        category: CategoryResponse {
            id: category.id,
            title: category.title,
            description: category.description,
            slug: category.slug,
            is_published: category.is_published,
        },
        posts: Page::new(items, page.page, page.per_page, total),
    }))
}
