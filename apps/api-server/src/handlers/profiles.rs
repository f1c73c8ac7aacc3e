//! Profile feed handler: an author's page of posts, drafts included
//! only when the owner is looking.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use chronicle_core::visibility::profile_feed;
use chronicle_shared::Page;
use chronicle_shared::dto::{ProfileFeedResponse, ProfileResponse};

use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

use super::{PageQuery, post_response};

/// GET /api/profiles/{username}
pub async fn feed(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let viewer = identity.viewer();

    let author = state
        .authors
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile '{username}' not found")))?;

    let page = query.to_page_request(&state);
    let (entries, total) = state
        .posts
        .feed(profile_feed(&viewer, author.id), Utc::now(), page)
        .await?;

    let items = entries.into_iter().map(post_response).collect();

    Ok(HttpResponse::Ok().json(ProfileFeedResponse {
        profile: ProfileResponse {
            id: author.id,
            username: author.username,
            display_name: author.display_name,
            joined_at: author.created_at,
        },
        posts: Page::new(items, page.page, page.per_page, total),
    }))
}
