//! Post handlers: the home feed, the detail view and owner-gated
//! mutations.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use chronicle_core::domain::Post;
use chronicle_core::ownership::{check_creation, check_mutation};
use chronicle_core::visibility::{home_feed as home_scope, resolve_single_post};
use chronicle_shared::Page;
use chronicle_shared::dto::{CreatePostRequest, PostDetailResponse, UpdatePostRequest};

use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::{AppError, AppResult, require_allowed};
use crate::state::AppState;

use super::{PageQuery, comment_response, post_detail_path, post_response};

/// GET /api/posts - the public home feed.
pub async fn home_feed(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = query.to_page_request(&state);
    let (entries, total) = state.posts.feed(home_scope(), Utc::now(), page).await?;

    let items = entries.into_iter().map(post_response).collect();
    Ok(HttpResponse::Ok().json(Page::new(items, page.page, page.per_page, total)))
}

/// GET /api/posts/{post_id} - detail view with ordered comments.
///
/// An invisible post answers 404, never 403: the existence of drafts
/// and scheduled posts is not disclosed.
pub async fn detail(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let viewer = identity.viewer();

    let detail = resolve_single_post(state.posts.as_ref(), &viewer, post_id, Utc::now())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {post_id} not found")))?;

    let comments = state
        .comments
        .list_for_post(post_id)
        .await?
        .into_iter()
        .map(comment_response)
        .collect();

    Ok(HttpResponse::Ok().json(PostDetailResponse {
        post: post_response(detail),
        comments,
    }))
}

/// POST /api/posts - create a post. Anonymous viewers are redirected
/// to login; the author is stamped server-side from the token.
pub async fn create(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let viewer = identity.viewer();
    require_allowed(check_creation(&viewer), "")?;
    let author_id = viewer
        .author_id()
        .ok_or_else(|| AppError::Internal("viewer passed creation gate without id".to_string()))?;

    let req = body.into_inner();
    if req.title.is_empty() || req.title.len() > 256 {
        return Err(AppError::BadRequest(
            "Title must be between 1 and 256 characters".to_string(),
        ));
    }

    if let Some(category_id) = req.category_id {
        if state.categories.find_by_id(category_id).await?.is_none() {
            return Err(AppError::BadRequest(format!(
                "Unknown category {category_id}"
            )));
        }
    }
    if let Some(location_id) = req.location_id {
        if state.locations.find_by_id(location_id).await?.is_none() {
            return Err(AppError::BadRequest(format!(
                "Unknown location {location_id}"
            )));
        }
    }

    let mut post = Post::new(author_id, req.title, req.body);
    if let Some(pub_date) = req.pub_date {
        post.pub_date = pub_date;
    }
    if let Some(is_published) = req.is_published {
        post.is_published = is_published;
    }
    post.category_id = req.category_id;
    post.location_id = req.location_id;

    let saved = state.posts.save(post).await?;
    tracing::info!(post_id = %saved.id, author_id = %author_id, "Post created");

    let detail = state
        .posts
        .find_detail(saved.id)
        .await?
        .ok_or_else(|| AppError::Internal("created post vanished".to_string()))?;

    Ok(HttpResponse::Created().json(post_response(detail)))
}

/// PUT /api/posts/{post_id} - owner-only edit. Non-owners are sent
/// back to the detail view, anonymous viewers to login.
pub async fn update(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let viewer = identity.viewer();

    let mut post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {post_id} not found")))?;

    require_allowed(check_mutation(&viewer, post.author_id), post_detail_path(post_id))?;

    let req = body.into_inner();
    if let Some(title) = req.title {
        if title.is_empty() || title.len() > 256 {
            return Err(AppError::BadRequest(
                "Title must be between 1 and 256 characters".to_string(),
            ));
        }
        post.title = title;
    }
    if let Some(body) = req.body {
        post.body = body;
    }
    if let Some(pub_date) = req.pub_date {
        post.pub_date = pub_date;
    }
    if let Some(is_published) = req.is_published {
        post.is_published = is_published;
    }
    if let Some(category_id) = req.category_id {
        if let Some(id) = category_id {
            if state.categories.find_by_id(id).await?.is_none() {
                return Err(AppError::BadRequest(format!("Unknown category {id}")));
            }
        }
        post.category_id = category_id;
    }
    if let Some(location_id) = req.location_id {
        if let Some(id) = location_id {
            if state.locations.find_by_id(id).await?.is_none() {
                return Err(AppError::BadRequest(format!("Unknown location {id}")));
            }
        }
        post.location_id = location_id;
    }
    post.updated_at = Utc::now();

    state.posts.save(post).await?;

    let detail = state
        .posts
        .find_detail(post_id)
        .await?
        .ok_or_else(|| AppError::Internal("updated post vanished".to_string()))?;

    Ok(HttpResponse::Ok().json(post_response(detail)))
}

/// DELETE /api/posts/{post_id} - owner-only delete.
pub async fn delete(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let viewer = identity.viewer();

    let post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {post_id} not found")))?;

    require_allowed(check_mutation(&viewer, post.author_id), post_detail_path(post_id))?;

    state.posts.delete(post_id).await?;
    tracing::info!(post_id = %post_id, "Post deleted");

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test, web};
    use chrono::{TimeDelta, Utc};
    use uuid::Uuid;

    use chronicle_core::domain::{Author, Post};
    use chronicle_core::ports::{BaseRepository, PageRequest, PostRepository};
    use chronicle_core::visibility::home_feed;
    use chronicle_infra::memory::MemoryStore;

    use crate::handlers::{configure_routes, test_support};

    async fn seed_author(store: &MemoryStore, username: &str) -> Author {
        let author = Author::new(username.into(), format!("{username}@example.com"), "h".into());
        store.authors().save(author).await.unwrap()
    }

    macro_rules! test_app {
        ($store:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(test_support::state($store)))
                    .app_data(web::Data::new(test_support::token_service()))
                    .app_data(web::Data::new(test_support::password_service()))
                    .configure(configure_routes),
            )
            .await
        };
    }

    fn bearer(author: &Author) -> String {
        let token = test_support::token_service()
            .generate_token(author.id, &author.username, vec!["user".to_string()])
            .unwrap();
        format!("Bearer {token}")
    }

    #[actix_web::test]
    async fn anonymous_post_create_redirects_to_login_without_creating() {
        let store = MemoryStore::new();
        let app = test_app!(&store);

        let req = test::TestRequest::post()
            .uri("/api/posts")
            .set_json(serde_json::json!({ "title": "t", "body": "b" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/api/auth/login"
        );

        let (entries, total) = store
            .posts()
            .feed(home_feed(), Utc::now(), PageRequest::new(1, 10))
            .await
            .unwrap();
        assert!(entries.is_empty());
        assert_eq!(total, 0);
    }

    #[actix_web::test]
    async fn non_owner_delete_redirects_to_detail_and_post_survives() {
        let store = MemoryStore::new();
        let owner = seed_author(&store, "alice").await;
        let intruder = seed_author(&store, "bob").await;

        let post = Post::new(owner.id, "t".into(), "b".into());
        let post = store.posts().save(post).await.unwrap();

        let app = test_app!(&store);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/posts/{}", post.id))
            .insert_header((header::AUTHORIZATION, bearer(&intruder)))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            format!("/api/posts/{}", post.id).as_str()
        );
        assert!(store.posts().find_by_id(post.id).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn owner_delete_succeeds() {
        let store = MemoryStore::new();
        let owner = seed_author(&store, "alice").await;
        let post = store
            .posts()
            .save(Post::new(owner.id, "t".into(), "b".into()))
            .await
            .unwrap();

        let app = test_app!(&store);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/posts/{}", post.id))
            .insert_header((header::AUTHORIZATION, bearer(&owner)))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(store.posts().find_by_id(post.id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn draft_detail_is_not_found_for_strangers_but_ok_for_author() {
        let store = MemoryStore::new();
        let owner = seed_author(&store, "alice").await;
        let mut draft = Post::new(owner.id, "t".into(), "b".into());
        draft.is_published = false;
        draft.pub_date = Utc::now() - TimeDelta::hours(1);
        let draft = store.posts().save(draft).await.unwrap();

        let app = test_app!(&store);

        let req = test::TestRequest::get()
            .uri(&format!("/api/posts/{}", draft.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri(&format!("/api/posts/{}", draft.id))
            .insert_header((header::AUTHORIZATION, bearer(&owner)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn home_feed_with_huge_page_number_is_just_empty() {
        let store = MemoryStore::new();
        let owner = seed_author(&store, "alice").await;
        let mut post = Post::new(owner.id, "t".into(), "b".into());
        post.pub_date = Utc::now() - TimeDelta::hours(1);
        store.posts().save(post).await.unwrap();

        let app = test_app!(&store);

        let req = test::TestRequest::get()
            .uri(&format!("/api/posts?page={}&per_page=100", u64::MAX))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: chronicle_shared::Page<serde_json::Value> =
            test::read_body_json(resp).await;
        assert!(body.items.is_empty());
        assert_eq!(body.total_items, 1);
    }

    #[actix_web::test]
    async fn missing_post_detail_is_not_found() {
        let store = MemoryStore::new();
        let app = test_app!(&store);

        let req = test::TestRequest::get()
            .uri(&format!("/api/posts/{}", Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
