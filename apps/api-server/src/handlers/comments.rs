//! Comment handlers. Comments attach to effectively-published posts
//! only; mutations are owner-gated with the same redirect semantics
//! as posts.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use chronicle_core::domain::{Comment, CommentWithAuthor};
use chronicle_core::ownership::{check_creation, check_mutation};
use chronicle_core::visibility::effectively_published;
use chronicle_shared::dto::{CreateCommentRequest, UpdateCommentRequest};

use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::{AppError, AppResult, require_allowed};
use crate::state::AppState;

use super::{comment_response, post_detail_path};

/// Look up a comment under a specific post; a comment addressed via
/// the wrong post is treated as missing.
async fn find_comment(state: &AppState, post_id: Uuid, comment_id: Uuid) -> AppResult<Comment> {
    let comment = state
        .comments
        .find_by_id(comment_id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or_else(|| AppError::NotFound(format!("Comment {comment_id} not found")))?;
    Ok(comment)
}

/// POST /api/posts/{post_id}/comments
pub async fn create(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let viewer = identity.viewer();
    require_allowed(check_creation(&viewer), "")?;
    let author_id = viewer
        .author_id()
        .ok_or_else(|| AppError::Internal("viewer passed creation gate without id".to_string()))?;

    let req = body.into_inner();
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Comment text is required".to_string()));
    }

    // Drafts take no comments, not even from their author.
    let detail = state
        .posts
        .find_detail(post_id)
        .await?
        .filter(|d| effectively_published(&d.post, d.category.as_ref(), Utc::now()))
        .ok_or_else(|| AppError::NotFound(format!("Post {post_id} not found")))?;

    let comment = Comment::new(detail.post.id, author_id, req.text);
    let saved = state.comments.save(comment).await?;
    tracing::info!(comment_id = %saved.id, post_id = %post_id, "Comment created");

    let username = state
        .authors
        .find_by_id(author_id)
        .await?
        .map(|a| a.username)
        .unwrap_or_default();

    Ok(HttpResponse::Created().json(comment_response(CommentWithAuthor {
        comment: saved,
        author_username: username,
    })))
}

/// PUT /api/posts/{post_id}/comments/{comment_id}
pub async fn update(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<UpdateCommentRequest>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let viewer = identity.viewer();

    let mut comment = find_comment(&state, post_id, comment_id).await?;
    require_allowed(check_mutation(&viewer, comment.author_id), post_detail_path(post_id))?;

    let req = body.into_inner();
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Comment text is required".to_string()));
    }
    comment.text = req.text;

    let saved = state.comments.save(comment).await?;

    let username = state
        .authors
        .find_by_id(saved.author_id)
        .await?
        .map(|a| a.username)
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(comment_response(CommentWithAuthor {
        comment: saved,
        author_username: username,
    })))
}

/// DELETE /api/posts/{post_id}/comments/{comment_id}
pub async fn delete(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let viewer = identity.viewer();

    let comment = find_comment(&state, post_id, comment_id).await?;
    require_allowed(check_mutation(&viewer, comment.author_id), post_detail_path(post_id))?;

    state.comments.delete(comment.id).await?;
    tracing::info!(comment_id = %comment_id, post_id = %post_id, "Comment deleted");

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test, web};
    use chrono::{TimeDelta, Utc};

    use chronicle_core::domain::{Author, Comment, Post};
    use chronicle_core::ports::BaseRepository;
    use chronicle_infra::memory::MemoryStore;

    use crate::handlers::{configure_routes, test_support};

    async fn seed_author(store: &MemoryStore, username: &str) -> Author {
        let author = Author::new(username.into(), format!("{username}@example.com"), "h".into());
        store.authors().save(author).await.unwrap()
    }

    async fn seed_published_post(store: &MemoryStore, author: &Author) -> Post {
        let mut post = Post::new(author.id, "t".into(), "b".into());
        post.pub_date = Utc::now() - TimeDelta::hours(1);
        store.posts().save(post).await.unwrap()
    }

    fn bearer(author: &Author) -> String {
        let token = test_support::token_service()
            .generate_token(author.id, &author.username, vec!["user".to_string()])
            .unwrap();
        format!("Bearer {token}")
    }

    #[actix_web::test]
    async fn non_owner_comment_delete_redirects_and_comment_survives() {
        let store = MemoryStore::new();
        let author = seed_author(&store, "alice").await;
        let commenter = seed_author(&store, "bob").await;
        let intruder = seed_author(&store, "mallory").await;
        let post = seed_published_post(&store, &author).await;

        let comment = store
            .comments()
            .save(Comment::new(post.id, commenter.id, "hi".into()))
            .await
            .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::state(&store)))
                .app_data(web::Data::new(test_support::token_service()))
                .app_data(web::Data::new(test_support::password_service()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::delete()
            .uri(&format!("/api/posts/{}/comments/{}", post.id, comment.id))
            .insert_header((header::AUTHORIZATION, bearer(&intruder)))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            format!("/api/posts/{}", post.id).as_str()
        );
        assert!(
            store
                .comments()
                .find_by_id(comment.id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[actix_web::test]
    async fn commenting_a_draft_is_not_found_even_for_its_author() {
        let store = MemoryStore::new();
        let author = seed_author(&store, "alice").await;
        let mut draft = Post::new(author.id, "t".into(), "b".into());
        draft.is_published = false;
        let draft = store.posts().save(draft).await.unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_support::state(&store)))
                .app_data(web::Data::new(test_support::token_service()))
                .app_data(web::Data::new(test_support::password_service()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/posts/{}/comments", draft.id))
            .insert_header((header::AUTHORIZATION, bearer(&author)))
            .set_json(serde_json::json!({ "text": "hello" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
