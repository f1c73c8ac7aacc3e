//! HTTP handlers and route configuration.

mod admin;
mod auth;
mod categories;
mod comments;
mod health;
mod posts;
mod profiles;

use actix_web::web;
use serde::Deserialize;

use chronicle_core::domain::{CommentWithAuthor, PostWithMeta};
use chronicle_core::ports::PageRequest;
use chronicle_shared::dto::{
    CategorySummary, CommentResponse, LocationSummary, PostResponse, ProfileSummary,
};

use crate::state::AppState;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Auth routes
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::me))
                    .route("/me", web::patch().to(auth::update_profile)),
            )
            // Posts and their comments
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::home_feed))
                    .route("", web::post().to(posts::create))
                    .route("/{post_id}", web::get().to(posts::detail))
                    .route("/{post_id}", web::put().to(posts::update))
                    .route("/{post_id}", web::delete().to(posts::delete))
                    .route("/{post_id}/comments", web::post().to(comments::create))
                    .route(
                        "/{post_id}/comments/{comment_id}",
                        web::put().to(comments::update),
                    )
                    .route(
                        "/{post_id}/comments/{comment_id}",
                        web::delete().to(comments::delete),
                    ),
            )
            // Category and profile feeds
            .route("/categories/{slug}", web::get().to(categories::feed))
            .route("/profiles/{username}", web::get().to(profiles::feed))
            // Admin-only management of categories and locations
            .service(
                web::scope("/admin")
                    .route("/categories", web::post().to(admin::create_category))
                    .route(
                        "/categories/{category_id}",
                        web::put().to(admin::update_category),
                    )
                    .route(
                        "/categories/{category_id}",
                        web::delete().to(admin::delete_category),
                    )
                    .route("/locations", web::post().to(admin::create_location))
                    .route(
                        "/locations/{location_id}",
                        web::put().to(admin::update_location),
                    )
                    .route(
                        "/locations/{location_id}",
                        web::delete().to(admin::delete_location),
                    ),
            ),
    );
}

/// Feed pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PageQuery {
    /// Resolve against the configured default page size. Both values
    /// come straight from the query string, so they are capped here.
    pub fn to_page_request(&self, state: &AppState) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1).min(1_000_000),
            self.per_page.unwrap_or(state.page_size).min(100),
        )
    }
}

/// The canonical detail path of a post, also the redirect target for
/// denied mutations on it or its comments.
pub fn post_detail_path(post_id: uuid::Uuid) -> String {
    format!("/api/posts/{post_id}")
}

pub fn post_response(meta: PostWithMeta) -> PostResponse {
    PostResponse {
        id: meta.post.id,
        title: meta.post.title,
        body: meta.post.body,
        pub_date: meta.post.pub_date,
        is_published: meta.post.is_published,
        author: ProfileSummary {
            id: meta.post.author_id,
            username: meta.author_username,
        },
        category: meta.category.map(|c| CategorySummary {
            id: c.id,
            title: c.title,
            slug: c.slug,
        }),
        location: meta.location.map(|l| LocationSummary {
            id: l.id,
            name: l.name,
        }),
        comment_count: meta.comment_count,
    }
}

pub fn comment_response(entry: CommentWithAuthor) -> CommentResponse {
    CommentResponse {
        id: entry.comment.id,
        post_id: entry.comment.post_id,
        text: entry.comment.text,
        author: ProfileSummary {
            id: entry.comment.author_id,
            username: entry.author_username,
        },
        created_at: entry.comment.created_at,
    }
}
