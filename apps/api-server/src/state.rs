//! Application state - shared across all handlers.

use std::sync::Arc;

use chronicle_core::ports::{
    AuthorRepository, CategoryRepository, CommentRepository, LocationRepository, PostRepository,
};
use chronicle_infra::database::{
    DatabaseConnection, PostgresAuthorRepository, PostgresCategoryRepository,
    PostgresCommentRepository, PostgresLocationRepository, PostgresPostRepository,
};
use chronicle_infra::memory::MemoryStore;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub authors: Arc<dyn AuthorRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub page_size: u64,
    pub admin_usernames: Vec<String>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        if let Some(db_config) = &config.database {
            match DatabaseConnection::connect(db_config).await {
                Ok(db) => {
                    tracing::info!("Application state initialized (postgres)");
                    return Self {
                        authors: Arc::new(PostgresAuthorRepository::new(db.conn.clone())),
                        posts: Arc::new(PostgresPostRepository::new(db.conn.clone())),
                        categories: Arc::new(PostgresCategoryRepository::new(db.conn.clone())),
                        locations: Arc::new(PostgresLocationRepository::new(db.conn.clone())),
                        comments: Arc::new(PostgresCommentRepository::new(db.conn.clone())),
                        page_size: config.page_size,
                        admin_usernames: config.admin_usernames.clone(),
                    };
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                }
            }
        } else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        }

        Self::in_memory(MemoryStore::new(), config.page_size, config.admin_usernames.clone())
    }

    /// State backed by the in-memory store; also the test harness.
    pub fn in_memory(store: MemoryStore, page_size: u64, admin_usernames: Vec<String>) -> Self {
        Self {
            authors: Arc::new(store.authors()),
            posts: Arc::new(store.posts()),
            categories: Arc::new(store.categories()),
            locations: Arc::new(store.locations()),
            comments: Arc::new(store.comments()),
            page_size,
            admin_usernames,
        }
    }

    /// Roles to stamp into a fresh token for this username.
    pub fn roles_for(&self, username: &str) -> Vec<String> {
        let mut roles = vec!["user".to_string()];
        if self.admin_usernames.iter().any(|u| u == username) {
            roles.push("admin".to_string());
        }
        roles
    }
}
