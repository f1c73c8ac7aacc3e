#[cfg(test)]
mod tests {
    use crate::database::entity::{category, post};
    use crate::database::postgres_repo::{PostgresCategoryRepository, PostgresPostRepository};
    use chronicle_core::domain::{Category, Post};
    use chronicle_core::ports::{BaseRepository, CategoryRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_find_post_by_id() {
        let post_id = uuid::Uuid::new_v4();
        let author_id = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![post::Model {
                id: post_id,
                author_id,
                title: "Test Post".to_owned(),
                body: "Body".to_owned(),
                pub_date: now.into(),
                is_published: true,
                category_id: None,
                location_id: None,
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

        assert!(result.is_some());
        let post = result.unwrap();
        assert_eq!(post.title, "Test Post");
        assert_eq!(post.id, post_id);
        assert_eq!(post.author_id, author_id);
    }

    #[tokio::test]
    async fn test_find_category_by_slug() {
        let category_id = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![category::Model {
                id: category_id,
                title: "Travel".to_owned(),
                description: "Travel notes".to_owned(),
                slug: "travel".to_owned(),
                is_published: true,
                created_at: now.into(),
            }]])
            .into_connection();

        let repo = PostgresCategoryRepository::new(db);

        let result: Option<Category> = repo.find_by_slug("travel").await.unwrap();

        assert!(result.is_some());
        let category = result.unwrap();
        assert_eq!(category.slug, "travel");
        assert_eq!(category.id, category_id);
    }

    #[tokio::test]
    async fn test_delete_missing_post_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        let result = BaseRepository::<Post, _>::delete(&repo, uuid::Uuid::new_v4()).await;

        assert!(matches!(
            result,
            Err(chronicle_core::error::RepoError::NotFound)
        ));
    }
}
