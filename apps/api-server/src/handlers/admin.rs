//! Admin-only management of categories and locations. These are plain
//! API errors (403), not redirects - the redirect semantics of the
//! ownership gate apply to posts and comments only.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use chronicle_core::domain::{Category, Location};
use chronicle_shared::dto::{
    CategoryResponse, LocationResponse, UpsertCategoryRequest, UpsertLocationRequest,
};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn require_admin(identity: &Identity) -> AppResult<()> {
    if identity.has_role("admin") {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn category_response(category: &Category) -> CategoryResponse {
    CategoryResponse {
        id: category.id,
        title: category.title.clone(),
        description: category.description.clone(),
        slug: category.slug.clone(),
        is_published: category.is_published,
    }
}

fn location_response(location: &Location) -> LocationResponse {
    LocationResponse {
        id: location.id,
        name: location.name.clone(),
        is_published: location.is_published,
    }
}

fn validate_slug(slug: &str) -> AppResult<()> {
    if slug.is_empty()
        || !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::BadRequest(
            "Slug may only contain letters, digits, hyphen and underscore".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/admin/categories
pub async fn create_category(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<UpsertCategoryRequest>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let req = body.into_inner();
    validate_slug(&req.slug)?;
    if state.categories.find_by_slug(&req.slug).await?.is_some() {
        return Err(AppError::Conflict(format!("Slug '{}' already in use", req.slug)));
    }

    let mut category = Category::new(req.title, req.description, req.slug);
    if let Some(is_published) = req.is_published {
        category.is_published = is_published;
    }

    let saved = state.categories.save(category).await?;
    tracing::info!(category_id = %saved.id, slug = %saved.slug, "Category created");

    Ok(HttpResponse::Created().json(category_response(&saved)))
}

/// PUT /api/admin/categories/{category_id}
pub async fn update_category(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpsertCategoryRequest>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;
    let category_id = path.into_inner();

    let mut category = state
        .categories
        .find_by_id(category_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {category_id} not found")))?;

    let req = body.into_inner();
    validate_slug(&req.slug)?;
    if let Some(existing) = state.categories.find_by_slug(&req.slug).await? {
        if existing.id != category_id {
            return Err(AppError::Conflict(format!("Slug '{}' already in use", req.slug)));
        }
    }

    category.title = req.title;
    category.description = req.description;
    category.slug = req.slug;
    if let Some(is_published) = req.is_published {
        category.is_published = is_published;
    }

    let saved = state.categories.save(category).await?;

    Ok(HttpResponse::Ok().json(category_response(&saved)))
}

/// DELETE /api/admin/categories/{category_id}
///
/// Posts in the category survive with the reference nulled out.
pub async fn delete_category(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;
    let category_id = path.into_inner();

    state.categories.delete(category_id).await?;
    tracing::info!(category_id = %category_id, "Category deleted");

    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/admin/locations
pub async fn create_location(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<UpsertLocationRequest>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;

    let req = body.into_inner();
    if req.name.is_empty() {
        return Err(AppError::BadRequest("Location name is required".to_string()));
    }

    let mut location = Location::new(req.name);
    if let Some(is_published) = req.is_published {
        location.is_published = is_published;
    }

    let saved = state.locations.save(location).await?;
    tracing::info!(location_id = %saved.id, "Location created");

    Ok(HttpResponse::Created().json(location_response(&saved)))
}

/// PUT /api/admin/locations/{location_id}
pub async fn update_location(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpsertLocationRequest>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;
    let location_id = path.into_inner();

    let mut location = state
        .locations
        .find_by_id(location_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Location {location_id} not found")))?;

    let req = body.into_inner();
    if req.name.is_empty() {
        return Err(AppError::BadRequest("Location name is required".to_string()));
    }
    location.name = req.name;
    if let Some(is_published) = req.is_published {
        location.is_published = is_published;
    }

    let saved = state.locations.save(location).await?;

    Ok(HttpResponse::Ok().json(location_response(&saved)))
}

/// DELETE /api/admin/locations/{location_id}
pub async fn delete_location(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    require_admin(&identity)?;
    let location_id = path.into_inner();

    state.locations.delete(location_id).await?;
    tracing::info!(location_id = %location_id, "Location deleted");

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test, web};

    use chronicle_core::domain::Author;
    use chronicle_core::ports::{BaseRepository, CategoryRepository};
    use chronicle_infra::memory::MemoryStore;

    use crate::handlers::{configure_routes, test_support};

    #[actix_web::test]
    async fn non_admin_cannot_create_category() {
        let store = MemoryStore::new();
        let user = store
            .authors()
            .save(Author::new("bob".into(), "bob@example.com".into(), "h".into()))
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

        let token = test_support::token_service()
            .generate_token(user.id, "bob", vec!["user".to_string()])
            .unwrap();
        let req = test::TestRequest::post()
            .uri("/api/admin/categories")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .set_json(serde_json::json!({
                "title": "T", "description": "d", "slug": "t"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn admin_creates_category() {
        let store = MemoryStore::new();
        let admin = store
            .authors()
            .save(Author::new("admin".into(), "admin@example.com".into(), "h".into()))
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

        let token = test_support::token_service()
            .generate_token(admin.id, "admin", vec!["user".to_string(), "admin".to_string()])
            .unwrap();
        let req = test::TestRequest::post()
            .uri("/api/admin/categories")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .set_json(serde_json::json!({
                "title": "Travel", "description": "d", "slug": "travel"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(
            store
                .categories()
                .find_by_slug("travel")
                .await
                .unwrap()
                .is_some()
        );
    }
}
