use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::{validation_error_response, ErrorResponse};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::category::{
    Category, CategoryWithSubcategories, CreateCategoryRequest, CreateSubcategoryRequest,
    Subcategory, UpdateCategoryRequest,
};
use crate::services::category_service::{CategoryError, CategoryService};

/// Convert CategoryError to HTTP response
impl IntoResponse for CategoryError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            CategoryError::NotFound => (
                StatusCode::NOT_FOUND,
                "category_not_found",
                "Category not found",
            ),
            CategoryError::DuplicateName => (
                StatusCode::CONFLICT,
                "duplicate_category",
                "Category with this name already exists",
            ),
            CategoryError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "unauthorized",
                "Not allowed to access this category",
            ),
            CategoryError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.as_str(),
            ),
        };

        let error_response = ErrorResponse::new(error_type, message);
        (status, Json(error_response)).into_response()
    }
}

/// Handler for listing the user's categories with their subcategories
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "User's categories", body = Vec<CategoryWithSubcategories>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn list_categories_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<CategoryWithSubcategories>>, Response> {
    match category_service.list(user.user_id).await {
        Ok(categories) => Ok(Json(categories)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for creating a custom category
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Duplicate name", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn create_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(validation_errors));
    }

    match category_service.create(user.user_id, request).await {
        Ok(category) => Ok((StatusCode::CREATED, Json(category))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for updating a category
#[utoipa::path(
    patch,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn update_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(category_id): Path<Uuid>,
    Json(request): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(validation_errors));
    }

    match category_service.update(user.user_id, category_id, request).await {
        Ok(category) => Ok(Json(category)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for deleting a category; its subcategories cascade away
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn delete_category_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, Response> {
    match category_service.delete(user.user_id, category_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for adding a subcategory
#[utoipa::path(
    post,
    path = "/api/categories/{id}/subcategories",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = CreateSubcategoryRequest,
    responses(
        (status = 201, description = "Subcategory added", body = Subcategory),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn add_subcategory_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(category_id): Path<Uuid>,
    Json(request): Json<CreateSubcategoryRequest>,
) -> Result<(StatusCode, Json<Subcategory>), Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(validation_errors));
    }

    match category_service
        .add_subcategory(user.user_id, category_id, request)
        .await
    {
        Ok(subcategory) => Ok((StatusCode::CREATED, Json(subcategory))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for removing a subcategory
#[utoipa::path(
    delete,
    path = "/api/categories/{id}/subcategories/{subcategory_id}",
    params(
        ("id" = Uuid, Path, description = "Category id"),
        ("subcategory_id" = Uuid, Path, description = "Subcategory id")
    ),
    responses(
        (status = 204, description = "Subcategory removed"),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn remove_subcategory_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((category_id, subcategory_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, Response> {
    match category_service
        .remove_subcategory(user.user_id, category_id, subcategory_id)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into_response()),
    }
}

/// Response body of the change long-poll
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangesResponse {
    pub changed: bool,
}

const LONG_POLL_WINDOW: Duration = Duration::from_secs(25);

/// Long-poll handler for category change notifications. Returns as soon as
/// the user's category set changes, or with `changed: false` after the poll
/// window elapses. The client refetches the full list on `changed: true`.
#[utoipa::path(
    get,
    path = "/api/categories/changes",
    responses(
        (status = 200, description = "Change status", body = ChangesResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn category_changes_handler(
    State(category_service): State<Arc<dyn CategoryService>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<ChangesResponse> {
    let mut feed = category_service.subscribe(user.user_id);
    let changed = matches!(
        tokio::time::timeout(LONG_POLL_WINDOW, feed.changed()).await,
        Ok(Some(()))
    );
    Json(ChangesResponse { changed })
}
