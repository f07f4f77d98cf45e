use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::handlers::{validation_error_response, ErrorResponse};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::user::{Profile, UpdateProfileRequest};
use crate::services::profile_service::{ProfileError, ProfileService};

/// Convert ProfileError to HTTP response
impl IntoResponse for ProfileError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ProfileError::NotFound => (
                StatusCode::NOT_FOUND,
                "profile_not_found",
                "Profile not found",
            ),
            ProfileError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.as_str(),
            ),
        };

        let error_response = ErrorResponse::new(error_type, message);
        (status, Json(error_response)).into_response()
    }
}

/// Handler for fetching the caller's profile
#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Caller's profile", body = Profile),
        (status = 404, description = "Profile not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "profile"
)]
pub async fn get_profile_handler(
    State(profile_service): State<Arc<dyn ProfileService>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Profile>, Response> {
    match profile_service.get(user.user_id).await {
        Ok(profile) => Ok(Json(profile)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for partial profile edits
#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = Profile),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Profile not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "profile"
)]
pub async fn update_profile_handler(
    State(profile_service): State<Arc<dyn ProfileService>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(validation_errors));
    }

    match profile_service.update(user.user_id, request).await {
        Ok(profile) => Ok(Json(profile)),
        Err(e) => Err(e.into_response()),
    }
}
