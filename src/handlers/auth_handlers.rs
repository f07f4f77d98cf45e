use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::validation_error_response;
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::auth::{
    preferred_oauth_flow, GoogleSignInRequest, LoginRequest, OAuthFlow, Session, SignUpRequest,
};
use crate::services::auth_service::{AuthError, AuthService};

/// Error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub(crate) fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

/// Convert AuthError to HTTP response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            AuthError::InvalidEmail => (
                StatusCode::BAD_REQUEST,
                "invalid_email",
                "Invalid email format".to_string(),
            ),
            AuthError::WeakPassword(ref issues) => {
                let reasons: Vec<&str> = issues.iter().map(|i| i.describe()).collect();
                (
                    StatusCode::BAD_REQUEST,
                    "weak_password",
                    format!("Password {}", reasons.join("; ")),
                )
            }
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid email or password".to_string(),
            ),
            AuthError::EmailInUse => (
                StatusCode::CONFLICT,
                "email_in_use",
                "Email already in use".to_string(),
            ),
            AuthError::CredentialInUse => (
                StatusCode::CONFLICT,
                "credential_in_use",
                "This credential is already linked to another account".to_string(),
            ),
            AuthError::UserNotRegistered => (
                StatusCode::FORBIDDEN,
                "user_not_registered",
                "Account has no registered profile".to_string(),
            ),
            AuthError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "too_many_requests",
                "Too many attempts, try again later".to_string(),
            ),
            AuthError::ProviderUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "provider_unavailable",
                "Sign-in provider is not available".to_string(),
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid authentication token".to_string(),
            ),
            AuthError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "token_expired",
                "Authentication token has expired".to_string(),
            ),
            AuthError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.clone(),
            ),
        };

        let error_response = ErrorResponse::new(error_type, &message);
        (status, Json(error_response)).into_response()
    }
}

/// Anonymous principal carried in the optional Authorization header. Sign-up
/// and Google sign-in use it as the linking target; a permanent or invalid
/// token simply means there is nothing to link.
async fn linking_candidate(
    auth_service: &Arc<dyn AuthService>,
    headers: &HeaderMap,
) -> Option<Uuid> {
    let token = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))?;

    match auth_service.validate_token(token).await {
        Ok(principal) if principal.is_anonymous => Some(principal.user_id),
        _ => None,
    }
}

/// Handler for guest sign-in
///
/// Creates an anonymous account with seeded defaults and returns its session.
#[utoipa::path(
    post,
    path = "/api/auth/guest",
    responses(
        (status = 201, description = "Anonymous session created", body = Session),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn guest_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
) -> Result<(StatusCode, Json<Session>), Response> {
    match auth_service.sign_in_as_guest().await {
        Ok(session) => Ok((StatusCode::CREATED, Json(session))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for email/password registration
///
/// When the request carries an anonymous session token, the credential is
/// linked to that account and its id is preserved.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account registered", body = Session),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    headers: HeaderMap,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<Session>), Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(validation_errors));
    }

    let anonymous_user = linking_candidate(&auth_service, &headers).await;

    match auth_service.sign_up_with_email(request, anonymous_user).await {
        Ok(session) => Ok((StatusCode::CREATED, Json(session))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for email/password sign-in
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = Session),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Account has no registered profile", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Session>, Response> {
    match auth_service.sign_in_with_email(request).await {
        Ok(session) => Ok(Json(session)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for Google sign-in
///
/// Accepts an ID token obtained by the client. With an anonymous session
/// token present, the Google identity is linked to that account.
#[utoipa::path(
    post,
    path = "/api/auth/google",
    request_body = GoogleSignInRequest,
    responses(
        (status = 200, description = "Sign-in successful", body = Session),
        (status = 401, description = "Invalid ID token", body = ErrorResponse),
        (status = 409, description = "Credential linked to another account", body = ErrorResponse),
        (status = 503, description = "Provider not configured", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn google_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    headers: HeaderMap,
    Json(request): Json<GoogleSignInRequest>,
) -> Result<Json<Session>, Response> {
    let anonymous_user = linking_candidate(&auth_service, &headers).await;

    match auth_service
        .sign_in_with_google(&request.id_token, anonymous_user)
        .await
    {
        Ok(session) => Ok(Json(session)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for sign-out. Always succeeds, even with a stale token.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Signed out")
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    headers: HeaderMap,
) -> StatusCode {
    let token = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or("");

    // Sign-out never fails the caller.
    let _ = auth_service.sign_out(token).await;
    StatusCode::NO_CONTENT
}

/// Query parameters for the OAuth flow hint
#[derive(Debug, Deserialize)]
pub struct OAuthFlowQuery {
    #[serde(default)]
    pub has_touch: bool,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
}

fn default_viewport_width() -> u32 {
    1024
}

/// Response body for the OAuth flow hint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OAuthFlowResponse {
    pub flow: OAuthFlow,
}

/// Handler advising the client which OAuth flow to use for its device
#[utoipa::path(
    get,
    path = "/api/auth/oauth-flow",
    params(
        ("has_touch" = bool, Query, description = "Device reports touch support"),
        ("viewport_width" = u32, Query, description = "Viewport width in CSS pixels")
    ),
    responses(
        (status = 200, description = "Preferred flow for this device", body = OAuthFlowResponse)
    ),
    tag = "auth"
)]
pub async fn oauth_flow_handler(
    Query(query): Query<OAuthFlowQuery>,
    headers: HeaderMap,
) -> Json<OAuthFlowResponse> {
    let user_agent = headers
        .get("User-Agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    Json(OAuthFlowResponse {
        flow: preferred_oauth_flow(user_agent, query.has_touch, query.viewport_width),
    })
}

/// Handler for account deletion. Protected route; deletes the calling user.
#[utoipa::path(
    delete,
    path = "/api/auth/account",
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn delete_account_handler(
    State(auth_service): State<Arc<dyn AuthService>>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> Result<StatusCode, Response> {
    match auth_service.delete_account(user.user_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into_response()),
    }
}
