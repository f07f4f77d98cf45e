pub mod auth_handlers;
pub mod category_handlers;
pub mod expense_handlers;
pub mod profile_handlers;

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use validator::ValidationErrors;

use crate::services::auth_service::AuthService;
use crate::services::category_service::CategoryService;
use crate::services::expense_service::ExpenseService;
use crate::services::profile_service::ProfileService;

pub use auth_handlers::ErrorResponse;

/// Shared handler state; substates extracted per handler via FromRef
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthService>,
    pub category_service: Arc<dyn CategoryService>,
    pub expense_service: Arc<dyn ExpenseService>,
    pub profile_service: Arc<dyn ProfileService>,
}

impl FromRef<AppState> for Arc<dyn AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<dyn CategoryService> {
    fn from_ref(state: &AppState) -> Self {
        state.category_service.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ExpenseService> {
    fn from_ref(state: &AppState) -> Self {
        state.expense_service.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ProfileService> {
    fn from_ref(state: &AppState) -> Self {
        state.profile_service.clone()
    }
}

/// Flatten validator errors into a single 400 response
pub(crate) fn validation_error_response(validation_errors: ValidationErrors) -> Response {
    let error_message = validation_errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ");

    let error_response = ErrorResponse::new("validation_error", &error_message);
    (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
}
