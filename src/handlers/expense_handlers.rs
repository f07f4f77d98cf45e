use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::{validation_error_response, ErrorResponse};
use crate::middleware::auth_middleware::AuthenticatedUser;
use crate::models::expense::{
    CreateExpenseRequest, CreateFixedExpenseRequest, Expense, FixedExpense, MonthMarker,
    UpdateFixedExpenseRequest,
};
use crate::services::expense_service::{ExpenseError, ExpenseService};

/// Convert ExpenseError to HTTP response
impl IntoResponse for ExpenseError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ExpenseError::NotFound => (
                StatusCode::NOT_FOUND,
                "expense_not_found",
                "Expense not found",
            ),
            ExpenseError::InvalidCategory => (
                StatusCode::BAD_REQUEST,
                "invalid_category",
                "Category not found or not owned by user",
            ),
            ExpenseError::Unauthorized => (
                StatusCode::FORBIDDEN,
                "unauthorized",
                "Not allowed to access this expense",
            ),
            ExpenseError::DatabaseError(ref msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg.as_str(),
            ),
        };

        let error_response = ErrorResponse::new(error_type, message);
        (status, Json(error_response)).into_response()
    }
}

/// Query parameters for expense listing
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListExpensesQuery {
    /// Calendar month filter, `YYYY-MM`
    pub month: Option<String>,
}

/// Handler for listing expenses, optionally filtered to one calendar month
#[utoipa::path(
    get,
    path = "/api/expenses",
    params(("month" = Option<String>, Query, description = "Month filter, YYYY-MM")),
    responses(
        (status = 200, description = "User's expenses", body = Vec<Expense>),
        (status = 400, description = "Malformed month filter", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn list_expenses_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<ListExpensesQuery>,
) -> Result<Json<Vec<Expense>>, Response> {
    let result = match query.month {
        Some(raw) => {
            let month: MonthMarker = raw.parse().map_err(|e: String| {
                let error_response = ErrorResponse::new("invalid_month", &e);
                (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
            })?;
            expense_service.list_month(user.user_id, month).await
        }
        None => expense_service.list(user.user_id).await,
    };

    match result {
        Ok(expenses) => Ok(Json(expenses)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for logging an expense
#[utoipa::path(
    post,
    path = "/api/expenses",
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Expense logged", body = Expense),
        (status = 400, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn create_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(validation_errors));
    }

    match expense_service.create(user.user_id, request).await {
        Ok(expense) => Ok((StatusCode::CREATED, Json(expense))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for deleting an expense
#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    params(("id" = Uuid, Path, description = "Expense id")),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn delete_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, Response> {
    match expense_service.delete(user.user_id, expense_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for listing fixed-expense templates
#[utoipa::path(
    get,
    path = "/api/fixed-expenses",
    responses(
        (status = 200, description = "User's fixed expenses", body = Vec<FixedExpense>)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn list_fixed_expenses_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<FixedExpense>>, Response> {
    match expense_service.list_fixed(user.user_id).await {
        Ok(fixed) => Ok(Json(fixed)),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for creating a fixed-expense template
#[utoipa::path(
    post,
    path = "/api/fixed-expenses",
    request_body = CreateFixedExpenseRequest,
    responses(
        (status = 201, description = "Fixed expense created", body = FixedExpense),
        (status = 400, description = "Validation error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn create_fixed_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateFixedExpenseRequest>,
) -> Result<(StatusCode, Json<FixedExpense>), Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(validation_errors));
    }

    match expense_service.create_fixed(user.user_id, request).await {
        Ok(fixed) => Ok((StatusCode::CREATED, Json(fixed))),
        Err(e) => Err(e.into_response()),
    }
}

/// Handler for updating a fixed-expense template, including deactivation
#[utoipa::path(
    patch,
    path = "/api/fixed-expenses/{id}",
    params(("id" = Uuid, Path, description = "Fixed expense id")),
    request_body = UpdateFixedExpenseRequest,
    responses(
        (status = 200, description = "Fixed expense updated", body = FixedExpense),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Fixed expense not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
pub async fn update_fixed_expense_handler(
    State(expense_service): State<Arc<dyn ExpenseService>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(fixed_expense_id): Path<Uuid>,
    Json(request): Json<UpdateFixedExpenseRequest>,
) -> Result<Json<FixedExpense>, Response> {
    if let Err(validation_errors) = request.validate() {
        return Err(validation_error_response(validation_errors));
    }

    match expense_service
        .update_fixed(user.user_id, fixed_expense_id, request)
        .await
    {
        Ok(fixed) => Ok(Json(fixed)),
        Err(e) => Err(e.into_response()),
    }
}
