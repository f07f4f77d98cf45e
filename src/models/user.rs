use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_currency_code;

/// Auth identity row. Anonymous accounts carry no email, password hash or
/// Google subject; credential linking fills those columns in place so the
/// user id (and everything keyed by it) survives the upgrade.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing)]
    pub google_subject: Option<String>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

/// Application profile, created by bootstrap after the first sign-in
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Profile {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub currency: String,
    pub theme: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for profile edits
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "display_name": "María García",
    "currency": "EUR",
    "theme": "dark",
    "language": "es"
}))]
pub struct UpdateProfileRequest {
    #[validate(length(
        min = 2,
        max = 100,
        message = "Display name must be between 2 and 100 characters"
    ))]
    pub display_name: Option<String>,

    #[validate(custom(function = "validate_currency_code"))]
    pub currency: Option<String>,

    pub theme: Option<String>,

    pub language: Option<String>,
}
