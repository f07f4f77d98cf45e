use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::{Profile, UpdateProfileRequest};
use crate::repositories::RepositoryError;

/// Trait defining profile repository operations
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Insert a profile if none exists for the user id. Returns true when a
    /// row was inserted, false when one was already there. Must tolerate
    /// being called twice without duplicating or erroring.
    async fn create_if_absent(&self, profile: Profile) -> Result<bool, RepositoryError>;

    /// Find a profile by its owning user id
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Profile>, RepositoryError>;

    /// Apply a partial update to a profile
    async fn update(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<Profile, RepositoryError>;
}

/// PostgreSQL implementation of ProfileRepository
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROFILE_COLUMNS: &str =
    "user_id, display_name, email, currency, theme, language, created_at, updated_at";

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn create_if_absent(&self, profile: Profile) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO profiles (user_id, display_name, email, currency, theme, language)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(profile.user_id)
        .bind(&profile.display_name)
        .bind(&profile.email)
        .bind(&profile.currency)
        .bind(&profile.theme)
        .bind(&profile.language)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM profiles WHERE user_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn update(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<Profile, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles SET
                 display_name = COALESCE($2, display_name),
                 currency = COALESCE($3, currency),
                 theme = COALESCE($4, theme),
                 language = COALESCE($5, language),
                 updated_at = NOW()
             WHERE user_id = $1 RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(request.display_name)
        .bind(request.currency)
        .bind(request.theme)
        .bind(request.language)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(profile)
    }
}
