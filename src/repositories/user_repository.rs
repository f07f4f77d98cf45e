use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::UserAccount;
use crate::repositories::RepositoryError;

/// Trait defining auth-identity repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create an anonymous identity with no credentials
    async fn create_anonymous(&self) -> Result<UserAccount, RepositoryError>;

    /// Create an identity with an email/password credential
    async fn create_with_email(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<UserAccount, RepositoryError>;

    /// Create an identity backed by a Google subject
    async fn create_with_google(
        &self,
        subject: &str,
        email: Option<&str>,
    ) -> Result<UserAccount, RepositoryError>;

    /// Find an identity by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>, RepositoryError>;

    /// Find an identity by email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError>;

    /// Find an identity by Google subject
    async fn find_by_google_subject(
        &self,
        subject: &str,
    ) -> Result<Option<UserAccount>, RepositoryError>;

    /// Attach an email/password credential to an existing (anonymous)
    /// identity, clearing the anonymous flag. The id is preserved.
    async fn attach_email_credential(
        &self,
        user_id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<UserAccount, RepositoryError>;

    /// Attach a Google subject to an existing (anonymous) identity, clearing
    /// the anonymous flag. The id is preserved.
    async fn attach_google_identity(
        &self,
        user_id: Uuid,
        subject: &str,
        email: Option<&str>,
    ) -> Result<UserAccount, RepositoryError>;

    /// Hard-delete an identity; owned rows cascade at the database level
    async fn delete(&self, user_id: Uuid) -> Result<(), RepositoryError>;
}

/// PostgreSQL implementation of UserRepository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, email, password_hash, google_subject, is_anonymous, created_at";

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create_anonymous(&self) -> Result<UserAccount, RepositoryError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "INSERT INTO users (id, is_anonymous) VALUES ($1, TRUE) RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn create_with_email(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<UserAccount, RepositoryError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "INSERT INTO users (id, email, password_hash, is_anonymous)
             VALUES ($1, $2, $3, FALSE) RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn create_with_google(
        &self,
        subject: &str,
        email: Option<&str>,
    ) -> Result<UserAccount, RepositoryError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "INSERT INTO users (id, email, google_subject, is_anonymous)
             VALUES ($1, $2, $3, FALSE) RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(subject)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>, RepositoryError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, RepositoryError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_google_subject(
        &self,
        subject: &str,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "SELECT {} FROM users WHERE google_subject = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn attach_email_credential(
        &self,
        user_id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<UserAccount, RepositoryError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "UPDATE users SET email = $2, password_hash = $3, is_anonymous = FALSE
             WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(user_id)
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(account)
    }

    async fn attach_google_identity(
        &self,
        user_id: Uuid,
        subject: &str,
        email: Option<&str>,
    ) -> Result<UserAccount, RepositoryError> {
        let account = sqlx::query_as::<_, UserAccount>(&format!(
            "UPDATE users SET google_subject = $2, email = COALESCE(email, $3),
             is_anonymous = FALSE WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(user_id)
        .bind(subject)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(account)
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
