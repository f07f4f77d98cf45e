use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::user::{Profile, UpdateProfileRequest};
use crate::repositories::profile_repository::ProfileRepository;
use crate::repositories::RepositoryError;

/// Profile-related errors
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Profile not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for ProfileError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ProfileError::NotFound,
            other => ProfileError::DatabaseError(other.to_string()),
        }
    }
}

/// Trait defining profile service operations
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Profile, ProfileError>;

    async fn update(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<Profile, ProfileError>;
}

/// Implementation of ProfileService
pub struct ProfileServiceImpl {
    profile_repository: Arc<dyn ProfileRepository>,
}

impl ProfileServiceImpl {
    pub fn new(profile_repository: Arc<dyn ProfileRepository>) -> Self {
        Self { profile_repository }
    }
}

#[async_trait]
impl ProfileService for ProfileServiceImpl {
    async fn get(&self, user_id: Uuid) -> Result<Profile, ProfileError> {
        self.profile_repository
            .find_by_user(user_id)
            .await?
            .ok_or(ProfileError::NotFound)
    }

    async fn update(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<Profile, ProfileError> {
        Ok(self.profile_repository.update(user_id, request).await?)
    }
}
