use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::category::DEFAULT_CATEGORY_TEMPLATE;
use crate::models::user::Profile;
use crate::repositories::category_repository::CategoryRepository;
use crate::repositories::profile_repository::ProfileRepository;
use crate::services::category_service::CategoryEvents;

/// Bootstrap errors
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// One-time post-signup setup: create the profile row and seed the default
/// categories. Both steps are idempotent, so a failed run is safely retried
/// on the next sign-in.
#[async_trait]
pub trait BootstrapService: Send + Sync {
    async fn run(
        &self,
        user_id: Uuid,
        display_name: &str,
        email: Option<&str>,
    ) -> Result<(), BootstrapError>;
}

/// Implementation of BootstrapService
pub struct BootstrapServiceImpl {
    profile_repository: Arc<dyn ProfileRepository>,
    category_repository: Arc<dyn CategoryRepository>,
    category_events: Arc<CategoryEvents>,
}

impl BootstrapServiceImpl {
    pub fn new(
        profile_repository: Arc<dyn ProfileRepository>,
        category_repository: Arc<dyn CategoryRepository>,
        category_events: Arc<CategoryEvents>,
    ) -> Self {
        Self {
            profile_repository,
            category_repository,
            category_events,
        }
    }
}

#[async_trait]
impl BootstrapService for BootstrapServiceImpl {
    async fn run(
        &self,
        user_id: Uuid,
        display_name: &str,
        email: Option<&str>,
    ) -> Result<(), BootstrapError> {
        // Step 1: profile creation. A backend trigger or an earlier run may
        // have created it already; insert-if-absent tolerates both.
        let now = Utc::now();
        let inserted = self
            .profile_repository
            .create_if_absent(Profile {
                user_id,
                display_name: display_name.to_string(),
                email: email.map(str::to_string),
                currency: "EUR".to_string(),
                theme: "system".to_string(),
                language: "es".to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|e| BootstrapError::DatabaseError(e.to_string()))?;

        if inserted {
            info!(%user_id, "created profile");
        } else {
            debug!(%user_id, "profile already present, skipping");
        }

        // Step 2: default category seeding, only when the user owns none.
        let count = self
            .category_repository
            .count_by_user(user_id)
            .await
            .map_err(|e| BootstrapError::DatabaseError(e.to_string()))?;

        if count == 0 {
            self.category_repository
                .seed(user_id, DEFAULT_CATEGORY_TEMPLATE)
                .await
                .map_err(|e| BootstrapError::DatabaseError(e.to_string()))?;
            self.category_events.publish(user_id);
            info!(
                %user_id,
                categories = DEFAULT_CATEGORY_TEMPLATE.len(),
                "seeded default categories"
            );
        } else {
            debug!(%user_id, count, "categories already present, skipping seed");
        }

        Ok(())
    }
}
