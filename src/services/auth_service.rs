use async_trait::async_trait;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::auth::{LoginRequest, Session, SignUpRequest};
use crate::models::user::UserAccount;
use crate::repositories::profile_repository::ProfileRepository;
use crate::repositories::user_repository::UserRepository;
use crate::repositories::RepositoryError;
use crate::services::bootstrap_service::BootstrapService;
use crate::services::identity_verifier::IdentityVerifier;
use crate::validation::{check_password, is_valid_email, PasswordIssue};

/// Normalized auth errors. The UI branches on these, never on
/// provider-specific strings.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Password does not meet the policy")]
    WeakPassword(Vec<PasswordIssue>),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already in use")]
    EmailInUse,

    #[error("Credential already linked to another account")]
    CredentialInUse,

    #[error("Account has no registered profile")]
    UserNotRegistered,

    #[error("Too many attempts, try again later")]
    TooManyRequests,

    #[error("Sign-in provider is not available")]
    ProviderUnavailable,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<RepositoryError> for AuthError {
    fn from(e: RepositoryError) -> Self {
        AuthError::DatabaseError(e.to_string())
    }
}

/// Authenticated principal decoded from a session token
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: Uuid,
    pub is_anonymous: bool,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    anon: bool,
    exp: i64,
}

/// Trait defining authentication service operations.
///
/// State machine: `Unauthenticated → Anonymous → Authenticated(Permanent)`,
/// plus the direct `Unauthenticated → Authenticated(Permanent)` edge. The
/// anonymous-to-permanent transition is credential linking: the user id (and
/// all data keyed by it) is preserved.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an anonymous session; bootstrap runs for the new account
    async fn sign_in_as_guest(&self) -> Result<Session, AuthError>;

    /// Register with email/password. When `anonymous_user` names an existing
    /// anonymous account, the credential is linked to it instead of creating
    /// a fresh account.
    async fn sign_up_with_email(
        &self,
        request: SignUpRequest,
        anonymous_user: Option<Uuid>,
    ) -> Result<Session, AuthError>;

    /// Authenticate with email/password. A provider-side account with no
    /// profile row is rejected with `UserNotRegistered` and no session.
    async fn sign_in_with_email(&self, request: LoginRequest) -> Result<Session, AuthError>;

    /// Authenticate with a Google ID token, linking to `anonymous_user`
    /// when present
    async fn sign_in_with_google(
        &self,
        id_token: &str,
        anonymous_user: Option<Uuid>,
    ) -> Result<Session, AuthError>;

    /// Best-effort sign-out: always reports success
    async fn sign_out(&self, token: &str) -> Result<(), AuthError>;

    /// Validate a session token and return its principal
    async fn validate_token(&self, token: &str) -> Result<Principal, AuthError>;

    /// Hard-delete the account and everything keyed by it
    async fn delete_account(&self, user_id: Uuid) -> Result<(), AuthError>;
}

const SESSION_LIFETIME_HOURS: i64 = 24;
const MAX_FAILED_ATTEMPTS: u32 = 5;
const THROTTLE_WINDOW_SECS: u64 = 15 * 60;

#[derive(Debug)]
struct ThrottleEntry {
    failures: u32,
    window_start: Instant,
}

/// Implementation of AuthService
pub struct AuthServiceImpl {
    user_repository: Arc<dyn UserRepository>,
    profile_repository: Arc<dyn ProfileRepository>,
    bootstrap: Arc<dyn BootstrapService>,
    verifier: Arc<dyn IdentityVerifier>,
    jwt_secret: String,
    failed_logins: Mutex<HashMap<String, ThrottleEntry>>,
}

impl AuthServiceImpl {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        profile_repository: Arc<dyn ProfileRepository>,
        bootstrap: Arc<dyn BootstrapService>,
        verifier: Arc<dyn IdentityVerifier>,
        jwt_secret: String,
    ) -> Self {
        Self {
            user_repository,
            profile_repository,
            bootstrap,
            verifier,
            jwt_secret,
            failed_logins: Mutex::new(HashMap::new()),
        }
    }

    fn hash_password(password: &str) -> Result<String, AuthError> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AuthError::DatabaseError(format!("Password hashing failed: {}", e)))
    }

    fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        verify(password, hash)
            .map_err(|e| AuthError::DatabaseError(format!("Password verification failed: {}", e)))
    }

    fn issue_session(&self, account: &UserAccount) -> Result<Session, AuthError> {
        let expires_at = Utc::now() + Duration::hours(SESSION_LIFETIME_HOURS);

        let claims = Claims {
            sub: account.id.to_string(),
            anon: account.is_anonymous,
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::DatabaseError(format!("Token generation failed: {}", e)))?;

        Ok(Session {
            user_id: account.id,
            is_anonymous: account.is_anonymous,
            token,
            expires_at,
        })
    }

    fn decode_session(&self, token: &str) -> Result<Principal, AuthError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        let user_id =
            Uuid::parse_str(&token_data.claims.sub).map_err(|_| AuthError::InvalidToken)?;

        Ok(Principal {
            user_id,
            is_anonymous: token_data.claims.anon,
        })
    }

    fn check_throttle(&self, email: &str) -> Result<(), AuthError> {
        let mut failed = self.failed_logins.lock().unwrap();
        if let Some(entry) = failed.get(email) {
            if entry.window_start.elapsed().as_secs() >= THROTTLE_WINDOW_SECS {
                failed.remove(email);
            } else if entry.failures >= MAX_FAILED_ATTEMPTS {
                return Err(AuthError::TooManyRequests);
            }
        }
        Ok(())
    }

    fn record_failure(&self, email: &str) {
        let mut failed = self.failed_logins.lock().unwrap();
        // Shed expired windows for every email, not only the one retrying,
        // so abandoned entries never pile up.
        failed.retain(|_, entry| entry.window_start.elapsed().as_secs() < THROTTLE_WINDOW_SECS);
        let entry = failed.entry(email.to_string()).or_insert(ThrottleEntry {
            failures: 0,
            window_start: Instant::now(),
        });
        entry.failures += 1;
    }

    fn clear_failures(&self, email: &str) {
        self.failed_logins.lock().unwrap().remove(email);
    }

    /// Run bootstrap for a freshly authenticated account; failures are
    /// surfaced but the next sign-in retries safely thanks to idempotence.
    async fn run_bootstrap(
        &self,
        account: &UserAccount,
        display_name: &str,
    ) -> Result<(), AuthError> {
        self.bootstrap
            .run(account.id, display_name, account.email.as_deref())
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn sign_in_as_guest(&self) -> Result<Session, AuthError> {
        let account = self.user_repository.create_anonymous().await?;
        self.run_bootstrap(&account, "Invitado").await?;
        self.issue_session(&account)
    }

    async fn sign_up_with_email(
        &self,
        request: SignUpRequest,
        anonymous_user: Option<Uuid>,
    ) -> Result<Session, AuthError> {
        // Fail fast locally, before any database round trip.
        if !is_valid_email(&request.email) {
            return Err(AuthError::InvalidEmail);
        }
        let issues = check_password(&request.password);
        if !issues.is_empty() {
            return Err(AuthError::WeakPassword(issues));
        }

        let password_hash = Self::hash_password(&request.password)?;

        // An anonymous principal gets the credential linked in place,
        // preserving its id and everything attached to it.
        let linking_target = match anonymous_user {
            Some(id) => self
                .user_repository
                .find_by_id(id)
                .await?
                .filter(|account| account.is_anonymous),
            None => None,
        };

        let account = match linking_target {
            Some(anonymous) => self
                .user_repository
                .attach_email_credential(anonymous.id, &request.email, &password_hash)
                .await
                .map_err(|e| match e {
                    RepositoryError::ConstraintViolation(_) => AuthError::EmailInUse,
                    other => AuthError::DatabaseError(other.to_string()),
                })?,
            None => self
                .user_repository
                .create_with_email(&request.email, &password_hash)
                .await
                .map_err(|e| match e {
                    RepositoryError::ConstraintViolation(_) => AuthError::EmailInUse,
                    other => AuthError::DatabaseError(other.to_string()),
                })?,
        };

        self.run_bootstrap(&account, &request.display_name).await?;
        self.issue_session(&account)
    }

    async fn sign_in_with_email(&self, request: LoginRequest) -> Result<Session, AuthError> {
        self.check_throttle(&request.email)?;

        let account = match self.user_repository.find_by_email(&request.email).await? {
            Some(account) => account,
            None => {
                self.record_failure(&request.email);
                return Err(AuthError::InvalidCredentials);
            }
        };

        let password_hash = account
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        if !Self::verify_password(&request.password, password_hash)? {
            self.record_failure(&request.email);
            return Err(AuthError::InvalidCredentials);
        }
        self.clear_failures(&request.email);

        // Integrity check: an auth account with no profile row was created
        // outside the app's bootstrap path and must not become a session.
        let profile = match self.profile_repository.find_by_user(account.id).await? {
            Some(profile) => profile,
            None => {
                warn!(user_id = %account.id, "authenticated account has no profile, rejecting");
                return Err(AuthError::UserNotRegistered);
            }
        };

        // Re-run bootstrap so a step that failed after the profile landed
        // (category seeding, typically) completes on a later login.
        self.run_bootstrap(&account, &profile.display_name).await?;

        self.issue_session(&account)
    }

    async fn sign_in_with_google(
        &self,
        id_token: &str,
        anonymous_user: Option<Uuid>,
    ) -> Result<Session, AuthError> {
        let identity = self.verifier.verify(id_token).await?;

        let linking_target = match anonymous_user {
            Some(id) => self
                .user_repository
                .find_by_id(id)
                .await?
                .filter(|account| account.is_anonymous),
            None => None,
        };

        if let Some(anonymous) = linking_target {
            // Refuse to steal a subject already linked elsewhere.
            if let Some(existing) = self
                .user_repository
                .find_by_google_subject(&identity.subject)
                .await?
            {
                if existing.id != anonymous.id {
                    return Err(AuthError::CredentialInUse);
                }
            }

            let account = self
                .user_repository
                .attach_google_identity(
                    anonymous.id,
                    &identity.subject,
                    identity.email.as_deref(),
                )
                .await?;

            // A fresh token is enough to refresh the session; no full
            // reload is required.
            return self.issue_session(&account);
        }

        let account = match self
            .user_repository
            .find_by_google_subject(&identity.subject)
            .await?
        {
            Some(existing) => existing,
            None => {
                self.user_repository
                    .create_with_google(&identity.subject, identity.email.as_deref())
                    .await
                    .map_err(|e| match e {
                        RepositoryError::ConstraintViolation(_) => AuthError::CredentialInUse,
                        other => AuthError::DatabaseError(other.to_string()),
                    })?
            }
        };

        let display_name = identity.display_name.as_deref().unwrap_or("Usuario");
        self.run_bootstrap(&account, display_name).await?;
        self.issue_session(&account)
    }

    async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        // Sessions are stateless tokens; there is nothing to revoke
        // server-side. Sign-out is idempotent and never fails the caller.
        if let Err(e) = self.decode_session(token) {
            debug!("sign-out with invalid token: {}", e);
        }
        Ok(())
    }

    async fn validate_token(&self, token: &str) -> Result<Principal, AuthError> {
        self.decode_session(token)
    }

    async fn delete_account(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.user_repository.delete(user_id).await?;
        Ok(())
    }
}
