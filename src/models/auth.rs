use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Authenticated session returned by every successful auth operation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "user_id": "550e8400-e29b-41d4-a716-446655440000",
    "is_anonymous": false,
    "token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
    "expires_at": "2024-01-16T12:00:00Z"
}))]
pub struct Session {
    pub user_id: Uuid,
    pub is_anonymous: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Request payload for email/password sign-up
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "display_name": "María García",
    "email": "maria@example.com",
    "password": "S3gur4!contra"
}))]
pub struct SignUpRequest {
    #[validate(length(
        min = 2,
        max = 100,
        message = "Display name must be between 2 and 100 characters"
    ))]
    pub display_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Request payload for email/password sign-in
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "email": "maria@example.com",
    "password": "S3gur4!contra"
}))]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request payload for Google sign-in. The SPA completes the OAuth dance
/// itself and posts the resulting ID token here.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GoogleSignInRequest {
    pub id_token: String,
}

/// Identity extracted from a verified provider token
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// Provider-stable subject (Google `sub` claim)
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Which OAuth flow the client should use for the provider dance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OAuthFlow {
    Popup,
    Redirect,
}

/// Deterministic device heuristic for the OAuth dance: popups are routinely
/// blocked on touch and small-screen devices, so those get the redirect flow.
/// The exact thresholds are not a correctness contract.
pub fn preferred_oauth_flow(user_agent: &str, has_touch: bool, viewport_width: u32) -> OAuthFlow {
    const SMALL_SCREEN_WIDTH: u32 = 768;

    let mobile_agent = ["Android", "iPhone", "iPad", "Mobile"]
        .iter()
        .any(|needle| user_agent.contains(needle));

    if has_touch || mobile_agent || viewport_width < SMALL_SCREEN_WIDTH {
        OAuthFlow::Redirect
    } else {
        OAuthFlow::Popup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESKTOP_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/120.0";
    const PHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";

    #[test]
    fn desktop_without_touch_gets_popup() {
        assert_eq!(preferred_oauth_flow(DESKTOP_UA, false, 1920), OAuthFlow::Popup);
    }

    #[test]
    fn touch_device_gets_redirect() {
        assert_eq!(preferred_oauth_flow(DESKTOP_UA, true, 1920), OAuthFlow::Redirect);
    }

    #[test]
    fn mobile_agent_gets_redirect() {
        assert_eq!(preferred_oauth_flow(PHONE_UA, false, 1920), OAuthFlow::Redirect);
    }

    #[test]
    fn small_viewport_gets_redirect() {
        assert_eq!(preferred_oauth_flow(DESKTOP_UA, false, 600), OAuthFlow::Redirect);
    }

    #[test]
    fn heuristic_is_deterministic() {
        let first = preferred_oauth_flow(DESKTOP_UA, false, 1024);
        for _ in 0..10 {
            assert_eq!(preferred_oauth_flow(DESKTOP_UA, false, 1024), first);
        }
    }
}
