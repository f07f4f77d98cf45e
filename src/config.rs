use std::env;

/// Configuration errors, raised at startup rather than surfacing later as
/// opaque network failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVariable(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Runtime configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    /// Google OAuth client id; Google sign-in is disabled when absent
    pub google_client_id: Option<String>,
    /// Path to a PEM file with Google's token-signing public keys
    pub google_jwks_pem: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = require("DATABASE_URL")?;
        let jwt_secret = require("JWT_SECRET")?;
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT", format!("{}", e)))?;

        Ok(Self {
            database_url,
            jwt_secret,
            host,
            port,
            google_client_id: env::var("GOOGLE_CLIENT_ID").ok(),
            google_jwks_pem: env::var("GOOGLE_JWKS_PEM").ok(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVariable(name))
}
