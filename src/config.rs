//! Application configuration loaded from environment variables.
//!
//! All values are read once at startup into an immutable [`Config`] that is
//! passed to the handlers — the signing secrets are never read from ambient
//! state inside the verification logic.

use crate::errors::{PaymentError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Postfinance merchant account identifier (public, included in signed payloads)
    pub pspid: String,
    /// Secret used exclusively to sign outbound checkout requests
    pub sha1_in: String,
    /// Secret used exclusively to verify inbound IPN callbacks
    pub sha1_out: String,
    /// Live merchant account vs the Postfinance sandbox
    pub live: bool,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the HTTP server
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            pspid: env_var("PSPID").map_err(|_| {
                PaymentError::Config("PSPID environment variable is required".to_string())
            })?,
            sha1_in: env_var("SHA1_IN").map_err(|_| {
                PaymentError::Config("SHA1_IN environment variable is required".to_string())
            })?,
            sha1_out: env_var("SHA1_OUT").map_err(|_| {
                PaymentError::Config("SHA1_OUT environment variable is required".to_string())
            })?,
            live: env_var("LIVE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .map_err(|_| PaymentError::Config("Invalid LIVE".to_string()))?,
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./pledgepay.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| PaymentError::Config("Invalid API_PORT".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| PaymentError::Config(format!("Missing env var: {key}")))
}
