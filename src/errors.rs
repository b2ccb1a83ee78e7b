//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pledge amount: {0}")]
    Amount(String),
}

pub type Result<T> = std::result::Result<T, PaymentError>;
