//! Top-level error types for langreport.

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load env file {path}: {message}")]
    EnvFile { path: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("missing required config key: {0}")]
    MissingKey(String),
}

/// Database connection and schema errors.
///
/// Statement failures are not errors: they come back from
/// [`crate::db::Db::run`] as [`crate::db::QueryOutcome::Failed`].
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("failed to connect to SQLite at {path}: {source}")]
    Connect { path: String, source: sqlx::Error },

    #[error("failed to create schema: {0}")]
    Schema(#[source] sqlx::Error),
}
