use thiserror::Error;

/// A type alias for handling `Result`s with [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Ambient errors shared across the broker: config loading and persistence.
///
/// Component-specific error kinds (malformed SIP, transaction timeout,
/// media-engine failure, …) live in their owning crate; this enum only
/// covers the cross-cutting concerns implemented here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
