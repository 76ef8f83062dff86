#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown device {0}")]
    UnknownDevice(String),

    #[error("digest authentication failed")]
    Unauthorized,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
