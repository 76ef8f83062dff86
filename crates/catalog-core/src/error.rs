#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown channel {0}")]
    UnknownChannel(String),

    #[error("unknown device {0}")]
    UnknownDevice(String),

    #[error(transparent)]
    Xml(#[from] gb28181_sip_core::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
