use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown channel {0}")]
    UnknownChannel(String),
    #[error("unknown stream {0}")]
    UnknownStream(String),
    #[error("device has no known address")]
    DeviceUnreachable,
    #[error("device declined the INVITE: {0}")]
    Rejected(u16),
    #[error("device did not answer before the transaction timeout")]
    NoAnswer,
    #[error("sip codec error: {0}")]
    Sip(#[from] gb28181_sip_core::Error),
    #[error("media engine error: {0}")]
    Media(#[from] gb28181_media_client::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
