use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("media engine request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("media engine returned malformed JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("media engine error {code}: {msg}")]
    Api { code: i64, msg: String },
}

pub type Result<T> = std::result::Result<T, Error>;
