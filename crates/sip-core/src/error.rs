use thiserror::Error;

/// A type alias for handling `Result`s with [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while parsing or building SIP/SDP/MANSCDP content.
///
/// These map onto the `Malformed` error kind the transport and transaction
/// layers count and drop messages under, rather than propagating a panic.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("invalid SIP method: {0}")]
    InvalidMethod(String),

    #[error("invalid request line: {0}")]
    InvalidRequestLine(String),

    #[error("invalid status line: {0}")]
    InvalidStatusLine(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("content-length mismatch: expected {expected}, got {actual}")]
    ContentLengthMismatch { expected: usize, actual: usize },

    #[error("invalid SDP: {0}")]
    InvalidSdp(String),

    #[error("invalid MANSCDP xml: {0}")]
    InvalidXml(String),

    #[error("truncated message")]
    Truncated,
}
