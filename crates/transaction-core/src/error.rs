#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No final response within `TransactionTimeout` (Timer B/F).
    #[error("transaction timed out waiting for a final response")]
    Timeout,

    /// The transaction's response channel was dropped or it had already
    /// reached the Terminated state.
    #[error("transaction already terminated")]
    Terminated,

    /// The caller tried an operation the transaction's current state
    /// doesn't allow (e.g. `Ack` on a non-2xx response).
    #[error("malformed transaction operation: {0}")]
    Malformed(String),

    #[error(transparent)]
    Transport(#[from] gb28181_sip_transport::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
