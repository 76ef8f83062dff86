use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport is closed")]
    Closed,

    #[error("failed to deliver datagram to {0}")]
    SendFailed(SocketAddr),
}

pub type Result<T> = std::result::Result<T, Error>;
