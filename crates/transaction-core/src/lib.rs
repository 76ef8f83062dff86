//! RFC-3261-flavored client/server transactions: timers,
//! retransmission, and response correlation sit here so C4/C5/C6 never
//! touch raw sockets or retransmit logic directly.

pub mod client;
pub mod error;
pub mod key;
pub mod manager;
pub mod server;
pub mod timer;

pub use client::ClientTransaction;
pub use error::{Error, Result};
pub use key::TxKey;
pub use manager::{IncomingRequest, TransactionManager};
pub use server::{ServerState, ServerTransaction};
