use std::net::SocketAddr;

use gb28181_sip_core::Message;

/// What the receive loop hands upward to C3/C4/C5/C6.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A datagram that parsed cleanly into a SIP message.
    MessageReceived {
        message: Message,
        source: SocketAddr,
    },
    /// A datagram that failed to parse. Counted, never blocks the reader
    /// ("Malformed input is counted and dropped").
    Malformed {
        source: SocketAddr,
        reason: String,
    },
    /// The receive loop exited; no further events will arrive.
    Closed,
}
