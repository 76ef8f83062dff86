//! Owns the SIP signaling socket: one UDP endpoint bound to the configured
//! address. A datagram is the framing unit per RFC-3261
//! §18 — one datagram carries exactly one SIP message — so the receive loop
//! hands each datagram straight to the codec and forwards the parsed result
//! (or a count of the malformed one) without buffering across reads.

pub mod error;
pub mod event;
pub mod udp;

pub use error::{Error, Result};
pub use event::TransportEvent;
pub use udp::UdpTransport;
