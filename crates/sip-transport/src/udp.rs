use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use gb28181_sip_core::parser::parse_message;
use gb28181_sip_core::Message;

use crate::error::{Error, Result};
use crate::event::TransportEvent;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;
/// One SIP message rarely exceeds a few KB; GB/T-28181 devices don't send
/// fragmented UDP. 64 KiB covers the UDP datagram maximum.
const RECV_BUFFER_SIZE: usize = 65536;

struct Inner {
    socket: UdpSocket,
    local_addr: SocketAddr,
    outbound_ip: IpAddr,
    closed: AtomicBool,
    malformed_count: AtomicU64,
}

/// The single UDP endpoint the signaling process listens and sends on.
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<Inner>,
}

impl UdpTransport {
    /// Bind to `addr` and spawn the single-consumer receive loop.
    pub async fn bind(
        addr: SocketAddr,
        channel_capacity: Option<usize>,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        let outbound_ip = resolve_outbound_ip(local_addr).unwrap_or(local_addr.ip());

        let (events_tx, events_rx) = mpsc::channel(channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY));

        let transport = UdpTransport {
            inner: Arc::new(Inner {
                socket,
                local_addr,
                outbound_ip,
                closed: AtomicBool::new(false),
                malformed_count: AtomicU64::new(0),
            }),
        };

        transport.spawn_receive_loop(events_tx);

        Ok((transport, events_rx))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// The address cached at bind time for use in SDP `o=`/`c=` origin lines.
    pub fn outbound_ip(&self) -> IpAddr {
        self.inner.outbound_ip
    }

    pub fn malformed_count(&self) -> u64 {
        self.inner.malformed_count.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }

    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Relaxed);
    }

    /// Serialize and send a single SIP message. Re-serializes every time;
    /// the codec never passes raw bytes through verbatim.
    pub async fn send_message(&self, message: &Message, destination: SocketAddr) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let bytes = message.to_bytes();
        debug!(%destination, len = bytes.len(), "sending SIP message");
        self.inner
            .socket
            .send_to(&bytes, destination)
            .await
            .map_err(|_| Error::SendFailed(destination))?;
        Ok(())
    }

    fn spawn_receive_loop(&self, events_tx: mpsc::Sender<TransportEvent>) {
        let transport = self.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            loop {
                if transport.is_closed() {
                    break;
                }
                match transport.inner.socket.recv_from(&mut buf).await {
                    Ok((len, source)) => match parse_message(&buf[..len]) {
                        Ok(message) => {
                            if events_tx
                                .send(TransportEvent::MessageReceived { message, source })
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(e) => {
                            transport
                                .inner
                                .malformed_count
                                .fetch_add(1, Ordering::Relaxed);
                            warn!(%source, error = %e, "dropping malformed datagram");
                            let _ = events_tx
                                .send(TransportEvent::Malformed {
                                    source,
                                    reason: e.to_string(),
                                })
                                .await;
                        }
                    },
                    Err(e) => {
                        if transport.is_closed() {
                            break;
                        }
                        warn!(error = %e, "UDP recv error");
                    }
                }
            }
            let _ = events_tx.send(TransportEvent::Closed).await;
        });
    }
}

impl fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UdpTransport({})", self.inner.local_addr)
    }
}

/// Discover the address this process would use to reach the outside world,
/// by "connecting" a scratch UDP socket and reading back its local address —
/// the usual no-packets-sent trick, since the bound listener itself may be
/// on `0.0.0.0`.
fn resolve_outbound_ip(bound: SocketAddr) -> std::io::Result<IpAddr> {
    if !bound.ip().is_unspecified() {
        return Ok(bound.ip());
    }
    let probe = std::net::UdpSocket::bind("0.0.0.0:0")?;
    probe.connect("223.5.5.5:80")?;
    Ok(probe.local_addr()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb28181_sip_core::{Method, Request};

    #[tokio::test]
    async fn round_trips_a_message_between_two_bound_transports() {
        let (a, _a_rx) = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), None)
            .await
            .unwrap();
        let (b, mut b_rx) = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), None)
            .await
            .unwrap();

        let req = Request::new(Method::Register, "sip:3402000000@3402000000".parse().unwrap());
        a.send_message(&Message::Request(req), b.local_addr())
            .await
            .unwrap();

        let event = b_rx.recv().await.unwrap();
        match event {
            TransportEvent::MessageReceived { message, .. } => {
                assert_eq!(message.call_id(), None);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_datagram_is_counted_and_does_not_stop_the_loop() {
        let (a, _a_rx) = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), None)
            .await
            .unwrap();
        let (b, mut b_rx) = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), None)
            .await
            .unwrap();

        let scratch = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        scratch.send_to(b"not a sip message", b.local_addr()).await.unwrap();

        let event = b_rx.recv().await.unwrap();
        assert!(matches!(event, TransportEvent::Malformed { .. }));
        assert_eq!(b.malformed_count(), 1);

        let req = Request::new(Method::Register, "sip:x@y".parse().unwrap());
        a.send_message(&Message::Request(req), b.local_addr())
            .await
            .unwrap();
        let event = b_rx.recv().await.unwrap();
        assert!(matches!(event, TransportEvent::MessageReceived { .. }));
    }
}
