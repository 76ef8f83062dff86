use std::net::SocketAddr;
use std::sync::Arc;

use gb28181_sip_core::{Message, Method, Response};
use gb28181_sip_transport::UdpTransport;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::timer::{next_retransmit_interval, T1, TRANSACTION_TIMEOUT};

/// Server-side transaction state. Non-INVITE transactions
/// only ever reach `Completed`/`Terminated`; INVITE transactions pass
/// through `Confirmed` once the matching ACK arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Proceeding,
    Completed,
    Confirmed,
    Terminated,
}

struct Shared {
    last_response: Mutex<Option<Response>>,
}

/// Handle the caller uses to send responses on a server transaction.
#[derive(Clone)]
pub struct ServerTransaction {
    shared: Arc<Shared>,
    method: Method,
    retransmit_tx: mpsc::Sender<()>,
    ack_tx: mpsc::Sender<()>,
}

impl ServerTransaction {
    /// Enqueue a response. For INVITE transactions, a 2xx is retransmitted
    /// on the timer schedule until `notify_ack` fires or Timer H expires.
    pub async fn respond(
        &self,
        transport: &UdpTransport,
        destination: SocketAddr,
        response: Response,
    ) {
        *self.shared.last_response.lock().await = Some(response.clone());
        let _ = transport
            .send_message(&Message::Response(response.clone()), destination)
            .await;

        if self.method == Method::Invite && response.status.is_success() {
            let _ = self.retransmit_tx.send(()).await;
        }
    }

    /// The transaction layer calls this when the matching ACK is observed,
    /// stopping 2xx retransmission (server INVITE transaction → Confirmed).
    pub async fn notify_ack(&self) {
        let _ = self.ack_tx.send(()).await;
    }
}

/// Start a server transaction for an inbound request. Returns the handle
/// the application uses to respond; the background task owns retransmission
/// of the final 2xx for INVITE until ACK or timeout.
pub fn spawn(transport: UdpTransport, method: Method, destination: SocketAddr) -> ServerTransaction {
    let shared = Arc::new(Shared {
        last_response: Mutex::new(None),
    });
    let (retransmit_tx, mut retransmit_rx) = mpsc::channel::<()>(1);
    let (ack_tx, mut ack_rx) = mpsc::channel::<()>(1);

    let handle = ServerTransaction {
        shared: shared.clone(),
        method,
        retransmit_tx,
        ack_tx,
    };

    if method == Method::Invite {
        tokio::spawn(async move {
            // Wait until `respond()` sends a 2xx before entering the
            // retransmit loop.
            if retransmit_rx.recv().await.is_none() {
                return;
            }
            let deadline = Instant::now() + TRANSACTION_TIMEOUT;
            let mut interval = T1;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                tokio::select! {
                    _ = ack_rx.recv() => {
                        debug!("server INVITE transaction confirmed by ACK");
                        break;
                    }
                    _ = sleep(interval.min(remaining)) => {
                        let resp = shared.last_response.lock().await.clone();
                        if let Some(resp) = resp {
                            let _ = transport
                                .send_message(&Message::Response(resp), destination)
                                .await;
                        }
                        interval = next_retransmit_interval(interval);
                    }
                }
            }
        });
    }

    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb28181_sip_core::StatusLine;

    #[tokio::test]
    async fn respond_sends_the_response_on_the_wire() {
        let (server_transport, _rx) = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), None)
            .await
            .unwrap();
        let (client_transport, mut client_rx) =
            UdpTransport::bind("127.0.0.1:0".parse().unwrap(), None)
                .await
                .unwrap();

        let tx = spawn(server_transport.clone(), Method::Register, client_transport.local_addr());
        tx.respond(
            &server_transport,
            client_transport.local_addr(),
            Response::new(StatusLine::new(200, "OK")),
        )
        .await;

        let event = client_rx.recv().await.unwrap();
        match event {
            gb28181_sip_transport::TransportEvent::MessageReceived { message, .. } => {
                assert!(matches!(message, Message::Response(_)));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
