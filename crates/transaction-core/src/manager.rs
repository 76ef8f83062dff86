use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use gb28181_sip_core::message::HeaderAccess;
use gb28181_sip_core::{Message, Method, Request, Response};
use gb28181_sip_transport::{TransportEvent, UdpTransport};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::client::{self, ClientTransaction};
use crate::key::TxKey;
use crate::server::{self, ServerTransaction};

/// An inbound request with no matching transaction: a new request the
/// application layer (C4/C5/C6) must handle and respond to.
pub struct IncomingRequest {
    pub request: Request,
    pub source: SocketAddr,
    pub server_tx: ServerTransaction,
}

/// Correlates transport events to transactions and exposes the public
/// operations from `Send`, `Respond` (via the returned
/// [`ServerTransaction`]), and `Ack`.
pub struct TransactionManager {
    transport: UdpTransport,
    client_txs: DashMap<TxKey, mpsc::Sender<Response>>,
    server_txs: DashMap<TxKey, ServerTransaction>,
}

impl TransactionManager {
    pub fn new(
        transport: UdpTransport,
        events_rx: mpsc::Receiver<TransportEvent>,
    ) -> (Arc<Self>, mpsc::Receiver<IncomingRequest>) {
        let manager = Arc::new(Self {
            transport,
            client_txs: DashMap::new(),
            server_txs: DashMap::new(),
        });
        let (incoming_tx, incoming_rx) = mpsc::channel(64);
        tokio::spawn(manager.clone().dispatch_loop(events_rx, incoming_tx));
        (manager, incoming_rx)
    }

    /// The transport backing this manager, for callers (the application's
    /// inbound-request dispatch loop) that must reply via
    /// [`crate::server::ServerTransaction::respond`] outside this module.
    pub fn transport(&self) -> &UdpTransport {
        &self.transport
    }

    /// `Send(req) → Tx`.
    pub fn send(&self, req: Request, destination: SocketAddr) -> ClientTransaction {
        let sent_by = self.transport.local_addr().to_string();
        let key = TxKey::for_request(&req, sent_by);
        let (client_tx, sender) = client::spawn(self.transport.clone(), req, destination);
        if let Some(key) = key {
            self.client_txs.insert(key, sender);
        }
        client_tx
    }

    /// `Ack(resp)`: build and send the ACK for a 2xx INVITE response,
    /// reusing the CSeq number with `Method::Ack`.
    pub async fn ack(&self, original_invite: &Request, response: &Response, destination: SocketAddr) {
        let ack = client::build_ack(original_invite, response);
        let _ = self
            .transport
            .send_message(&Message::Request(ack), destination)
            .await;
    }

    async fn dispatch_loop(
        self: Arc<Self>,
        mut events_rx: mpsc::Receiver<TransportEvent>,
        incoming_tx: mpsc::Sender<IncomingRequest>,
    ) {
        while let Some(event) = events_rx.recv().await {
            match event {
                TransportEvent::MessageReceived { message, source } => match message {
                    Message::Request(req) => {
                        self.handle_inbound_request(req, source, &incoming_tx).await;
                    }
                    Message::Response(resp) => {
                        self.handle_inbound_response(resp, source).await;
                    }
                },
                TransportEvent::Malformed { source, reason } => {
                    warn!(%source, %reason, "transaction layer observed a malformed datagram");
                }
                TransportEvent::Closed => break,
            }
        }
    }

    async fn handle_inbound_request(
        &self,
        req: Request,
        source: SocketAddr,
        incoming_tx: &mpsc::Sender<IncomingRequest>,
    ) {
        let Some(branch) = req.via_branch() else {
            warn!("inbound request missing Via branch, dropping");
            return;
        };
        let key = TxKey::new(branch, source.to_string(), req.method);

        if req.method == Method::Ack {
            if let Some(tx) = self.server_txs.get(&key) {
                tx.notify_ack().await;
            }
            return;
        }

        if self.server_txs.contains_key(&key) {
            trace!(method = %req.method, "retransmitted request for an existing server transaction");
            return;
        }

        let server_tx = server::spawn(self.transport.clone(), req.method, source);
        self.server_txs.insert(key, server_tx.clone());

        let _ = incoming_tx
            .send(IncomingRequest {
                request: req,
                source,
                server_tx,
            })
            .await;
    }

    async fn handle_inbound_response(&self, resp: Response, _source: SocketAddr) {
        let Some(branch) = resp.via_branch() else {
            warn!("inbound response missing Via branch, dropping");
            return;
        };
        let Some((_, method)) = resp.cseq() else {
            warn!("inbound response missing CSeq, dropping");
            return;
        };
        let sent_by = self.transport.local_addr().to_string();
        let key = TxKey::new(branch, sent_by, method);

        if let Some(sender) = self.client_txs.get(&key) {
            if !client::deliver(sender.value(), resp).await {
                self.client_txs.remove(&key);
            }
        } else {
            trace!(method = %method, "response with no matching client transaction, dropping");
        }
    }
}
