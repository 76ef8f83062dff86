use std::net::SocketAddr;

use gb28181_sip_core::message::HeaderAccess;
use gb28181_sip_core::{Message, Method, Request, Response};
use gb28181_sip_transport::UdpTransport;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::timer::{next_retransmit_interval, T1, TRANSACTION_TIMEOUT};

/// Capacity of a transaction's inbound response queue (bounded
/// backpressure, 8 slots is ample for a handful of provisionals plus the
/// final response).
pub const RESPONSE_QUEUE_CAPACITY: usize = 8;

/// Handle returned by [`spawn`]; `next_response`/`final_response` pull from
/// the bounded queue the background task feeds.
pub struct ClientTransaction {
    rx: mpsc::Receiver<Response>,
}

impl ClientTransaction {
    /// Wait for the next final response (2xx-6xx), ignoring provisionals.
    /// Returns [`Error::Timeout`] once Timer B/F fires.
    pub async fn final_response(&mut self) -> Result<Response> {
        loop {
            match self.rx.recv().await {
                Some(resp) if resp.status.is_provisional() => {
                    trace!(code = resp.status.code, "provisional response observed");
                    continue;
                }
                Some(resp) => return Ok(resp),
                None => return Err(Error::Timeout),
            }
        }
    }

    /// Pull the next response of any kind (provisional or final), or `None`
    /// once the transaction has terminated.
    pub async fn next_response(&mut self) -> Option<Response> {
        self.rx.recv().await
    }
}

/// Send `req` and drive the client transaction's retransmission/timeout
/// state machine in the background.
///
/// The same state machine serves both INVITE and non-INVITE client
/// transactions: retransmit with doubling backoff until a provisional or
/// final response arrives, give up after `TRANSACTION_TIMEOUT`.
pub fn spawn(
    transport: UdpTransport,
    req: Request,
    destination: SocketAddr,
) -> (ClientTransaction, mpsc::Sender<Response>) {
    let (tx, rx) = mpsc::channel(RESPONSE_QUEUE_CAPACITY);
    tokio::spawn(run(transport, req, destination, tx.clone()));
    (ClientTransaction { rx }, tx)
}

async fn run(
    transport: UdpTransport,
    req: Request,
    destination: SocketAddr,
    tx: mpsc::Sender<Response>,
) {
    let message = Message::Request(req);
    if transport.send_message(&message, destination).await.is_err() {
        return;
    }

    let deadline = Instant::now() + TRANSACTION_TIMEOUT;
    let mut retransmit_interval = T1;
    let mut got_provisional = false;

    loop {
        let sleep_for = if got_provisional {
            // Once a provisional arrives the transaction stops retransmitting
            // and just waits out the remainder of the timeout for a final.
            deadline.saturating_duration_since(Instant::now())
        } else {
            retransmit_interval.min(deadline.saturating_duration_since(Instant::now()))
        };

        if sleep_for.is_zero() {
            break;
        }

        tokio::select! {
            _ = sleep(sleep_for) => {
                if Instant::now() >= deadline {
                    break;
                }
                if !got_provisional {
                    debug!("retransmitting client transaction request");
                    if transport.send_message(&message, destination).await.is_err() {
                        break;
                    }
                    retransmit_interval = next_retransmit_interval(retransmit_interval);
                }
            }
        }
    }
    // Channel closes on drop; `final_response`/`next_response` callers see
    // `None`/`Err(Timeout)` once no response ever arrived.
    let _ = tx;
}

/// Feed an inbound response that correlated to this client transaction.
/// Called by the manager's dispatch loop, not by transaction owners.
pub(crate) async fn deliver(tx: &mpsc::Sender<Response>, resp: Response) -> bool {
    tx.send(resp).await.is_ok()
}

/// Build the ACK for a 2xx final response, reusing the CSeq number with
/// `Method::Ack` (`Ack(resp)`).
pub fn build_ack(original_invite: &Request, response: &Response) -> Request {
    let cseq_num = response.cseq().map(|(n, _)| n).unwrap_or(1);
    let mut ack = Request::new(Method::Ack, original_invite.uri.clone());
    for h in &original_invite.headers {
        use gb28181_sip_core::HeaderName;
        match h.name {
            HeaderName::Via | HeaderName::From | HeaderName::CallId | HeaderName::MaxForwards => {
                ack.headers.push(h.clone());
            }
            _ => {}
        }
    }
    if let Some(to) = response.header(&gb28181_sip_core::HeaderName::To) {
        ack.headers.push(to.clone());
    }
    ack.add_header(
        gb28181_sip_core::HeaderName::CSeq,
        format!("{cseq_num} ACK"),
    );
    ack
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb28181_sip_core::message::HeaderAccess;
    use gb28181_sip_core::{HeaderName, StatusLine};

    #[test]
    fn ack_reuses_cseq_number_with_ack_method() {
        let invite = Request::new(Method::Invite, "sip:dev@region".parse().unwrap())
            .with_header(HeaderName::Via, "SIP/2.0/UDP 1.1.1.1:5060;branch=z9hG4bKx")
            .with_header(HeaderName::From, "<sip:broker@region>;tag=1")
            .with_header(HeaderName::CallId, "call1")
            .with_header(HeaderName::CSeq, "5 INVITE");
        let resp = Response::new(StatusLine::new(200, "OK"))
            .with_header(HeaderName::To, "<sip:dev@region>;tag=2")
            .with_header(HeaderName::CSeq, "5 INVITE");

        let ack = build_ack(&invite, &resp);
        assert_eq!(ack.method, Method::Ack);
        assert_eq!(ack.cseq(), Some((5, Method::Ack)));
        assert_eq!(ack.call_id(), Some("call1"));
        assert_eq!(ack.to_tag(), Some("2".to_string()));
    }
}
