use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use gb28181_sip_core::digest;
use gb28181_sip_core::manscdp::Keepalive;
use gb28181_sip_core::message::HeaderAccess;
use gb28181_sip_core::{HeaderName, Method, Request};
use gb28181_transaction_core::TransactionManager;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

/// Outbound (cascade) registrant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    Idle,
    Challenged,
    Registered,
}

/// Upstream platform identity and credentials this process registers as a
/// lower-level device against.
#[derive(Clone)]
pub struct CascadeConfig {
    pub sid: String,
    pub sudp: String,
    pub spwd: String,
    pub laddr: String,
    pub region_id: String,
    pub remote: SocketAddr,
}

/// Drives the cascade registrant FSM. `regSeq`/`keepAliveSeq` are CSeq
/// counters; `keepAliveSN` is the serial embedded in the Keepalive XML body.
pub struct CascadeRegistrant {
    config: CascadeConfig,
    state: RwLock<CascadeState>,
    reg_seq: AtomicU32,
    keepalive_seq: AtomicU32,
    keepalive_sn: AtomicU64,
    running: RwLock<bool>,
}

impl CascadeRegistrant {
    pub fn new(config: CascadeConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: RwLock::new(CascadeState::Idle),
            reg_seq: AtomicU32::new(0),
            keepalive_seq: AtomicU32::new(0),
            keepalive_sn: AtomicU64::new(0),
            running: RwLock::new(false),
        })
    }

    pub async fn state(&self) -> CascadeState {
        *self.state.read().await
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Send an arbitrary MANSCDP+xml body upstream as a MESSAGE, the same
    /// request shape [`Self::send_keepalive`] uses for its Keepalive body.
    /// Used by the catalog-replay sweep to push unsolicited Catalog
    /// fragments after a re-REGISTER.
    pub async fn send_xml_message(&self, tx_manager: &TransactionManager, body: String) -> bool {
        let seq = self.keepalive_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let req = Request::new(Method::Message, format!("sip:{}@{}", self.config.sid, self.config.region_id).parse().unwrap())
            .with_header(HeaderName::Via, format!("SIP/2.0/UDP {};branch={}", self.config.laddr, gb28181_sip_core::tokens::new_branch()))
            .with_header(HeaderName::From, format!("<sip:{}@{}>;tag={}", self.config.sid, self.config.region_id, gb28181_sip_core::tokens::new_tag()))
            .with_header(HeaderName::To, format!("<sip:{}@{}>", self.config.sid, self.config.region_id))
            .with_header(HeaderName::CallId, gb28181_sip_core::tokens::new_call_id())
            .with_header(HeaderName::CSeq, format!("{seq} MESSAGE"))
            .with_header(HeaderName::ContentType, "Application/MANSCDP+xml")
            .with_body(body);

        let mut client_tx = tx_manager.send(req, self.config.remote);
        matches!(client_tx.final_response().await, Ok(resp) if resp.status.is_success())
    }

    fn build_register(&self, auth_header: Option<String>) -> Request {
        let seq = self.reg_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let uri = format!("sip:{}@{}", self.config.sid, self.config.region_id);
        let mut req = Request::new(Method::Register, uri.parse().unwrap())
            .with_header(
                HeaderName::Via,
                format!(
                    "SIP/2.0/UDP {};branch={}",
                    self.config.laddr,
                    gb28181_sip_core::tokens::new_branch()
                ),
            )
            .with_header(HeaderName::From, format!("<sip:{}@{}>;tag={}", self.config.sid, self.config.region_id, gb28181_sip_core::tokens::new_tag()))
            .with_header(HeaderName::To, format!("<sip:{}@{}>", self.config.sid, self.config.region_id))
            .with_header(HeaderName::CallId, gb28181_sip_core::tokens::new_call_id())
            .with_header(HeaderName::CSeq, format!("{seq} REGISTER"))
            .with_header(HeaderName::Expires, "3600");
        if let Some(auth) = auth_header {
            req = req.with_header(HeaderName::Authorization, auth);
        }
        req
    }

    /// Run one REGISTER attempt through to Challenged/Registered/Idle.
    async fn register_once(&self, tx_manager: &TransactionManager) {
        let req = self.build_register(None);
        let mut client_tx = tx_manager.send(req.clone(), self.config.remote);
        *self.state.write().await = CascadeState::Challenged;

        match client_tx.final_response().await {
            Ok(resp) if resp.status.code == 401 => {
                let Some(www_auth) = resp.header_value(&HeaderName::WwwAuthenticate) else {
                    warn!("401 without WWW-Authenticate during cascade REGISTER");
                    *self.state.write().await = CascadeState::Idle;
                    return;
                };
                let Some(creds) = gb28181_sip_core::digest::DigestCredentials::parse(
                    &format!("Digest {}", www_auth.trim_start_matches("Digest").trim_start_matches(' ')),
                ) else {
                    *self.state.write().await = CascadeState::Idle;
                    return;
                };
                let uri = format!("sip:{}@{}", self.config.sid, self.config.region_id);
                let response = digest::compute_response(
                    &self.config.sid,
                    &creds.realm,
                    &self.config.spwd,
                    &creds.nonce,
                    "REGISTER",
                    &uri,
                );
                let auth_value = format!(
                    "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", response=\"{}\"",
                    self.config.sid, creds.realm, creds.nonce, uri, response
                );
                let authed_req = self.build_register(Some(auth_value));
                let mut authed_tx = tx_manager.send(authed_req, self.config.remote);
                match authed_tx.final_response().await {
                    Ok(resp) if resp.status.is_success() => {
                        *self.state.write().await = CascadeState::Registered;
                        info!(sid = %self.config.sid, "cascade registered");
                    }
                    _ => {
                        *self.state.write().await = CascadeState::Idle;
                    }
                }
            }
            Ok(resp) if resp.status.is_success() => {
                // Some upstreams skip the challenge entirely.
                *self.state.write().await = CascadeState::Registered;
                info!(sid = %self.config.sid, "cascade registered without challenge");
            }
            _ => {
                *self.state.write().await = CascadeState::Idle;
            }
        }
    }

    async fn send_keepalive(&self, tx_manager: &TransactionManager) -> bool {
        let sn = self.keepalive_sn.fetch_add(1, Ordering::SeqCst) as u32 + 1;
        let seq = self.keepalive_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let body = Keepalive::new(sn, &self.config.sid).to_xml().unwrap_or_default();
        let req = Request::new(Method::Message, format!("sip:{}@{}", self.config.sid, self.config.region_id).parse().unwrap())
            .with_header(HeaderName::Via, format!("SIP/2.0/UDP {};branch={}", self.config.laddr, gb28181_sip_core::tokens::new_branch()))
            .with_header(HeaderName::From, format!("<sip:{}@{}>;tag={}", self.config.sid, self.config.region_id, gb28181_sip_core::tokens::new_tag()))
            .with_header(HeaderName::To, format!("<sip:{}@{}>", self.config.sid, self.config.region_id))
            .with_header(HeaderName::CallId, gb28181_sip_core::tokens::new_call_id())
            .with_header(HeaderName::CSeq, format!("{seq} MESSAGE"))
            .with_header(HeaderName::ContentType, "Application/MANSCDP+xml")
            .with_body(gb28181_sip_core::manscdp::encode_body(&body));

        let mut client_tx = tx_manager.send(req, self.config.remote);
        matches!(client_tx.final_response().await, Ok(resp) if resp.status.is_success())
    }

    /// Start the background driver: 60 s keepalive, 1 h proactive
    /// re-REGISTER, Idle retried immediately on keepalive timeout or
    /// non-2xx.
    pub async fn start(self: &Arc<Self>, tx_manager: Arc<TransactionManager>) {
        {
            let mut running = self.running.write().await;
            if *running {
                return;
            }
            *running = true;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.register_once(&tx_manager).await;
            let mut keepalive_ticker = interval(Duration::from_secs(60));
            let mut reregister_ticker = interval(Duration::from_secs(3600));
            keepalive_ticker.tick().await; // first tick fires immediately; skip it
            reregister_ticker.tick().await;

            while *this.running.read().await {
                tokio::select! {
                    _ = keepalive_ticker.tick() => {
                        if this.state().await == CascadeState::Registered {
                            if !this.send_keepalive(&tx_manager).await {
                                warn!("cascade keepalive failed, returning to Idle");
                                *this.state.write().await = CascadeState::Idle;
                                this.register_once(&tx_manager).await;
                            }
                        } else {
                            this.register_once(&tx_manager).await;
                        }
                    }
                    _ = reregister_ticker.tick() => {
                        this.register_once(&tx_manager).await;
                    }
                }
            }
        });
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
    }
}
