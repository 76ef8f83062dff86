use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use gb28181_catalog_core::ChannelStore;
use gb28181_media_client::MediaEngineClient;
use gb28181_sip_core::message::HeaderAccess;
use gb28181_sip_core::sdp::SessionDescription;
use gb28181_sip_core::{tokens, HeaderName, Method, Request, Response, StatusLine, Uri};
use gb28181_transaction_core::TransactionManager;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::info_control::{build_info_request, MansrtspCommand};
use crate::passive_push::PassivePortAllocator;
use crate::sdp_builder::{build_invite_sdp, build_passive_push_sdp, build_subject_header, InviteSdpParams};
use crate::ssrc::{Kind, SsrcAllocator};
use crate::store::StreamStore;
use crate::stream::{SessionState, Stream};

/// Resolves a Device's current source address. Kept as a trait rather than
/// a direct dependency on the registrar so this crate does not need to know
/// how devices are tracked, only where to send the next request.
pub trait DeviceLocator: Send + Sync {
    fn source_addr(&self, device_id: &str) -> Option<SocketAddr>;
}

/// A play request as the northbound surface receives it.
pub struct PlayRequest {
    pub channel_id: String,
    pub kind: Kind,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

pub struct PlayOutcome {
    pub stream_id: String,
    pub reused: bool,
}

/// SSRC reuse-avoidance grace period: held in reserve until 60 s past the
/// InitialWait deadline, so a media-engine frame racing the teardown never
/// lands against a freshly reallocated SSRC.
const SSRC_GRACE_SECS: u64 = 60;

/// Owns the live Stream set and drives INVITE/ACK/BYE negotiation, SSRC
/// allocation, and media-engine wiring. This is the only writer of Stream
/// state; every external event (webhook, caller request, deadline timer)
/// is applied by locking the Stream's own mutex, never by mutating through
/// a second path.
pub struct PlaySessionManager {
    region_id: String,
    server_id: String,
    local_addr: String,
    engine_ip: IpAddr,
    channels: Arc<ChannelStore>,
    locator: Arc<dyn DeviceLocator>,
    tx_manager: Arc<TransactionManager>,
    media: MediaEngineClient,
    store: StreamStore,
    ssrc_alloc: Arc<SsrcAllocator>,
    streams: DashMap<String, Arc<Mutex<Stream>>>,
    live_index: DashMap<String, String>,
    call_index: DashMap<String, String>,
    passive_ports: PassivePortAllocator,
}

impl PlaySessionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        region_id: impl Into<String>,
        server_id: impl Into<String>,
        local_addr: impl Into<String>,
        engine_ip: IpAddr,
        channels: Arc<ChannelStore>,
        locator: Arc<dyn DeviceLocator>,
        tx_manager: Arc<TransactionManager>,
        media: MediaEngineClient,
        store: StreamStore,
        passive_ports: PassivePortAllocator,
    ) -> Arc<Self> {
        let region_id = region_id.into();
        Arc::new(Self {
            ssrc_alloc: Arc::new(SsrcAllocator::new(region_id.clone())),
            region_id,
            server_id: server_id.into(),
            local_addr: local_addr.into(),
            engine_ip,
            channels,
            locator,
            tx_manager,
            media,
            store,
            streams: DashMap::new(),
            live_index: DashMap::new(),
            call_index: DashMap::new(),
            passive_ports,
        })
    }

    pub async fn get(&self, stream_id: &str) -> Option<Arc<Mutex<Stream>>> {
        self.streams.get(stream_id).map(|e| e.value().clone())
    }

    /// For `Kind::Live`, a Stream already negotiating or streaming on the
    /// same Channel is reused and its refcount bumped instead of opening a
    /// second dialog.
    pub async fn request_play(self: &Arc<Self>, req: PlayRequest) -> Result<PlayOutcome> {
        if req.kind == Kind::Live {
            let existing = self
                .live_index
                .get(&req.channel_id)
                .map(|e| e.value().clone())
                .and_then(|id| self.streams.get(&id).map(|s| (id, s.value().clone())));
            if let Some((existing_id, handle)) = existing {
                let mut guard = handle.lock().await;
                if !guard.state.is_terminal() {
                    guard.refcount += 1;
                    return Ok(PlayOutcome {
                        stream_id: existing_id,
                        reused: true,
                    });
                }
            }
        }

        let channel = self
            .channels
            .get(&req.channel_id)
            .ok_or_else(|| Error::UnknownChannel(req.channel_id.clone()))?;
        let destination = self
            .locator
            .source_addr(&channel.device_id)
            .ok_or(Error::DeviceUnreachable)?;

        let ssrc = self.ssrc_alloc.allocate(req.kind);
        let stream_id = ssrc.clone();
        let call_id = tokens::new_call_id();
        let mut stream = Stream::new(
            stream_id.clone(),
            call_id.clone(),
            ssrc.clone(),
            req.channel_id.clone(),
            channel.device_id.clone(),
            req.kind,
        );
        stream.start = req.start;
        stream.end = req.end;
        stream.from_tag = tokens::new_tag();

        let handle = Arc::new(Mutex::new(stream));
        self.streams.insert(stream_id.clone(), handle.clone());
        self.call_index.insert(call_id.clone(), stream_id.clone());
        if req.kind == Kind::Live {
            self.live_index.insert(req.channel_id.clone(), stream_id.clone());
        }

        let outcome = self.negotiate(handle.clone(), destination).await;
        if let Err(err) = &outcome {
            warn!(stream_id = %stream_id, error = %err, "play negotiation failed");
            let mut guard = handle.lock().await;
            guard.state = SessionState::Failed;
            self.finish(&req.channel_id, &stream_id, &guard).await;
        }
        outcome.map(|_| PlayOutcome {
            stream_id,
            reused: false,
        })
    }

    async fn negotiate(self: &Arc<Self>, handle: Arc<Mutex<Stream>>, destination: SocketAddr) -> Result<()> {
        let (stream_id, ssrc, channel_id, kind, start, end) = {
            let guard = handle.lock().await;
            (
                guard.stream_id.clone(),
                guard.ssrc.clone(),
                guard.channel_id.clone(),
                guard.kind,
                guard.start,
                guard.end,
            )
        };

        let tcp_mode = u8::from(kind != Kind::Playback);
        let port = self.media.open_rtp_server(&stream_id, tcp_mode).await?;

        let sdp = build_invite_sdp(&InviteSdpParams {
            channel_id: &channel_id,
            ssrc: &ssrc,
            kind,
            engine_ip: self.engine_ip,
            engine_port: port,
            start,
            end,
            download_rate: None,
        });
        let subject = build_subject_header(&channel_id, &ssrc, &self.server_id);

        let (from_tag, call_id) = {
            let guard = handle.lock().await;
            (guard.from_tag.clone(), guard.call_id.clone())
        };

        let invite = Request::new(Method::Invite, Uri::new(channel_id.clone(), self.region_id.clone()))
            .with_header(
                HeaderName::Via,
                format!("SIP/2.0/UDP {};branch={}", self.local_addr, tokens::new_branch()),
            )
            .with_header(
                HeaderName::From,
                format!("<sip:{}@{}>;tag={}", self.server_id, self.region_id, from_tag),
            )
            .with_header(HeaderName::To, format!("<sip:{channel_id}@{}>", self.region_id))
            .with_header(HeaderName::CallId, call_id.clone())
            .with_header(HeaderName::CSeq, "1 INVITE")
            .with_header(HeaderName::Subject, subject)
            .with_header(HeaderName::MaxForwards, "70")
            .with_header(HeaderName::ContentType, "application/sdp")
            .with_body(sdp.encode());

        let mut client_tx = self.tx_manager.send(invite.clone(), destination);
        let response = client_tx
            .final_response()
            .await
            .map_err(|_| Error::NoAnswer)?;

        if !response.status.is_success() {
            return Err(Error::Rejected(response.status.code));
        }

        let device_sdp = SessionDescription::decode(&String::from_utf8_lossy(&response.body))?;
        self.tx_manager.ack(&invite, &response, destination).await;

        {
            let mut guard = handle.lock().await;
            guard.to_tag = response.to_tag();
            guard.device_sdp = Some(device_sdp);
            guard.enter_initial_wait();
            self.store.save(&guard).await?;
        }

        self.spawn_deadline_watchdog(handle, destination);
        Ok(())
    }

    fn spawn_deadline_watchdog(self: &Arc<Self>, handle: Arc<Mutex<Stream>>, destination: SocketAddr) {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                let (deadline_passed, channel_id, stream_id) = {
                    let guard = handle.lock().await;
                    if guard.state != SessionState::InitialWait {
                        return;
                    }
                    (guard.deadline_passed(), guard.channel_id.clone(), guard.stream_id.clone())
                };
                if deadline_passed {
                    warn!(stream_id = %stream_id, "initial wait deadline passed with no ingress");
                    let snapshot = {
                        let mut guard = handle.lock().await;
                        guard.state = SessionState::Failed;
                        guard.clone()
                    };
                    let _ = this.send_bye(&snapshot, destination).await;
                    let guard = handle.lock().await;
                    this.finish(&channel_id, &stream_id, &guard).await;
                    return;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });
    }

    /// `on_stream_changed(regist=true)` webhook: InitialWait → Streaming.
    pub async fn on_stream_changed(&self, ssrc: &str, registered: bool) -> Result<()> {
        let Some(handle) = self.streams.get(ssrc).map(|e| e.value().clone()) else {
            return Ok(());
        };
        let mut guard = handle.lock().await;
        guard.registered_in_engine = registered;
        if registered && guard.state == SessionState::InitialWait {
            guard.state = SessionState::Streaming;
            info!(ssrc, "stream is now streaming");
        } else if !registered && guard.state == SessionState::Streaming {
            guard.state = SessionState::Draining;
        }
        self.store.save(&guard).await
    }

    /// `on_stream_none_reader` webhook: Streaming → Draining → Closed.
    pub async fn on_stream_none_reader(&self, ssrc: &str) -> Result<()> {
        self.stop_play(ssrc).await
    }

    /// Decrements refcount for live Streams, tearing down the dialog only
    /// once it hits zero. Idempotent: calling this again on an already
    /// `Closed`/`Failed` Stream is a no-op. Resolves the device's current
    /// address itself so callers that only know the stream/ssrc (webhooks,
    /// the liveness sweep) never need to carry one around.
    pub async fn stop_play(&self, ssrc: &str) -> Result<()> {
        let Some(handle) = self.streams.get(ssrc).map(|e| e.value().clone()) else {
            return Ok(());
        };

        let snapshot = {
            let mut guard = handle.lock().await;
            if guard.state.is_terminal() {
                return Ok(());
            }
            if guard.refcount > 1 {
                guard.refcount -= 1;
                return self.store.save(&guard).await;
            }
            guard.state = SessionState::Draining;
            guard.clone()
        };

        if let Some(destination) = self.locator.source_addr(&snapshot.device_id) {
            self.send_bye(&snapshot, destination).await?;
        }

        let mut guard = handle.lock().await;
        guard.state = SessionState::Closed;
        let channel_id = guard.channel_id.clone();
        let stream_id = guard.stream_id.clone();
        self.finish(&channel_id, &stream_id, &guard).await;
        Ok(())
    }

    /// The device hung up first (inbound BYE on an existing dialog). Tear
    /// down local state and close the RTP server without sending our own
    /// BYE back — the device already knows the dialog is over.
    pub async fn on_remote_bye(&self, call_id: &str) -> Result<()> {
        let Some(stream_id) = self.call_index.get(call_id).map(|e| e.value().clone()) else {
            return Ok(());
        };
        let Some(handle) = self.streams.get(&stream_id).map(|e| e.value().clone()) else {
            return Ok(());
        };

        let snapshot = {
            let mut guard = handle.lock().await;
            if guard.state.is_terminal() {
                return Ok(());
            }
            guard.state = SessionState::Closed;
            guard.clone()
        };
        let _ = self.media.close_rtp_server(&snapshot.stream_id).await;

        let guard = handle.lock().await;
        self.finish(&snapshot.channel_id, &snapshot.stream_id, &guard).await;
        Ok(())
    }

    /// Cascade passive push: the upstream platform INVITEs this broker for a
    /// channel it is already receiving live from a child device, asking to
    /// receive it too. Only `Kind::Live` streams already `Streaming` are
    /// eligible — this never opens a new downstream dialog.
    pub async fn handle_upstream_invite(&self, req: &Request) -> Response {
        let channel_id = req.uri.user.clone().unwrap_or_default();
        let Some((stream_id, ssrc)) = self
            .live_index
            .get(&channel_id)
            .map(|e| e.value().clone())
            .and_then(|id| self.streams.get(&id).map(|s| (id, s.value().clone())))
            .and_then(|(id, handle)| {
                let guard = handle.try_lock().ok()?;
                (guard.state == SessionState::Streaming).then(|| (id, guard.ssrc.clone()))
            })
        else {
            return Response::new(StatusLine::new(480, "Temporarily Unavailable"));
        };

        let port = self.passive_ports.allocate();
        if self.media.start_send_rtp_passive(&stream_id, &ssrc, port).await.is_err() {
            return Response::new(StatusLine::new(500, "Server Internal Error"));
        }

        let sdp = build_passive_push_sdp(&channel_id, &ssrc, self.engine_ip, port);
        let mut resp = Response::new(StatusLine::new(200, "OK"))
            .with_header(HeaderName::ContentType, "application/sdp")
            .with_body(sdp.encode());
        for name in [HeaderName::Via, HeaderName::From, HeaderName::CallId, HeaderName::CSeq] {
            if let Some(value) = req.header_value(&name) {
                resp = resp.with_header(name, value.to_string());
            }
        }
        let to = req.header_value(&HeaderName::To).unwrap_or("").to_string();
        resp = resp.with_header(HeaderName::To, format!("{to};tag={}", tokens::new_tag()));
        resp
    }

    async fn send_bye(&self, stream: &Stream, destination: SocketAddr) -> Result<()> {
        let mut bye = Request::new(Method::Bye, Uri::new(stream.channel_id.clone(), self.region_id.clone()))
            .with_header(
                HeaderName::Via,
                format!("SIP/2.0/UDP {};branch={}", self.local_addr, tokens::new_branch()),
            )
            .with_header(
                HeaderName::From,
                format!("<sip:{}@{}>;tag={}", self.server_id, self.region_id, stream.from_tag),
            )
            .with_header(HeaderName::CallId, stream.call_id.clone())
            .with_header(HeaderName::CSeq, format!("{} BYE", stream.cseq + 1));
        if let Some(to_tag) = &stream.to_tag {
            bye = bye.with_header(
                HeaderName::To,
                format!("<sip:{}@{}>;tag={}", stream.channel_id, self.region_id, to_tag),
            );
        } else {
            bye = bye.with_header(HeaderName::To, format!("<sip:{}@{}>", stream.channel_id, self.region_id));
        }

        let mut client_tx = self.tx_manager.send(bye, destination);
        let _ = client_tx.final_response().await;
        let _ = self.media.close_rtp_server(&stream.stream_id).await;
        Ok(())
    }

    /// Send a MANSRTSP playback-control command (`PLAY`/`PAUSE`/`TEARDOWN`,
    /// with an optional seek/scale) as a SIP `INFO` inside `stream_id`'s
    /// existing dialog, and return the device's echoed final response.
    ///
    /// The Stream's own lock serializes this per dialog: the CSeq bump and
    /// the request it authorizes happen while the lock is held, so two
    /// concurrent calls for the same stream can never land on the same
    /// CSeq. The lock is released before the transaction round-trip, same
    /// as every other network call this manager makes.
    pub async fn playback_control(&self, stream_id: &str, command: MansrtspCommand) -> Result<Response> {
        let handle = self.get(stream_id).await.ok_or_else(|| Error::UnknownStream(stream_id.to_string()))?;

        let snapshot = {
            let mut guard = handle.lock().await;
            guard.cseq += 1;
            self.store.save(&guard).await?;
            guard.clone()
        };

        let destination = self.locator.source_addr(&snapshot.device_id).ok_or(Error::DeviceUnreachable)?;
        let command = MansrtspCommand {
            cseq: snapshot.cseq,
            ..command
        };
        let req = build_info_request(&snapshot, &self.local_addr, &self.region_id, &command);

        let mut client_tx = self.tx_manager.send(req, destination);
        let response = client_tx.final_response().await.map_err(|_| Error::NoAnswer)?;
        if !response.status.is_success() {
            return Err(Error::Rejected(response.status.code));
        }
        Ok(response)
    }

    /// Release all bookkeeping for a terminal Stream: drop it from the live
    /// map, release the live-channel index, and schedule SSRC release after
    /// the reuse-avoidance grace period.
    async fn finish(&self, channel_id: &str, stream_id: &str, stream: &Stream) {
        self.streams.remove(stream_id);
        self.live_index.remove_if(channel_id, |_, v| v.as_str() == stream_id);
        self.call_index.remove_if(&stream.call_id, |_, v| v.as_str() == stream_id);
        let _ = self.store.save(stream).await;

        let ssrc = stream.ssrc.clone();
        let alloc = self.ssrc_alloc.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(SSRC_GRACE_SECS)).await;
            alloc.release(&ssrc);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb28181_catalog_core::channel::Channel;
    use gb28181_catalog_core::ChannelStore;
    use gb28181_common::config::DatabaseConfig;
    use gb28181_media_client::MediaEngineClient;
    use gb28181_sip_core::message::HeaderAccess;
    use gb28181_sip_core::{HeaderName, Message, Method as SipMethod, Response, StatusLine};
    use gb28181_sip_transport::{TransportEvent, UdpTransport};
    use serde_json::json;
    use tokio::sync::mpsc;

    struct FixedLocator(SocketAddr);
    impl DeviceLocator for FixedLocator {
        fn source_addr(&self, _device_id: &str) -> Option<SocketAddr> {
            Some(self.0)
        }
    }

    async fn stub_media() -> (MediaEngineClient, tokio::task::JoinHandle<()>) {
        use axum::routing::post;
        use axum::{Json, Router};

        async fn open() -> Json<serde_json::Value> {
            Json(json!({"code": 0, "port": 30000}))
        }
        async fn close() -> Json<serde_json::Value> {
            Json(json!({"code": 0}))
        }
        let app = Router::new()
            .route("/index/api/openRtpServer", post(open))
            .route("/index/api/closeRtpServer", post(close))
            .route("/index/api/startSendRtpPassive", post(close));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (MediaEngineClient::new(format!("http://{addr}"), "secret"), handle)
    }

    /// A fake child device: answers every INVITE with 200+SDP and every BYE
    /// with 200, ignoring anything else (ACK in particular needs no reply).
    fn spawn_fake_device(transport: UdpTransport, mut events_rx: mpsc::Receiver<TransportEvent>) {
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let TransportEvent::MessageReceived {
                    message: Message::Request(req),
                    source,
                } = event
                else {
                    continue;
                };
                let mut resp = match req.method {
                    SipMethod::Invite => {
                        let sdp = build_invite_sdp(&InviteSdpParams {
                            channel_id: "ch1",
                            ssrc: "0100000099",
                            kind: Kind::Live,
                            engine_ip: "192.0.2.9".parse().unwrap(),
                            engine_port: 40000,
                            start: None,
                            end: None,
                            download_rate: None,
                        });
                        Response::new(StatusLine::new(200, "OK")).with_body(sdp.encode())
                    }
                    SipMethod::Bye => Response::new(StatusLine::new(200, "OK")),
                    SipMethod::Info => Response::new(StatusLine::new(200, "OK")),
                    _ => continue,
                };
                for name in [HeaderName::Via, HeaderName::From, HeaderName::CallId, HeaderName::CSeq] {
                    if let Some(value) = req.header_value(&name) {
                        resp = resp.with_header(name, value.to_string());
                    }
                }
                resp = resp.with_header(HeaderName::To, "<sip:ch1@3402000000>;tag=devtag");
                let _ = transport.send_message(&Message::Response(resp), source).await;
            }
        });
    }

    async fn test_setup() -> (Arc<PlaySessionManager>, tokio::task::JoinHandle<()>) {
        let pool = gb28181_common::db::connect(&DatabaseConfig {
            driver: "sqlite".to_string(),
            url: "sqlite::memory:".to_string(),
        })
        .await
        .unwrap();
        let channels = Arc::new(ChannelStore::new(pool.clone()));
        channels.upsert(Channel::new("ch1", "dev1", "Cam 1")).await.unwrap();

        let (device_transport, device_events) = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), None).await.unwrap();
        let device_addr = device_transport.local_addr();
        spawn_fake_device(device_transport, device_events);

        let (broker_transport, broker_events) = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), None).await.unwrap();
        let (tx_manager, _incoming) = TransactionManager::new(broker_transport, broker_events);

        let (media, media_handle) = stub_media().await;
        let store = StreamStore::new(pool);

        let sessions = PlaySessionManager::new(
            "3402000000",
            "34020000002000000001",
            "127.0.0.1:5060",
            "127.0.0.1".parse().unwrap(),
            channels,
            Arc::new(FixedLocator(device_addr)),
            tx_manager,
            media,
            store,
            PassivePortAllocator::new(30000, 31000),
        );
        (sessions, media_handle)
    }

    #[tokio::test]
    async fn a_second_live_request_for_the_same_channel_reuses_the_stream() {
        let (sessions, media_handle) = test_setup().await;

        let first = sessions
            .request_play(PlayRequest {
                channel_id: "ch1".to_string(),
                kind: Kind::Live,
                start: None,
                end: None,
            })
            .await
            .unwrap();
        assert!(!first.reused);

        let second = sessions
            .request_play(PlayRequest {
                channel_id: "ch1".to_string(),
                kind: Kind::Live,
                start: None,
                end: None,
            })
            .await
            .unwrap();
        assert!(second.reused);
        assert_eq!(second.stream_id, first.stream_id);

        let handle = sessions.get(&first.stream_id).await.unwrap();
        assert_eq!(handle.lock().await.refcount, 2);

        // First stop_play only decrements refcount; the dialog stays up.
        sessions.stop_play(&first.stream_id).await.unwrap();
        assert!(sessions.get(&first.stream_id).await.is_some());

        // Second stop_play tears the dialog down for real.
        sessions.stop_play(&first.stream_id).await.unwrap();
        assert!(sessions.get(&first.stream_id).await.is_none());

        media_handle.abort();
    }

    #[tokio::test]
    async fn an_inbound_bye_tears_down_the_stream_locally() {
        let (sessions, media_handle) = test_setup().await;

        let outcome = sessions
            .request_play(PlayRequest {
                channel_id: "ch1".to_string(),
                kind: Kind::Playback,
                start: Some(0),
                end: Some(100),
            })
            .await
            .unwrap();

        let handle = sessions.get(&outcome.stream_id).await.unwrap();
        let call_id = handle.lock().await.call_id.clone();

        sessions.on_remote_bye(&call_id).await.unwrap();
        assert!(sessions.get(&outcome.stream_id).await.is_none());

        media_handle.abort();
    }

    #[tokio::test]
    async fn upstream_invite_for_a_channel_with_no_live_stream_is_rejected() {
        let (sessions, media_handle) = test_setup().await;
        let req = Request::new(SipMethod::Invite, Uri::new("ch1", "3402000000"));

        let resp = sessions.handle_upstream_invite(&req).await;
        assert_eq!(resp.status.code, 480);

        media_handle.abort();
    }

    #[tokio::test]
    async fn upstream_invite_for_a_streaming_channel_answers_with_a_passive_sdp() {
        let (sessions, media_handle) = test_setup().await;
        let outcome = sessions
            .request_play(PlayRequest {
                channel_id: "ch1".to_string(),
                kind: Kind::Live,
                start: None,
                end: None,
            })
            .await
            .unwrap();
        sessions.on_stream_changed(&outcome.stream_id, true).await.unwrap();

        let req = Request::new(SipMethod::Invite, Uri::new("ch1", "3402000000"))
            .with_header(HeaderName::CallId, "upstream-call-1")
            .with_header(HeaderName::To, "<sip:ch1@3402000000>");

        let resp = sessions.handle_upstream_invite(&req).await;
        assert_eq!(resp.status.code, 200);
        assert!(String::from_utf8_lossy(&resp.body).contains("a=sendonly"));
        assert!(resp.header_value(&HeaderName::To).unwrap().contains(";tag="));

        media_handle.abort();
    }

    #[tokio::test]
    async fn repeated_playback_control_calls_never_reuse_a_cseq() {
        use crate::info_control::{MansrtspCommand, PlaybackAction};

        let (sessions, media_handle) = test_setup().await;

        let outcome = sessions
            .request_play(PlayRequest {
                channel_id: "ch1".to_string(),
                kind: Kind::Playback,
                start: Some(0),
                end: Some(100),
            })
            .await
            .unwrap();

        let handle = sessions.get(&outcome.stream_id).await.unwrap();
        let cseq_before = handle.lock().await.cseq;

        let pause = MansrtspCommand {
            action: PlaybackAction::Pause,
            cseq: 1,
            range_seconds: None,
            scale: None,
        };
        let resp = sessions.playback_control(&outcome.stream_id, pause).await.unwrap();
        assert_eq!(resp.status.code, 200);
        let cseq_after_first = handle.lock().await.cseq;
        assert!(cseq_after_first > cseq_before);

        let seek = MansrtspCommand {
            action: PlaybackAction::Play,
            cseq: 1,
            range_seconds: Some(30),
            scale: None,
        };
        let resp = sessions.playback_control(&outcome.stream_id, seek).await.unwrap();
        assert_eq!(resp.status.code, 200);
        let cseq_after_second = handle.lock().await.cseq;
        assert!(cseq_after_second > cseq_after_first);

        media_handle.abort();
    }

    #[tokio::test]
    async fn playback_control_on_an_unknown_stream_errors() {
        let (sessions, media_handle) = test_setup().await;
        let command = crate::info_control::MansrtspCommand {
            action: crate::info_control::PlaybackAction::Pause,
            cseq: 1,
            range_seconds: None,
            scale: None,
        };
        let err = sessions.playback_control("nonexistent", command).await.unwrap_err();
        assert!(matches!(err, Error::UnknownStream(_)));

        media_handle.abort();
    }
}
