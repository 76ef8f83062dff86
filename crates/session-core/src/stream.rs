use gb28181_common::time::now_unix;
use gb28181_sip_core::sdp::SessionDescription;

use crate::ssrc::Kind;

/// The Stream state machine. `InitialWait`, `Streaming`, and `Draining` are
/// the webhook-observable states; `Closed`/`Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Requested,
    Inviting,
    Negotiated,
    InitialWait,
    Streaming,
    Draining,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

/// A single negotiated media session.
#[derive(Debug, Clone)]
pub struct Stream {
    pub stream_id: String,
    pub call_id: String,
    pub ssrc: String,
    pub channel_id: String,
    pub device_id: String,
    pub kind: Kind,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub from_tag: String,
    pub to_tag: Option<String>,
    pub cseq: u32,
    pub stop: bool,
    pub state: SessionState,
    /// Engine-flow-registered flag: set once `on_stream_changed(regist=true)`
    /// confirms the media engine has the flow.
    pub registered_in_engine: bool,
    /// Deadline by which the first frame must arrive, stamped on entering
    /// `InitialWait` as `now + 120s`.
    pub ext_deadline: i64,
    /// Cached SDP response from the device, needed to form BYE.
    pub device_sdp: Option<SessionDescription>,
    /// Live-session refcount. Always 1 for playback/download, which are
    /// never shared.
    pub refcount: u32,
}

pub const INITIAL_WAIT_SECS: i64 = 120;

impl Stream {
    pub fn new(stream_id: String, call_id: String, ssrc: String, channel_id: String, device_id: String, kind: Kind) -> Self {
        Self {
            stream_id,
            call_id,
            ssrc,
            channel_id,
            device_id,
            kind,
            start: None,
            end: None,
            from_tag: String::new(),
            to_tag: None,
            cseq: 1,
            stop: false,
            state: SessionState::Requested,
            registered_in_engine: false,
            ext_deadline: 0,
            device_sdp: None,
            refcount: 1,
        }
    }

    pub fn enter_initial_wait(&mut self) {
        self.state = SessionState::InitialWait;
        self.ext_deadline = now_unix() + INITIAL_WAIT_SECS;
    }

    pub fn deadline_passed(&self) -> bool {
        self.state == SessionState::InitialWait && now_unix() >= self.ext_deadline
    }
}
