//! Playback control (rate/seek/pause) carried as SIP `INFO` with a
//! MANSRTSP text body inside an already-negotiated dialog.

use gb28181_sip_core::{HeaderName, Method, Request, Uri};

use crate::stream::Stream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    Play,
    Pause,
    Teardown,
}

impl PlaybackAction {
    fn as_str(self) -> &'static str {
        match self {
            PlaybackAction::Play => "PLAY",
            PlaybackAction::Pause => "PAUSE",
            PlaybackAction::Teardown => "TEARDOWN",
        }
    }
}

/// A single MANSRTSP control command: `PLAY`/`PAUSE`/`TEARDOWN` with an
/// optional seek (`Range: npt=<seconds>-`) and playback rate (`Scale`).
#[derive(Debug, Clone)]
pub struct MansrtspCommand {
    pub action: PlaybackAction,
    pub cseq: u32,
    pub range_seconds: Option<u64>,
    pub scale: Option<f64>,
}

impl MansrtspCommand {
    pub fn to_body(&self) -> String {
        let mut body = format!("{} MANSRTSP/1.0\r\nCSeq: {}\r\n", self.action.as_str(), self.cseq);
        if let Some(secs) = self.range_seconds {
            body.push_str(&format!("Range: npt={secs}-\r\n"));
        }
        if let Some(scale) = self.scale {
            body.push_str(&format!("Scale: {scale}\r\n"));
        }
        body.push_str("\r\n");
        body
    }
}

/// Build the `INFO` request that carries `command` inside `stream`'s
/// dialog. `stream.cseq` is taken as-is for the `CSeq` header, so the
/// `PlaySessionManager` must have already bumped it to the value this
/// request should carry before calling in; that's also what keeps
/// per-dialog INFO requests serialized, since the Manager holds the
/// Stream's lock for the bump.
pub fn build_info_request(stream: &Stream, local_addr: &str, region_id: &str, command: &MansrtspCommand) -> Request {
    let mut req = Request::new(Method::Info, Uri::new(stream.channel_id.clone(), region_id.to_string()))
        .with_header(
            HeaderName::Via,
            format!("SIP/2.0/UDP {local_addr};branch={}", gb28181_sip_core::tokens::new_branch()),
        )
        .with_header(HeaderName::From, format!("<sip:{}@{}>;tag={}", region_id, region_id, stream.from_tag))
        .with_header(HeaderName::CallId, stream.call_id.clone())
        .with_header(HeaderName::CSeq, format!("{} INFO", stream.cseq))
        .with_header(HeaderName::ContentType, "Application/MANSRTSP");
    if let Some(to_tag) = &stream.to_tag {
        req = req.with_header(
            HeaderName::To,
            format!("<sip:{}@{}>;tag={}", stream.channel_id, region_id, to_tag),
        );
    }
    req.with_body(command.to_body())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssrc::Kind;
    use gb28181_sip_core::message::HeaderAccess;

    #[test]
    fn seek_command_carries_the_npt_range() {
        let command = MansrtspCommand {
            action: PlaybackAction::Play,
            cseq: 2,
            range_seconds: Some(3112),
            scale: None,
        };
        let body = command.to_body();
        assert_eq!(body, "PLAY MANSRTSP/1.0\r\nCSeq: 2\r\nRange: npt=3112-\r\n\r\n");
    }

    #[test]
    fn info_request_targets_the_existing_dialog() {
        let mut stream = Stream::new(
            "1100000002".to_string(),
            "call-9".to_string(),
            "1100000002".to_string(),
            "ch1".to_string(),
            "dev1".to_string(),
            Kind::Playback,
        );
        stream.to_tag = Some("devtag".to_string());
        let command = MansrtspCommand {
            action: PlaybackAction::Play,
            cseq: 2,
            range_seconds: Some(3112),
            scale: None,
        };
        let req = build_info_request(&stream, "192.0.2.1:5060", "3402000000", &command);
        assert_eq!(req.method, Method::Info);
        assert_eq!(req.call_id(), Some("call-9"));
    }
}
