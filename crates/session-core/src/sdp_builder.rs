use std::net::IpAddr;

use gb28181_sip_core::sdp::{Connection, MediaAttribute, MediaDescription, SessionDescription, SetupRole};

use crate::ssrc::Kind;

/// Everything [`build_invite_sdp`] needs beyond the channel/SSRC identity.
pub struct InviteSdpParams<'a> {
    pub channel_id: &'a str,
    pub ssrc: &'a str,
    pub kind: Kind,
    pub engine_ip: IpAddr,
    pub engine_port: u16,
    pub start: Option<i64>,
    pub end: Option<i64>,
    /// Download-only: negotiated playback speed, emitted as the
    /// `downloadspeed` attribute.
    pub download_rate: Option<String>,
}

/// Build the SDP offer sent in the INVITE. Live and download use
/// TCP-passive (device connects to us); playback stays on plain RTP/AVP.
pub fn build_invite_sdp(params: &InviteSdpParams) -> SessionDescription {
    let (proto, tcp_passive) = match params.kind {
        Kind::Live | Kind::Download => ("TCP/RTP/AVP", true),
        Kind::Playback => ("RTP/AVP", false),
    };

    let mut media = MediaDescription::new_video(params.engine_port, proto, &[96, 98, 97])
        .with_attribute(MediaAttribute::RecvOnly);
    if tcp_passive {
        media = media
            .with_attribute(MediaAttribute::Setup(SetupRole::Passive))
            .with_attribute(MediaAttribute::ConnectionNew);
    }
    if let Some(rate) = &params.download_rate {
        media = media.with_attribute(MediaAttribute::DownloadSpeed(rate.clone()));
    }

    let (time_start, time_end) = match params.kind {
        Kind::Live => (0, 0),
        _ => (
            params.start.unwrap_or(0).max(0) as u64,
            params.end.unwrap_or(0).max(0) as u64,
        ),
    };

    SessionDescription {
        origin_user: params.channel_id.to_string(),
        session_id: "0".to_string(),
        session_version: "0".to_string(),
        origin_addr: params.engine_ip.to_string(),
        session_name: session_name(params.kind).to_string(),
        connection: Connection {
            addr: params.engine_ip.to_string(),
        },
        time_start,
        time_end,
        media: vec![media],
        ssrc: params.ssrc.to_string(),
    }
}

/// Build the SDP answer for a cascade-passive-push INVITE: we are the media
/// source, waiting passively on `local_port` for the upstream platform to
/// connect and pull `ssrc`.
pub fn build_passive_push_sdp(channel_id: &str, ssrc: &str, engine_ip: IpAddr, local_port: u16) -> SessionDescription {
    let media = MediaDescription::new_video(local_port, "TCP/RTP/AVP", &[96, 98, 97])
        .with_attribute(MediaAttribute::SendOnly)
        .with_attribute(MediaAttribute::Setup(SetupRole::Passive))
        .with_attribute(MediaAttribute::ConnectionNew);

    SessionDescription {
        origin_user: channel_id.to_string(),
        session_id: "0".to_string(),
        session_version: "0".to_string(),
        origin_addr: engine_ip.to_string(),
        session_name: "Play".to_string(),
        connection: Connection { addr: engine_ip.to_string() },
        time_start: 0,
        time_end: 0,
        media: vec![media],
        ssrc: ssrc.to_string(),
    }
}

fn session_name(kind: Kind) -> &'static str {
    match kind {
        Kind::Live => "Play",
        Kind::Playback => "Playback",
        Kind::Download => "Download",
    }
}

/// `Subject: <channel>:<ssrc>,<serverid>:<ssrc>`.
pub fn build_subject_header(channel_id: &str, ssrc: &str, server_id: &str) -> String {
    format!("{channel_id}:{ssrc},{server_id}:{ssrc}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_offer_is_tcp_passive_recvonly() {
        let sdp = build_invite_sdp(&InviteSdpParams {
            channel_id: "ch1",
            ssrc: "0100000001",
            kind: Kind::Live,
            engine_ip: "192.0.2.1".parse().unwrap(),
            engine_port: 30000,
            start: None,
            end: None,
            download_rate: None,
        });
        let text = sdp.encode();
        assert!(text.contains("TCP/RTP/AVP"));
        assert!(text.contains("a=setup:passive"));
        assert!(text.contains("a=connection:new"));
        assert!(text.contains("y=0100000001"));
    }

    #[test]
    fn playback_offer_carries_the_time_window_and_skips_tcp_setup() {
        let sdp = build_invite_sdp(&InviteSdpParams {
            channel_id: "ch1",
            ssrc: "1100000001",
            kind: Kind::Playback,
            engine_ip: "192.0.2.1".parse().unwrap(),
            engine_port: 30002,
            start: Some(1000),
            end: Some(2000),
            download_rate: None,
        });
        let text = sdp.encode();
        assert!(text.contains("RTP/AVP"));
        assert!(!text.contains("a=setup"));
        assert!(text.contains("t=1000 2000"));
    }

    #[test]
    fn subject_header_repeats_ssrc_for_channel_and_server() {
        let subject = build_subject_header("ch1", "0100000001", "34020000002000000001");
        assert_eq!(subject, "ch1:0100000001,34020000002000000001:0100000001");
    }

    #[test]
    fn passive_push_answer_is_sendonly_tcp_passive() {
        let sdp = build_passive_push_sdp("ch1", "0100000001", "192.0.2.1".parse().unwrap(), 30500);
        let text = sdp.encode();
        assert!(text.contains("a=sendonly"));
        assert!(text.contains("a=setup:passive"));
        assert!(text.contains("m=video 30500 TCP/RTP/AVP"));
        assert!(text.contains("y=0100000001"));
    }
}
