//! SDP subset used by the GB/T-28181 profile: `v`, `o`, `s`,
//! `c`, `t`, `m`, `a`, and the extension `y=` line carrying the SSRC.
//!
//! This is a small hand-written line codec rather than a pull of a general
//! SDP crate — the subset in scope is a dozen fields, not full RFC 4566.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupRole {
    Active,
    Passive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaAttribute {
    RecvOnly,
    SendOnly,
    Setup(SetupRole),
    ConnectionNew,
    RtpMap { payload_type: u8, encoding: String },
    Stream(String),
    DownloadSpeed(String),
    FileSize(String),
    Other(String),
}

impl MediaAttribute {
    fn to_line(&self) -> String {
        match self {
            MediaAttribute::RecvOnly => "a=recvonly".to_string(),
            MediaAttribute::SendOnly => "a=sendonly".to_string(),
            MediaAttribute::Setup(SetupRole::Active) => "a=setup:active".to_string(),
            MediaAttribute::Setup(SetupRole::Passive) => "a=setup:passive".to_string(),
            MediaAttribute::ConnectionNew => "a=connection:new".to_string(),
            MediaAttribute::RtpMap {
                payload_type,
                encoding,
            } => format!("a=rtpmap:{payload_type} {encoding}"),
            MediaAttribute::Stream(s) => format!("a=stream:{s}"),
            MediaAttribute::DownloadSpeed(s) => format!("a=downloadspeed:{s}"),
            MediaAttribute::FileSize(s) => format!("a=filesize:{s}"),
            MediaAttribute::Other(s) => format!("a={s}"),
        }
    }

    fn parse(value: &str) -> Self {
        if value == "recvonly" {
            MediaAttribute::RecvOnly
        } else if value == "sendonly" {
            MediaAttribute::SendOnly
        } else if value == "connection:new" {
            MediaAttribute::ConnectionNew
        } else if let Some(role) = value.strip_prefix("setup:") {
            match role {
                "active" => MediaAttribute::Setup(SetupRole::Active),
                _ => MediaAttribute::Setup(SetupRole::Passive),
            }
        } else if let Some(rest) = value.strip_prefix("rtpmap:") {
            let mut parts = rest.splitn(2, ' ');
            if let (Some(pt), Some(enc)) = (parts.next(), parts.next()) {
                if let Ok(pt) = pt.parse() {
                    return MediaAttribute::RtpMap {
                        payload_type: pt,
                        encoding: enc.to_string(),
                    };
                }
            }
            MediaAttribute::Other(value.to_string())
        } else if let Some(rest) = value.strip_prefix("stream:") {
            MediaAttribute::Stream(rest.to_string())
        } else if let Some(rest) = value.strip_prefix("downloadspeed:") {
            MediaAttribute::DownloadSpeed(rest.to_string())
        } else if let Some(rest) = value.strip_prefix("filesize:") {
            MediaAttribute::FileSize(rest.to_string())
        } else {
            MediaAttribute::Other(value.to_string())
        }
    }
}

/// `m=video <port> <proto> <fmt...>` plus its `a=` attribute lines.
#[derive(Debug, Clone)]
pub struct MediaDescription {
    pub media: String,
    pub port: u16,
    pub proto: String,
    pub formats: Vec<u8>,
    pub attributes: Vec<MediaAttribute>,
}

impl MediaDescription {
    pub fn new_video(port: u16, proto: &str, formats: &[u8]) -> Self {
        Self {
            media: "video".to_string(),
            port,
            proto: proto.to_string(),
            formats: formats.to_vec(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attr: MediaAttribute) -> Self {
        self.attributes.push(attr);
        self
    }
}

/// `c=` connection line: `IN IP4 <addr>`.
#[derive(Debug, Clone)]
pub struct Connection {
    pub addr: String,
}

#[derive(Debug, Clone)]
pub struct SessionDescription {
    pub origin_user: String,
    pub session_id: String,
    pub session_version: String,
    pub origin_addr: String,
    pub session_name: String,
    pub connection: Connection,
    pub time_start: u64,
    pub time_end: u64,
    pub media: Vec<MediaDescription>,
    /// GB/T-28181 extension `y=` line: the SSRC, as a 10-digit decimal string.
    pub ssrc: String,
}

impl SessionDescription {
    pub fn encode(&self) -> String {
        let mut out = String::new();
        out.push_str("v=0\r\n");
        out.push_str(&format!(
            "o={} {} {} IN IP4 {}\r\n",
            self.origin_user, self.session_id, self.session_version, self.origin_addr
        ));
        out.push_str(&format!("s={}\r\n", self.session_name));
        out.push_str(&format!("c=IN IP4 {}\r\n", self.connection.addr));
        out.push_str(&format!("t={} {}\r\n", self.time_start, self.time_end));
        for m in &self.media {
            let formats = m
                .formats
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!("m={} {} {} {}\r\n", m.media, m.port, m.proto, formats));
            for a in &m.attributes {
                out.push_str(&a.to_line());
                out.push_str("\r\n");
            }
        }
        out.push_str(&format!("y={}\r\n", self.ssrc));
        out
    }

    pub fn decode(text: &str) -> Result<Self> {
        let mut origin_user = String::new();
        let mut session_id = String::new();
        let mut session_version = String::new();
        let mut origin_addr = String::new();
        let mut session_name = String::new();
        let mut connection = Connection {
            addr: String::new(),
        };
        let mut time_start = 0u64;
        let mut time_end = 0u64;
        let mut media: Vec<MediaDescription> = Vec::new();
        let mut ssrc = String::new();

        for raw_line in text.lines() {
            let line = raw_line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (tag, value) = line
                .split_once('=')
                .ok_or_else(|| Error::InvalidSdp(line.to_string()))?;
            match tag {
                "o" => {
                    let parts: Vec<&str> = value.split_whitespace().collect();
                    if parts.len() >= 6 {
                        origin_user = parts[0].to_string();
                        session_id = parts[1].to_string();
                        session_version = parts[2].to_string();
                        origin_addr = parts[5].to_string();
                    }
                }
                "s" => session_name = value.to_string(),
                "c" => {
                    let parts: Vec<&str> = value.split_whitespace().collect();
                    if let Some(addr) = parts.last() {
                        connection = Connection {
                            addr: addr.to_string(),
                        };
                    }
                }
                "t" => {
                    let parts: Vec<&str> = value.split_whitespace().collect();
                    if parts.len() == 2 {
                        time_start = parts[0].parse().unwrap_or(0);
                        time_end = parts[1].parse().unwrap_or(0);
                    }
                }
                "m" => {
                    let parts: Vec<&str> = value.split_whitespace().collect();
                    if parts.len() < 3 {
                        return Err(Error::InvalidSdp(line.to_string()));
                    }
                    let port = parts[1]
                        .parse()
                        .map_err(|_| Error::InvalidSdp(line.to_string()))?;
                    let formats = parts[3..]
                        .iter()
                        .filter_map(|f| f.parse().ok())
                        .collect();
                    media.push(MediaDescription {
                        media: parts[0].to_string(),
                        port,
                        proto: parts[2].to_string(),
                        formats,
                        attributes: Vec::new(),
                    });
                }
                "a" => {
                    if let Some(m) = media.last_mut() {
                        m.attributes.push(MediaAttribute::parse(value));
                    }
                }
                "y" => ssrc = value.trim().to_string(),
                _ => {}
            }
        }

        if media.is_empty() {
            return Err(Error::InvalidSdp("no m= line".to_string()));
        }
        if ssrc.is_empty() {
            return Err(Error::InvalidSdp("missing mandatory y= line".to_string()));
        }

        Ok(SessionDescription {
            origin_user,
            session_id,
            session_version,
            origin_addr,
            session_name,
            connection,
            time_start,
            time_end,
            media,
            ssrc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionDescription {
        SessionDescription {
            origin_user: "34020000001320000001".to_string(),
            session_id: "0".to_string(),
            session_version: "0".to_string(),
            origin_addr: "192.0.2.10".to_string(),
            session_name: "Play".to_string(),
            connection: Connection {
                addr: "192.0.2.10".to_string(),
            },
            time_start: 0,
            time_end: 0,
            media: vec![MediaDescription::new_video(10000, "TCP/RTP/AVP", &[96, 98, 97])
                .with_attribute(MediaAttribute::RecvOnly)
                .with_attribute(MediaAttribute::Setup(SetupRole::Passive))
                .with_attribute(MediaAttribute::ConnectionNew)],
            ssrc: "0100000001".to_string(),
        }
    }

    #[test]
    fn encode_then_decode_preserves_fields() {
        let sdp = sample();
        let text = sdp.encode();
        let decoded = SessionDescription::decode(&text).unwrap();
        assert_eq!(decoded.ssrc, "0100000001");
        assert_eq!(decoded.media[0].port, 10000);
        assert_eq!(decoded.media[0].proto, "TCP/RTP/AVP");
        assert_eq!(decoded.media[0].formats, vec![96, 98, 97]);
        assert!(decoded.media[0].attributes.contains(&MediaAttribute::RecvOnly));
        assert!(decoded
            .media[0]
            .attributes
            .contains(&MediaAttribute::Setup(SetupRole::Passive)));
    }

    #[test]
    fn missing_y_line_is_rejected() {
        let text = "v=0\r\no=a 0 0 IN IP4 1.1.1.1\r\ns=s\r\nc=IN IP4 1.1.1.1\r\nt=0 0\r\nm=video 1 RTP/AVP 96\r\n";
        assert!(SessionDescription::decode(text).is_err());
    }
}
