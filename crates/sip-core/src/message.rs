//! SIP request/response message model and serializer.
//!
//! "Fully re-serializes every message; never passes raw bytes
//! through verbatim." [`Request::to_bytes`] and [`Response::to_bytes`] are
//! therefore the only way a message ever reaches the wire.

use bytes::Bytes;

use crate::header::{Header, HeaderName};
use crate::method::Method;
use crate::uri::Uri;

const SIP_VERSION: &str = "SIP/2.0";

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: Vec<Header>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub code: u16,
    pub reason: String,
}

impl StatusLine {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn is_provisional(&self) -> bool {
        (100..200).contains(&self.code)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusLine,
    pub headers: Vec<Header>,
    pub body: Bytes,
}

/// Common accessors shared by [`Request`] and [`Response`].
pub trait HeaderAccess {
    fn headers(&self) -> &[Header];
    fn headers_mut(&mut self) -> &mut Vec<Header>;

    fn header(&self, name: &HeaderName) -> Option<&Header> {
        self.headers().iter().find(|h| &h.name == name)
    }

    fn header_value(&self, name: &HeaderName) -> Option<&str> {
        self.header(name).map(|h| h.value.as_str())
    }

    fn add_header(&mut self, name: HeaderName, value: impl Into<String>) {
        self.headers_mut().push(Header::new(name, value));
    }

    fn call_id(&self) -> Option<&str> {
        self.header_value(&HeaderName::CallId)
    }

    fn cseq(&self) -> Option<(u32, Method)> {
        let value = self.header_value(&HeaderName::CSeq)?;
        let (num, method) = value.trim().split_once(' ')?;
        Some((num.trim().parse().ok()?, method.trim().parse().ok()?))
    }

    fn via_branch(&self) -> Option<String> {
        let via = self.header_value(&HeaderName::Via)?;
        via.split(';').find_map(|p| {
            let p = p.trim();
            p.strip_prefix("branch=").map(|b| b.to_string())
        })
    }

    fn tag(&self, name: &HeaderName) -> Option<String> {
        let v = self.header_value(name)?;
        v.split(';').find_map(|p| {
            let p = p.trim();
            p.strip_prefix("tag=").map(|t| t.to_string())
        })
    }

    fn from_tag(&self) -> Option<String> {
        self.tag(&HeaderName::From)
    }

    fn to_tag(&self) -> Option<String> {
        self.tag(&HeaderName::To)
    }
}

impl HeaderAccess for Request {
    fn headers(&self) -> &[Header] {
        &self.headers
    }
    fn headers_mut(&mut self) -> &mut Vec<Header> {
        &mut self.headers
    }
}

impl HeaderAccess for Response {
    fn headers(&self) -> &[Header] {
        &self.headers
    }
    fn headers_mut(&mut self) -> &mut Vec<Header> {
        &mut self.headers
    }
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let existing = self
            .headers
            .iter()
            .position(|h| h.name == HeaderName::ContentLength);
        let len = body.len().to_string();
        match existing {
            Some(i) => self.headers[i].value = len,
            None => self.add_header(HeaderName::ContentLength, len),
        }
        self.body = body;
        self
    }

    /// Serialize to the exact bytes sent on the wire.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = format!("{} {} {}\r\n", self.method, self.uri, SIP_VERSION);
        for h in &self.headers {
            out.push_str(&format!("{h}\r\n"));
        }
        out.push_str("\r\n");
        let mut bytes = out.into_bytes();
        bytes.extend_from_slice(&self.body);
        Bytes::from(bytes)
    }
}

impl Response {
    pub fn new(status: StatusLine) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let existing = self
            .headers
            .iter()
            .position(|h| h.name == HeaderName::ContentLength);
        let len = body.len().to_string();
        match existing {
            Some(i) => self.headers[i].value = len,
            None => self.add_header(HeaderName::ContentLength, len),
        }
        self.body = body;
        self
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut out = format!(
            "{} {} {}\r\n",
            SIP_VERSION, self.status.code, self.status.reason
        );
        for h in &self.headers {
            out.push_str(&format!("{h}\r\n"));
        }
        out.push_str("\r\n");
        let mut bytes = out.into_bytes();
        bytes.extend_from_slice(&self.body);
        Bytes::from(bytes)
    }
}

/// A parsed SIP message: either a request or a response.
#[derive(Debug, Clone)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Message::Request(r) => r.call_id(),
            Message::Response(r) => r.call_id(),
        }
    }

    pub fn cseq(&self) -> Option<(u32, Method)> {
        match self {
            Message::Request(r) => r.cseq(),
            Message::Response(r) => r.cseq(),
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        match self {
            Message::Request(r) => r.to_bytes(),
            Message::Response(r) => r.to_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_content_length() {
        let req = Request::new(Method::Register, "sip:dev@region".parse().unwrap())
            .with_header(HeaderName::CallId, "abc123")
            .with_header(HeaderName::CSeq, "1 REGISTER")
            .with_body(Bytes::from_static(b"hello"));

        let bytes = req.to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("REGISTER sip:dev@region SIP/2.0\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("hello"));
    }

    #[test]
    fn cseq_parses_number_and_method() {
        let req = Request::new(Method::Invite, "sip:dev@region".parse().unwrap())
            .with_header(HeaderName::CSeq, "42 INVITE");
        assert_eq!(req.cseq(), Some((42, Method::Invite)));
    }

    #[test]
    fn tag_extraction_ignores_other_params() {
        let req = Request::new(Method::Invite, "sip:dev@region".parse().unwrap())
            .with_header(HeaderName::From, "<sip:a@b>;tag=xyz987");
        assert_eq!(req.from_tag(), Some("xyz987".to_string()));
    }
}
