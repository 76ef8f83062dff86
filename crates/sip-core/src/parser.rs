//! SIP message parser. One UDP datagram carries exactly one SIP message,
//! so [`parse_message`] takes a complete buffer and returns a complete
//! [`Message`] or an [`Error`].

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::header::{Header, HeaderName};
use crate::message::{Message, Request, Response, StatusLine};
use crate::method::Method;
use crate::uri::Uri;

pub fn parse_message(input: &[u8]) -> Result<Message> {
    let text = std::str::from_utf8(input).map_err(|e| Error::InvalidHeader(e.to_string()))?;
    let header_end = text
        .find("\r\n\r\n")
        .ok_or(Error::Truncated)?;
    let head = &text[..header_end];
    let body_start = header_end + 4;

    let mut lines = head.split("\r\n");
    let start_line = lines.next().ok_or(Error::Truncated)?;

    let headers = parse_headers(lines)?;
    let content_length = headers
        .iter()
        .find(|h| h.name == HeaderName::ContentLength)
        .and_then(|h| h.value.trim().parse::<usize>().ok());

    let body_bytes = &input[body_start.min(input.len())..];
    let body = match content_length {
        Some(len) => {
            if body_bytes.len() < len {
                return Err(Error::ContentLengthMismatch {
                    expected: len,
                    actual: body_bytes.len(),
                });
            }
            Bytes::copy_from_slice(&body_bytes[..len])
        }
        None => Bytes::copy_from_slice(body_bytes),
    };

    if start_line.starts_with("SIP/2.0") {
        parse_status_line(start_line).map(|status| {
            Message::Response(Response {
                status,
                headers,
                body,
            })
        })
    } else {
        parse_request_line(start_line).map(|(method, uri)| {
            Message::Request(Request {
                method,
                uri,
                headers,
                body,
            })
        })
    }
}

fn parse_request_line(line: &str) -> Result<(Method, Uri)> {
    let mut parts = line.splitn(3, ' ');
    let method = parts
        .next()
        .ok_or_else(|| Error::InvalidRequestLine(line.to_string()))?;
    let uri = parts
        .next()
        .ok_or_else(|| Error::InvalidRequestLine(line.to_string()))?;
    let version = parts
        .next()
        .ok_or_else(|| Error::InvalidRequestLine(line.to_string()))?;
    if version != "SIP/2.0" {
        return Err(Error::InvalidRequestLine(line.to_string()));
    }
    let method: Method = method.parse()?;
    let uri: Uri = uri
        .parse()
        .map_err(|_| Error::InvalidRequestLine(line.to_string()))?;
    Ok((method, uri))
}

fn parse_status_line(line: &str) -> Result<StatusLine> {
    let mut parts = line.splitn(3, ' ');
    let version = parts
        .next()
        .ok_or_else(|| Error::InvalidStatusLine(line.to_string()))?;
    if version != "SIP/2.0" {
        return Err(Error::InvalidStatusLine(line.to_string()));
    }
    let code = parts
        .next()
        .ok_or_else(|| Error::InvalidStatusLine(line.to_string()))?
        .parse::<u16>()
        .map_err(|_| Error::InvalidStatusLine(line.to_string()))?;
    let reason = parts.next().unwrap_or("").to_string();
    Ok(StatusLine { code, reason })
}

fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Vec<Header>> {
    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeader(line.to_string()))?;
        headers.push(Header::new(HeaderName::parse(name.trim()), value.trim()));
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::HeaderAccess;

    #[test]
    fn parses_register_request() {
        let raw = b"REGISTER sip:3402000000@3402000000 SIP/2.0\r\n\
Via: SIP/2.0/UDP 192.0.2.1:5060;branch=z9hG4bKabc\r\n\
From: <sip:34020000001320000001@3402000000>;tag=111\r\n\
To: <sip:34020000001320000001@3402000000>\r\n\
Call-ID: xyz\r\n\
CSeq: 1 REGISTER\r\n\
Content-Length: 0\r\n\r\n";
        let msg = parse_message(raw).unwrap();
        match msg {
            Message::Request(req) => {
                assert_eq!(req.method, Method::Register);
                assert_eq!(req.call_id(), Some("xyz"));
                assert_eq!(req.cseq(), Some((1, Method::Register)));
                assert_eq!(req.from_tag(), Some("111".to_string()));
            }
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn parses_response_with_body() {
        let raw = b"SIP/2.0 200 OK\r\nCall-ID: xyz\r\nContent-Length: 5\r\n\r\nhello";
        let msg = parse_message(raw).unwrap();
        match msg {
            Message::Response(resp) => {
                assert_eq!(resp.status.code, 200);
                assert_eq!(resp.status.reason, "OK");
                assert_eq!(&resp.body[..], b"hello");
            }
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn truncated_message_is_an_error() {
        let raw = b"REGISTER sip:a@b SIP/2.0\r\nVia: x";
        assert!(matches!(parse_message(raw), Err(Error::Truncated)));
    }

    #[test]
    fn content_length_mismatch_is_an_error() {
        let raw = b"SIP/2.0 200 OK\r\nContent-Length: 10\r\n\r\nhi";
        assert!(matches!(
            parse_message(raw),
            Err(Error::ContentLengthMismatch { .. })
        ));
    }

    #[test]
    fn compact_header_forms_parse() {
        let raw = b"SIP/2.0 200 OK\r\ni: callid1\r\nl: 0\r\n\r\n";
        let msg = parse_message(raw).unwrap();
        assert_eq!(msg.call_id(), Some("callid1"));
    }
}
