use std::fmt;

/// Headers the codec understands and parses structure out of.
///
/// Anything else is retained as [`HeaderName::Other`] with its original name
/// preserved verbatim ("Unknown headers are retained as
/// opaque.").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderName {
    Via,
    From,
    To,
    Contact,
    CallId,
    CSeq,
    ContentType,
    ContentLength,
    Authorization,
    WwwAuthenticate,
    Expires,
    MaxForwards,
    UserAgent,
    Subject,
    Other(String),
}

impl HeaderName {
    /// The canonical casing used when serializing this header, matching
    /// common SIP wire conventions (e.g. `Call-ID`, not `Call-Id`).
    pub fn canonical(&self) -> String {
        match self {
            HeaderName::Via => "Via".to_string(),
            HeaderName::From => "From".to_string(),
            HeaderName::To => "To".to_string(),
            HeaderName::Contact => "Contact".to_string(),
            HeaderName::CallId => "Call-ID".to_string(),
            HeaderName::CSeq => "CSeq".to_string(),
            HeaderName::ContentType => "Content-Type".to_string(),
            HeaderName::ContentLength => "Content-Length".to_string(),
            HeaderName::Authorization => "Authorization".to_string(),
            HeaderName::WwwAuthenticate => "WWW-Authenticate".to_string(),
            HeaderName::Expires => "Expires".to_string(),
            HeaderName::MaxForwards => "Max-Forwards".to_string(),
            HeaderName::UserAgent => "User-Agent".to_string(),
            HeaderName::Subject => "Subject".to_string(),
            HeaderName::Other(raw) => raw.clone(),
        }
    }

    /// Parse a wire header name into a [`HeaderName`], matching
    /// case-insensitively per RFC 3261 §7.3.1. Unknown names are retained
    /// verbatim (original casing) as `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "via" | "v" => HeaderName::Via,
            "from" | "f" => HeaderName::From,
            "to" | "t" => HeaderName::To,
            "contact" | "m" => HeaderName::Contact,
            "call-id" | "i" => HeaderName::CallId,
            "cseq" => HeaderName::CSeq,
            "content-type" | "c" => HeaderName::ContentType,
            "content-length" | "l" => HeaderName::ContentLength,
            "authorization" => HeaderName::Authorization,
            "www-authenticate" => HeaderName::WwwAuthenticate,
            "expires" => HeaderName::Expires,
            "max-forwards" => HeaderName::MaxForwards,
            "user-agent" => HeaderName::UserAgent,
            "subject" => HeaderName::Subject,
            _ => HeaderName::Other(raw.to_string()),
        }
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// A single header line: name plus raw value text. Structured headers
/// (`Via`, `From`, `CSeq`, …) additionally expose typed accessors in
/// [`crate::message`]; this struct is the uniform storage all of them sit in
/// so order is preserved exactly as received/built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: HeaderName,
    pub value: String,
}

impl Header {
    pub fn new(name: HeaderName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_forms_resolve_to_same_header() {
        assert_eq!(HeaderName::parse("v"), HeaderName::Via);
        assert_eq!(HeaderName::parse("i"), HeaderName::CallId);
        assert_eq!(HeaderName::parse("Call-ID"), HeaderName::CallId);
    }

    #[test]
    fn unknown_header_preserves_casing() {
        let h = HeaderName::parse("X-Custom-Header");
        assert_eq!(h.canonical(), "X-Custom-Header");
    }
}
