use gb28181_sip_core::message::HeaderAccess;
use gb28181_sip_core::{Method, Request};

/// `{branch, sent-by, method}`: the tuple that correlates a request, its
/// retransmissions, and its response(s) to a single transaction.
///
/// ACK to a non-2xx final response is matched to the original INVITE
/// transaction by constructing its key with `method = Invite` (RFC 3261
/// §17.1.1.3); ACK to a 2xx is a new request with no matching transaction
/// and is handed to the caller directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxKey {
    pub branch: String,
    pub sent_by: String,
    pub method: Method,
}

impl TxKey {
    pub fn new(branch: impl Into<String>, sent_by: impl Into<String>, method: Method) -> Self {
        Self {
            branch: branch.into(),
            sent_by: sent_by.into(),
            method,
        }
    }

    /// Derive the key a client uses to track the transaction it just sent.
    pub fn for_request(req: &Request, sent_by: impl Into<String>) -> Option<Self> {
        let branch = req.via_branch()?;
        let method = if req.method == Method::Ack {
            Method::Invite
        } else {
            req.method
        };
        Some(Self::new(branch, sent_by, method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb28181_sip_core::HeaderName;

    #[test]
    fn ack_key_matches_its_invite() {
        let invite = Request::new(Method::Invite, "sip:a@b".parse().unwrap())
            .with_header(HeaderName::Via, "SIP/2.0/UDP 1.1.1.1:5060;branch=z9hG4bKxyz");
        let ack = Request::new(Method::Ack, "sip:a@b".parse().unwrap())
            .with_header(HeaderName::Via, "SIP/2.0/UDP 1.1.1.1:5060;branch=z9hG4bKxyz");

        let invite_key = TxKey::for_request(&invite, "1.1.1.1:5060").unwrap();
        let ack_key = TxKey::for_request(&ack, "1.1.1.1:5060").unwrap();
        assert_eq!(invite_key, ack_key);
    }
}
