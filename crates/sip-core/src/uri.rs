use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A SIP URI: `sip:user@host:port;param=value`.
///
/// GB/T-28181 uses the user part as the device/channel ID and the host part
/// as the region/platform ID, e.g. `sip:34020000001320000001@3402000000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    pub scheme: String,
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub params: BTreeMap<String, Option<String>>,
}

impl Uri {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: "sip".to_string(),
            user: Some(user.into()),
            host: host.into(),
            port: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for (k, v) in &self.params {
            match v {
                Some(v) => write!(f, ";{}={}", k, v)?,
                None => write!(f, ";{}", k)?,
            }
        }
        Ok(())
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidUri(s.to_string()))?;
        if scheme.is_empty() {
            return Err(Error::InvalidUri(s.to_string()));
        }

        let mut parts = rest.splitn(2, ';');
        let userhost = parts.next().unwrap_or("");
        let param_str = parts.next().unwrap_or("");

        let (user, hostport) = match userhost.split_once('@') {
            Some((u, h)) => (Some(u.to_string()), h),
            None => (None, userhost),
        };

        let (host, port) = match hostport.split_once(':') {
            Some((h, p)) => (
                h.to_string(),
                Some(
                    p.parse::<u16>()
                        .map_err(|_| Error::InvalidUri(s.to_string()))?,
                ),
            ),
            None => (hostport.to_string(), None),
        };

        let mut params = BTreeMap::new();
        if !param_str.is_empty() {
            for kv in param_str.split(';') {
                if kv.is_empty() {
                    continue;
                }
                match kv.split_once('=') {
                    Some((k, v)) => {
                        params.insert(k.to_string(), Some(v.to_string()));
                    }
                    None => {
                        params.insert(kv.to_string(), None);
                    }
                }
            }
        }

        Ok(Uri {
            scheme: scheme.to_string(),
            user,
            host,
            port,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_uri() {
        let uri: Uri = "sip:34020000001320000001@3402000000".parse().unwrap();
        assert_eq!(uri.scheme, "sip");
        assert_eq!(uri.user.as_deref(), Some("34020000001320000001"));
        assert_eq!(uri.host, "3402000000");
        assert_eq!(uri.port, None);
    }

    #[test]
    fn parses_uri_with_port_and_params() {
        let uri: Uri = "sip:bob@192.0.2.1:5060;transport=udp".parse().unwrap();
        assert_eq!(uri.port, Some(5060));
        assert_eq!(uri.params.get("transport"), Some(&Some("udp".to_string())));
    }

    #[test]
    fn display_round_trips() {
        let original = "sip:34020000001320000001@192.0.2.1:5060";
        let uri: Uri = original.parse().unwrap();
        assert_eq!(uri.to_string(), original);
    }
}
