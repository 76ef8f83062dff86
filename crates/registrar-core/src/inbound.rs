use std::net::SocketAddr;

use gb28181_sip_core::digest::{self, DigestCredentials};
use gb28181_sip_core::message::HeaderAccess;
use gb28181_sip_core::{HeaderName, Request, Response, StatusLine};

use crate::store::DeviceStore;

/// Cap applied to whatever `Expires` the device requests.
pub const MAX_EXPIRES_SECS: u32 = 3600;

/// Handle an inbound REGISTER. `realm` is the device's
/// `RegionID`; `region_id`/`password` come from the catalog's device record
/// when one exists (a first-time REGISTER with no record is unauthorized —
/// devices must be provisioned before they can register).
pub async fn handle_register(
    store: &DeviceStore,
    req: &Request,
    source: SocketAddr,
    region_id: &str,
    new_nonce: impl FnOnce() -> String,
) -> Response {
    let device_id = req.uri.user.clone().unwrap_or_default();
    let requested_expires: u32 = req
        .header_value(&HeaderName::Expires)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(MAX_EXPIRES_SECS);

    let Some(auth_header) = req.header_value(&HeaderName::Authorization) else {
        let nonce = new_nonce();
        return Response::new(StatusLine::new(401, "Unauthorized")).with_header(
            HeaderName::WwwAuthenticate,
            format!("Digest realm=\"{region_id}\", nonce=\"{nonce}\", algorithm=MD5"),
        );
    };

    let Some(creds) = DigestCredentials::parse(auth_header) else {
        return Response::new(StatusLine::new(400, "Bad Request"));
    };

    let Some(device) = store.get(&device_id) else {
        return Response::new(StatusLine::new(403, "Forbidden"));
    };

    let valid = digest::verify_response(
        &creds.username,
        &creds.realm,
        &device.password,
        &creds.nonce,
        "REGISTER",
        &creds.uri,
        &creds.response,
    );
    if !valid {
        return Response::new(StatusLine::new(403, "Forbidden"));
    }

    if requested_expires == 0 {
        let _ = store.mark_unregistered(&device_id).await;
        return Response::new(StatusLine::new(200, "OK"))
            .with_header(HeaderName::Expires, "0");
    }

    let expires = requested_expires.min(MAX_EXPIRES_SECS);
    let _ = store
        .upsert_registered(&device_id, region_id, &device.password, &source.to_string())
        .await;

    Response::new(StatusLine::new(200, "OK")).with_header(HeaderName::Expires, expires.to_string())
}

/// Handle an inbound KEEPALIVE (MESSAGE carrying Keepalive XML): bump
/// `Active`, reply `200 OK`.
pub async fn handle_keepalive(store: &DeviceStore, device_id: &str) -> Response {
    match store.touch_keepalive(device_id).await {
        Ok(true) => Response::new(StatusLine::new(200, "OK")),
        _ => Response::new(StatusLine::new(404, "Not Found")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb28181_sip_core::Method;
    use sqlx::any::install_default_drivers;
    use sqlx::AnyPool;

    async fn test_pool() -> AnyPool {
        install_default_drivers();
        let pool = AnyPool::connect("sqlite:file::memory:?cache=shared").await.unwrap();
        sqlx::query(
            "CREATE TABLE devices (device_id TEXT PRIMARY KEY, region_id TEXT, \
             parent_device_id TEXT, source_addr TEXT, password TEXT NOT NULL DEFAULT '', \
             active INTEGER DEFAULT 0, registered INTEGER DEFAULT 0, \
             status TEXT DEFAULT 'UNKNOWN', created_at INTEGER, updated_at INTEGER NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn register_without_credentials_gets_challenged() {
        let store = DeviceStore::new(test_pool().await);
        let req = Request::new(Method::Register, "sip:34020000001320000001@3402000000".parse().unwrap());
        let resp = handle_register(&store, &req, "127.0.0.1:5060".parse().unwrap(), "3402000000", || {
            "nonce123".to_string()
        })
        .await;
        assert_eq!(resp.status.code, 401);
        assert!(resp.header_value(&HeaderName::WwwAuthenticate).unwrap().contains("nonce123"));
    }

    #[tokio::test]
    async fn register_with_valid_digest_upserts_and_replies_200() {
        let store = DeviceStore::new(test_pool().await);
        let device_id = "34020000001320000001";
        store
            .upsert_registered(device_id, "3402000000", "secret", "0.0.0.0:0")
            .await
            .unwrap();
        // Overwrite status to simulate the device being known but not yet online.
        let uri = format!("sip:{device_id}@3402000000");
        let response = digest::compute_response(device_id, "3402000000", "secret", "n1", "REGISTER", &uri);
        let req = Request::new(Method::Register, uri.parse().unwrap())
            .with_header(HeaderName::Expires, "3600")
            .with_header(
                HeaderName::Authorization,
                format!(
                    "Digest username=\"{device_id}\", realm=\"3402000000\", nonce=\"n1\", uri=\"{uri}\", response=\"{response}\""
                ),
            );
        let resp = handle_register(&store, &req, "192.0.2.5:5060".parse().unwrap(), "3402000000", || {
            "unused".to_string()
        })
        .await;
        assert_eq!(resp.status.code, 200);
        assert_eq!(resp.header_value(&HeaderName::Expires), Some("3600"));
        assert!(store.get(device_id).unwrap().registered);
    }
}
