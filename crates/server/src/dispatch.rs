//! Routes every inbound request the transaction layer has no existing
//! transaction for to the owning component: REGISTER to the registrar,
//! MANSCDP MESSAGE bodies sniffed by `CmdType` and routed to keepalive or
//! catalog handling, INVITE to cascade passive push, BYE to local teardown.

use std::net::SocketAddr;
use std::sync::Arc;

use gb28181_catalog_core::catalog::{build_catalog_fragments, catalog_rows};
use gb28181_catalog_core::ChannelStore;
use gb28181_registrar_core::inbound::{handle_keepalive, handle_register};
use gb28181_registrar_core::DeviceStore;
use gb28181_session_core::PlaySessionManager;
use gb28181_sip_core::digest::new_nonce;
use gb28181_sip_core::manscdp::{decode_body, CatalogQuery, CmdTypeProbe};
use gb28181_sip_core::message::HeaderAccess;
use gb28181_sip_core::{tokens, HeaderName, Method, Request, Response, StatusLine, Uri};
use gb28181_transaction_core::{IncomingRequest, TransactionManager};
use tokio::sync::mpsc;
use tracing::warn;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    mut incoming_rx: mpsc::Receiver<IncomingRequest>,
    tx_manager: Arc<TransactionManager>,
    devices: Arc<DeviceStore>,
    channels: Arc<ChannelStore>,
    sessions: Arc<PlaySessionManager>,
    region_id: String,
) {
    while let Some(incoming) = incoming_rx.recv().await {
        let IncomingRequest { request, source, server_tx } = incoming;
        let response = match request.method {
            Method::Register => {
                let resp = handle_register(&devices, &request, source, &region_id, new_nonce).await;
                with_envelope(resp, &request)
            }
            Method::Message => {
                let resp = handle_message(&tx_manager, &devices, &channels, &request, source, &region_id).await;
                with_envelope(resp, &request)
            }
            Method::Invite => sessions.handle_upstream_invite(&request).await,
            Method::Bye => {
                let call_id = request.header_value(&HeaderName::CallId).unwrap_or_default().to_string();
                if let Err(err) = sessions.on_remote_bye(&call_id).await {
                    warn!(%call_id, error = %err, "inbound BYE: teardown failed");
                }
                with_envelope(Response::new(StatusLine::new(200, "OK")), &request)
            }
            other => {
                warn!(method = %other, "no handler for inbound method");
                with_envelope(Response::new(StatusLine::new(405, "Method Not Allowed")), &request)
            }
        };
        server_tx.respond(tx_manager.transport(), source, response).await;
    }
}

/// Echo the envelope headers a UAC correlates its response by: Via, From,
/// To (tagged, since every reply here finalizes a transaction), Call-ID,
/// CSeq.
fn with_envelope(mut resp: Response, req: &Request) -> Response {
    for name in [HeaderName::Via, HeaderName::From, HeaderName::CallId, HeaderName::CSeq] {
        if let Some(value) = req.header_value(&name) {
            resp = resp.with_header(name, value.to_string());
        }
    }
    let to = req.header_value(&HeaderName::To).unwrap_or("").to_string();
    if to.contains(";tag=") {
        resp.with_header(HeaderName::To, to)
    } else {
        resp.with_header(HeaderName::To, format!("{to};tag={}", tokens::new_tag()))
    }
}

async fn handle_message(
    tx_manager: &TransactionManager,
    devices: &DeviceStore,
    channels: &ChannelStore,
    req: &Request,
    source: SocketAddr,
    region_id: &str,
) -> Response {
    let device_id = req.uri.user.clone().unwrap_or_default();
    let body = decode_body(&req.body);
    let Ok(probe) = CmdTypeProbe::from_xml(&body) else {
        return Response::new(StatusLine::new(400, "Bad Request"));
    };

    match probe.cmd_type.as_str() {
        "Keepalive" => handle_keepalive(devices, &device_id).await,
        "Catalog" => handle_catalog_query(tx_manager, channels, devices, &body, source, region_id).await,
        other => {
            warn!(cmd_type = %other, "no handler for this MANSCDP command, acknowledging anyway");
            Response::new(StatusLine::new(200, "OK"))
        }
    }
}

/// A Catalog Query is acknowledged with a bare 200; the catalog itself is
/// pushed back as one or more separate MESSAGE requests, same shape as the
/// periodic upstream catalog replay.
async fn handle_catalog_query(
    tx_manager: &TransactionManager,
    channels: &ChannelStore,
    devices: &DeviceStore,
    body: &str,
    source: SocketAddr,
    region_id: &str,
) -> Response {
    let Ok(query) = CatalogQuery::from_xml(body) else {
        return Response::new(StatusLine::new(400, "Bad Request"));
    };

    let mut rows = Vec::new();
    for device in devices.online_devices() {
        let device_channels = channels.by_device(&device.device_id);
        rows.extend(catalog_rows(&device.device_id, &device_channels));
    }
    let fragments = build_catalog_fragments(query.sn, &query.device_id, &rows);
    for fragment in fragments {
        if let Ok(xml) = fragment.to_xml() {
            send_xml_message(tx_manager, &query.device_id, region_id, source, xml).await;
        }
    }
    Response::new(StatusLine::new(200, "OK"))
}

async fn send_xml_message(tx_manager: &TransactionManager, our_id: &str, region_id: &str, destination: SocketAddr, body: String) {
    let req = Request::new(Method::Message, Uri::new(our_id, region_id))
        .with_header(
            HeaderName::Via,
            format!("SIP/2.0/UDP {};branch={}", tx_manager.transport().local_addr(), tokens::new_branch()),
        )
        .with_header(HeaderName::From, format!("<sip:{our_id}@{region_id}>;tag={}", tokens::new_tag()))
        .with_header(HeaderName::To, format!("<sip:{our_id}@{region_id}>"))
        .with_header(HeaderName::CallId, tokens::new_call_id())
        .with_header(HeaderName::CSeq, "1 MESSAGE")
        .with_header(HeaderName::ContentType, "Application/MANSCDP+xml")
        .with_body(body);
    let mut client_tx = tx_manager.send(req, destination);
    let _ = client_tx.final_response().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_tags_an_untagged_to_header_but_leaves_a_tagged_one_alone() {
        let req = Request::new(Method::Register, Uri::new("34020000001320000001", "3402000000"))
            .with_header(HeaderName::Via, "SIP/2.0/UDP 192.0.2.5:5060;branch=z9hG4bK1")
            .with_header(HeaderName::From, "<sip:34020000001320000001@3402000000>;tag=abc")
            .with_header(HeaderName::To, "<sip:34020000001320000001@3402000000>")
            .with_header(HeaderName::CallId, "call-1")
            .with_header(HeaderName::CSeq, "1 REGISTER");

        let resp = with_envelope(Response::new(StatusLine::new(200, "OK")), &req);
        assert!(resp.header_value(&HeaderName::To).unwrap().contains(";tag="));
        assert_eq!(resp.header_value(&HeaderName::CallId), Some("call-1"));

        let already_tagged = req.clone().with_header(HeaderName::To, "<sip:x@y>;tag=keep-me");
        let resp2 = with_envelope(Response::new(StatusLine::new(200, "OK")), &already_tagged);
        assert_eq!(resp2.header_value(&HeaderName::To), Some("<sip:x@y>;tag=keep-me"));
    }
}
