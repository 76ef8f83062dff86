use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::state::WebhookState;

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/index/hook/on_server_started", post(on_server_started))
        .route("/index/hook/on_publish", post(on_publish))
        .route("/index/hook/on_play", post(on_play))
        .route("/index/hook/on_http_access", post(on_http_access))
        .route("/index/hook/on_stream_changed", post(on_stream_changed))
        .route("/index/hook/on_stream_not_found", post(on_stream_not_found))
        .route("/index/hook/on_stream_none_reader", post(on_stream_none_reader))
        .route("/index/hook/on_record_mp4", post(on_record_mp4))
        .with_state(state)
}

fn ok() -> Json<Value> {
    Json(json!({"code": 0}))
}

async fn on_server_started(State(_state): State<WebhookState>, body: Json<Value>) -> Json<Value> {
    warn!(?body, "media engine reported ready");
    ok()
}

#[derive(Serialize)]
struct PublishResponse {
    code: i32,
    #[serde(rename = "enableHls")]
    enable_hls: bool,
    #[serde(rename = "enableMP4")]
    enable_mp4: bool,
    #[serde(rename = "enableRtmp")]
    enable_rtmp: bool,
}

async fn on_publish(State(state): State<WebhookState>, _body: Json<Value>) -> Json<PublishResponse> {
    Json(PublishResponse {
        code: 0,
        enable_hls: state.config.stream.hls,
        enable_mp4: false,
        enable_rtmp: state.config.stream.rtmp,
    })
}

async fn on_play(State(_state): State<WebhookState>, _body: Json<Value>) -> Json<Value> {
    ok()
}

async fn on_http_access(State(_state): State<WebhookState>, _body: Json<Value>) -> Json<Value> {
    ok()
}

#[derive(Debug, Deserialize)]
struct StreamChangedRequest {
    stream: String,
    regist: bool,
}

async fn on_stream_changed(State(state): State<WebhookState>, Json(req): Json<StreamChangedRequest>) -> Json<Value> {
    let result = if req.regist {
        state.sessions.on_stream_changed(&req.stream, true).await
    } else {
        state.sessions.stop_play(&req.stream).await
    };
    if let Err(err) = result {
        error!(stream = %req.stream, error = %err, "on_stream_changed handling failed");
    }
    ok()
}

#[derive(Debug, Deserialize)]
struct StreamNotFoundRequest {
    stream: String,
}

/// Devices in this deployment only ever push (TCP-passive); there is no
/// pull-type proxy source to re-issue a pull against, so the only branch
/// that applies is closing an already-open Stream that the engine lost.
async fn on_stream_not_found(State(state): State<WebhookState>, Json(req): Json<StreamNotFoundRequest>) -> Json<Value> {
    if let Err(err) = state.sessions.stop_play(&req.stream).await {
        error!(stream = %req.stream, error = %err, "on_stream_not_found handling failed");
    }
    ok()
}

#[derive(Debug, Deserialize)]
struct NoneReaderRequest {
    stream: String,
}

async fn on_stream_none_reader(State(state): State<WebhookState>, Json(req): Json<NoneReaderRequest>) -> Json<Value> {
    if let Err(err) = state.sessions.stop_play(&req.stream).await {
        error!(stream = %req.stream, error = %err, "on_stream_none_reader handling failed");
    }
    Json(json!({"code": 0, "close": true}))
}

#[derive(Debug, Deserialize)]
struct RecordMp4Request {
    stream: String,
    url: String,
}

async fn on_record_mp4(State(state): State<WebhookState>, Json(req): Json<RecordMp4Request>) -> Json<Value> {
    state.recordings.complete(&req.stream, req.url);
    ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use gb28181_common::AppConfig;
    use gb28181_media_client::MediaEngineClient;
    use gb28181_session_core::PlaySessionManager;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct NullLocator;
    impl gb28181_session_core::DeviceLocator for NullLocator {
        fn source_addr(&self, _device_id: &str) -> Option<SocketAddr> {
            None
        }
    }

    async fn test_state() -> WebhookState {
        let pool = gb28181_common::db::connect(&gb28181_common::config::DatabaseConfig {
            driver: "sqlite".to_string(),
            url: "sqlite::memory:".to_string(),
        })
        .await
        .unwrap();
        let channels = Arc::new(gb28181_catalog_core::ChannelStore::new(pool.clone()));
        let (transport, events_rx) = gb28181_sip_transport::UdpTransport::bind("127.0.0.1:0".parse().unwrap(), None)
            .await
            .unwrap();
        let (tx_manager, _incoming_rx) = gb28181_transaction_core::TransactionManager::new(transport, events_rx);
        let media = MediaEngineClient::new("http://127.0.0.1:1".to_string(), "secret".to_string());
        let store = gb28181_session_core::StreamStore::new(pool);
        let sessions = PlaySessionManager::new(
            "3402000000",
            "34020000002000000001",
            "127.0.0.1:5060",
            "127.0.0.1".parse().unwrap(),
            channels,
            Arc::new(NullLocator),
            tx_manager,
            media,
            store,
            gb28181_session_core::PassivePortAllocator::new(30000, 30500),
        );
        let config = Arc::new(
            serde_json::from_value::<AppConfig>(serde_json::json!({
                "gb28181": {"region": "3402000000", "cid": "c", "did": "d", "lid": "l"}
            }))
            .unwrap(),
        );
        WebhookState::new(sessions, config)
    }

    #[tokio::test]
    async fn unknown_stream_none_reader_still_replies_with_close() {
        let state = test_state().await;
        let app = router(state);
        let body = serde_json::json!({"stream": "nonexistent"}).to_string();
        let response = app
            .oneshot(
                Request::post("/index/hook/on_stream_none_reader")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn record_mp4_delivers_the_url_to_a_watcher() {
        let state = test_state().await;
        let rx = state.recordings.watch("0100000001");
        let app = router(state);
        let body = serde_json::json!({"stream": "0100000001", "url": "http://media/a.mp4"}).to_string();
        app.oneshot(
            Request::post("/index/hook/on_record_mp4")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(rx.await.unwrap(), "http://media/a.mp4");
    }
}
