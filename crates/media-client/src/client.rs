use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const LONG_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON POST client over the media engine's `/index/api/<method>` control
/// plane. Every call carries `secret` in the body and expects `{"code": 0,
/// ...}` back; any other code surfaces as [`Error::Api`]. No retries here —
/// callers decide whether a failure is worth retrying.
#[derive(Clone)]
pub struct MediaEngineClient {
    http: reqwest::Client,
    base_url: String,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(flatten)]
    rest: Value,
}

impl MediaEngineClient {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            secret: secret.into(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/index/api/{method}", self.base_url.trim_end_matches('/'))
    }

    async fn call(&self, method: &str, mut params: Value, timeout: Duration) -> Result<Value> {
        if let Value::Object(ref mut map) = params {
            map.insert("secret".to_string(), Value::String(self.secret.clone()));
        }
        debug!(method, "calling media engine");
        let resp = self
            .http
            .post(self.endpoint(method))
            .json(&params)
            .timeout(timeout)
            .send()
            .await?;
        let body: Envelope = resp.json().await.map_err(Error::Http)?;
        if body.code != 0 {
            warn!(method, code = body.code, "media engine returned an error code");
            return Err(Error::Api {
                code: body.code,
                msg: body.msg.unwrap_or_default(),
            });
        }
        Ok(body.rest)
    }

    async fn call_default(&self, method: &str, params: Value) -> Result<Value> {
        self.call(method, params, DEFAULT_TIMEOUT).await
    }

    // -- RTP server lifecycle (Play Session Manager) --

    /// Opens an RTP receive port keyed by `stream_id` (the SSRC). `tcp_mode`
    /// is `1` for TCP-passive (live/download), `0` for plain UDP.
    pub async fn open_rtp_server(&self, stream_id: &str, tcp_mode: u8) -> Result<u16> {
        let resp = self
            .call_default("openRtpServer", json!({"stream_id": stream_id, "tcp_mode": tcp_mode}))
            .await?;
        resp.get("port")
            .and_then(Value::as_u64)
            .map(|p| p as u16)
            .ok_or_else(|| Error::Api {
                code: -1,
                msg: "openRtpServer response missing port".to_string(),
            })
    }

    pub async fn close_rtp_server(&self, stream_id: &str) -> Result<()> {
        self.call_default("closeRtpServer", json!({"stream_id": stream_id})).await?;
        Ok(())
    }

    pub async fn list_rtp_server(&self) -> Result<Value> {
        self.call_default("listRtpServer", json!({})).await
    }

    pub async fn connect_rtp_server(&self, stream_id: &str, dst_url: &str) -> Result<()> {
        self.call_default("connectRtpServer", json!({"stream_id": stream_id, "dst_url": dst_url}))
            .await?;
        Ok(())
    }

    pub async fn start_send_rtp(&self, stream_id: &str, dst_ip: &str, dst_port: u16, ssrc: &str) -> Result<()> {
        self.call_default(
            "startSendRtp",
            json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream_id, "ssrc": ssrc, "dst_url": dst_ip, "dst_port": dst_port, "is_udp": 0}),
        )
        .await?;
        Ok(())
    }

    /// Cascade passive push: the upstream will connect to us, so the media
    /// engine is told the local port it should push from.
    pub async fn start_send_rtp_passive(&self, stream_id: &str, ssrc: &str, local_port: u16) -> Result<()> {
        self.call_default(
            "startSendRtpPassive",
            json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream_id, "ssrc": ssrc, "src_port": local_port}),
        )
        .await?;
        Ok(())
    }

    pub async fn stop_send_rtp(&self, stream_id: &str, ssrc: &str) -> Result<()> {
        self.call_default("stopSendRtp", json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream_id, "ssrc": ssrc}))
            .await?;
        Ok(())
    }

    pub async fn get_rtp_info(&self, stream_id: &str) -> Result<Value> {
        self.call_default("getRtpInfo", json!({"stream_id": stream_id})).await
    }

    pub async fn pause_rtp_check(&self, stream_id: &str) -> Result<()> {
        self.call_default("pauseRtpCheck", json!({"stream_id": stream_id})).await?;
        Ok(())
    }

    pub async fn resume_rtp_check(&self, stream_id: &str) -> Result<()> {
        self.call_default("resumeRtpCheck", json!({"stream_id": stream_id})).await?;
        Ok(())
    }

    // -- Media/stream introspection (Supervisor liveness probe) --

    pub async fn get_media_list(&self, stream: &str) -> Result<Vec<Value>> {
        let resp = self
            .call_default("getMediaList", json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream}))
            .await?;
        Ok(resp
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn get_media_info(&self, stream: &str) -> Result<Value> {
        self.call_default("getMediaInfo", json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream}))
            .await
    }

    pub async fn is_media_online(&self, stream: &str) -> Result<bool> {
        let resp = self
            .call_default("isMediaOnline", json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream}))
            .await?;
        Ok(resp.get("online").and_then(Value::as_bool).unwrap_or(false))
    }

    pub async fn close_stream(&self, stream: &str) -> Result<()> {
        self.call_default("close_stream", json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream}))
            .await?;
        Ok(())
    }

    pub async fn close_streams(&self, app: &str) -> Result<()> {
        self.call_default("close_streams", json!({"vhost": "__defaultVhost__", "app": app})).await?;
        Ok(())
    }

    // -- Snapshot, proxies, recording --

    pub async fn get_snap(&self, url: &str) -> Result<Vec<u8>> {
        let mut params = json!({"url": url, "timeout_sec": 15, "expire_sec": 1});
        if let Value::Object(ref mut map) = params {
            map.insert("secret".to_string(), Value::String(self.secret.clone()));
        }
        let resp = self
            .http
            .post(self.endpoint("getSnap"))
            .json(&params)
            .timeout(LONG_TIMEOUT)
            .send()
            .await?;
        Ok(resp.bytes().await?.to_vec())
    }

    pub async fn add_stream_proxy(&self, stream: &str, url: &str) -> Result<()> {
        self.call_default(
            "addStreamProxy",
            json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream, "url": url}),
        )
        .await?;
        Ok(())
    }

    pub async fn del_stream_proxy(&self, key: &str) -> Result<()> {
        self.call_default("delStreamProxy", json!({"key": key})).await?;
        Ok(())
    }

    pub async fn add_ffmpeg_source(&self, src_url: &str, dst_url: &str) -> Result<()> {
        self.call_default("addFFmpegSource", json!({"src_url": src_url, "dst_url": dst_url})).await?;
        Ok(())
    }

    pub async fn del_ffmpeg_source(&self, key: &str) -> Result<()> {
        self.call_default("delFFmpegSource", json!({"key": key})).await?;
        Ok(())
    }

    pub async fn add_stream_pusher_proxy(&self, stream: &str, dst_url: &str) -> Result<()> {
        self.call_default(
            "addStreamPusherProxy",
            json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream, "dst_url": dst_url}),
        )
        .await?;
        Ok(())
    }

    pub async fn del_stream_pusher_proxy(&self, key: &str) -> Result<()> {
        self.call_default("delStreamPusherProxy", json!({"key": key})).await?;
        Ok(())
    }

    pub async fn start_record(&self, stream: &str) -> Result<()> {
        self.call_default(
            "startRecord",
            json!({"type": 1, "vhost": "__defaultVhost__", "app": "rtp", "stream": stream}),
        )
        .await?;
        Ok(())
    }

    pub async fn stop_record(&self, stream: &str) -> Result<()> {
        self.call_default(
            "stopRecord",
            json!({"type": 1, "vhost": "__defaultVhost__", "app": "rtp", "stream": stream}),
        )
        .await?;
        Ok(())
    }

    pub async fn get_record_status(&self, stream: &str) -> Result<Value> {
        self.call_default(
            "getRecordStatus",
            json!({"type": 1, "vhost": "__defaultVhost__", "app": "rtp", "stream": stream}),
        )
        .await
    }

    pub async fn is_recording(&self, stream: &str) -> Result<bool> {
        let resp = self.get_record_status(stream).await?;
        Ok(resp.get("status").and_then(Value::as_i64).unwrap_or(0) == 1)
    }

    pub async fn get_mp4_record_file(&self, stream: &str, date: &str) -> Result<Vec<Value>> {
        let resp = self
            .call("getMp4RecordFile", json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream, "period": date}), LONG_TIMEOUT)
            .await?;
        Ok(resp
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn delete_record_directory(&self, stream: &str, date: &str) -> Result<()> {
        self.call_default(
            "deleteRecordDirectory",
            json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream, "period": date}),
        )
        .await?;
        Ok(())
    }

    pub async fn seek_record_stamp(&self, stream: &str, seek_second: i64) -> Result<()> {
        self.call_default(
            "seekRecordStamp",
            json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream, "stamp": seek_second}),
        )
        .await?;
        Ok(())
    }

    pub async fn set_record_speed(&self, stream: &str, speed: f64) -> Result<()> {
        self.call_default(
            "setRecordSpeed",
            json!({"vhost": "__defaultVhost__", "app": "rtp", "stream": stream, "speed": speed}),
        )
        .await?;
        Ok(())
    }

    // -- Server administration --

    /// Called once at startup with the webhook URL template for every hook.
    pub async fn set_server_config(&self, hooks: &[(&str, String)]) -> Result<()> {
        let mut params = serde_json::Map::new();
        for (hook, url) in hooks {
            params.insert(format!("hook.{hook}"), Value::String(url.clone()));
        }
        self.call_default("setServerConfig", Value::Object(params)).await?;
        Ok(())
    }

    pub async fn get_server_config(&self) -> Result<Value> {
        self.call_default("getServerConfig", json!({})).await
    }

    pub async fn restart_server(&self) -> Result<()> {
        self.call_default("restartServer", json!({})).await?;
        Ok(())
    }

    pub async fn version(&self) -> Result<Value> {
        self.call_default("version", json!({})).await
    }

    pub async fn get_statistic(&self) -> Result<Value> {
        self.call_default("getStatistic", json!({})).await
    }

    pub async fn get_all_session(&self) -> Result<Vec<Value>> {
        let resp = self.call_default("getAllSession", json!({})).await?;
        Ok(resp
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn kick_session(&self, id: &str) -> Result<()> {
        self.call_default("kick_session", json!({"id": id})).await?;
        Ok(())
    }

    pub async fn kick_sessions(&self, ids: &[String]) -> Result<()> {
        self.call_default("kick_sessions", json!({"id_list": ids})).await?;
        Ok(())
    }

    pub async fn get_threads_load(&self) -> Result<Value> {
        self.call_default("getThreadsLoad", json!({})).await
    }

    pub async fn get_work_threads_load(&self) -> Result<Value> {
        self.call_default("getWorkThreadsLoad", json!({})).await
    }

    pub async fn get_media_player_list(&self) -> Result<Vec<Value>> {
        let resp = self.call_default("getMediaPlayerList", json!({})).await?;
        Ok(resp
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn get_api_list(&self) -> Result<Vec<String>> {
        let resp = self.call_default("getApiList", json!({})).await?;
        Ok(resp
            .get("data")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default())
    }

    pub async fn download_bin(&self) -> Result<Vec<u8>> {
        let mut params = json!({});
        if let Value::Object(ref mut map) = params {
            map.insert("secret".to_string(), Value::String(self.secret.clone()));
        }
        let resp = self
            .http
            .post(self.endpoint("downloadBin"))
            .json(&params)
            .timeout(LONG_TIMEOUT)
            .send()
            .await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_zero_code_surfaces_as_api_error() {
        let server = wiremock_stub_server().await;
        let client = MediaEngineClient::new(server.0, "secret");
        let err = client.open_rtp_server("0100000001", 1).await.unwrap_err();
        assert!(matches!(err, Error::Api { code, .. } if code == -1));
        server.1.abort();
    }

    /// A tiny hand-rolled HTTP stub: the workspace has no `wiremock`
    /// dependency, so the test spins up its own `hyper`-free TCP responder
    /// via `axum` (already a workspace dependency) for one request.
    async fn wiremock_stub_server() -> (String, tokio::task::JoinHandle<()>) {
        use axum::routing::post;
        use axum::Router;

        async fn fail() -> axum::Json<Value> {
            axum::Json(json!({"code": -1, "msg": "no such stream"}))
        }

        let app = Router::new().route("/index/api/openRtpServer", post(fail));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), handle)
    }
}
