use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use gb28181_common::config::RecordConfig;
use gb28181_media_client::MediaEngineClient;
use gb28181_session_core::StreamStore;
use tracing::{info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// How many days past the expiry threshold to keep checking for a leftover
/// directory. A stream that stopped recording long ago only ever has one or
/// two expired day-directories sitting around; this just bounds the probe.
const LOOKBACK_DAYS: i64 = 14;

/// Every interval, delete recorded-file day-directories older than
/// `Record.Expire` days, stopping once `Record.Recordmax` directories have
/// been removed in this sweep so a backlog cannot monopolize the tick.
pub async fn run(store: StreamStore, media: MediaEngineClient, config: RecordConfig) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let stream_ids = match store.all_stream_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "recording expiry sweep: could not list streams");
                continue;
            }
        };
        let removed = sweep_once(&media, &stream_ids, &config).await;
        info!(removed, "recording expiry sweep completed");
    }
}

/// One pass over `stream_ids`, returning the number of day-directories
/// removed. Split out from [`run`] so it can be driven directly in tests
/// without waiting on the 5-minute ticker.
async fn sweep_once(media: &MediaEngineClient, stream_ids: &[String], config: &RecordConfig) -> i64 {
    let mut removed = 0i64;
    'streams: for stream_id in stream_ids {
        for day_offset in config.expire..config.expire + LOOKBACK_DAYS {
            if removed >= config.recordmax {
                break 'streams;
            }
            let date = (Utc::now() - ChronoDuration::days(day_offset)).format("%Y-%m-%d").to_string();
            match media.get_mp4_record_file(stream_id, &date).await {
                Ok(files) if !files.is_empty() => {
                    if let Err(err) = media.delete_record_directory(stream_id, &date).await {
                        warn!(stream_id = %stream_id, %date, error = %err, "recording expiry sweep: delete failed");
                        continue;
                    }
                    removed += 1;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(stream_id = %stream_id, %date, error = %err, "recording expiry sweep: directory lookup failed");
                }
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Json as ExtractJson;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    async fn stub_server(deletes: Arc<AtomicI64>) -> (String, tokio::task::JoinHandle<()>) {
        async fn get_mp4_record_file(ExtractJson(_body): ExtractJson<Value>) -> Json<Value> {
            Json(serde_json::json!({"code": 0, "data": [{"file_name": "0.mp4"}]}))
        }

        let delete_counter = deletes.clone();
        let delete_handler = move |ExtractJson(_body): ExtractJson<Value>| {
            let delete_counter = delete_counter.clone();
            async move {
                delete_counter.fetch_add(1, Ordering::SeqCst);
                Json(serde_json::json!({"code": 0}))
            }
        };

        let app = Router::new()
            .route("/index/api/getMp4RecordFile", post(get_mp4_record_file))
            .route("/index/api/deleteRecordDirectory", post(delete_handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn stops_at_recordmax_even_with_more_streams_pending() {
        let deletes = Arc::new(AtomicI64::new(0));
        let (base_url, handle) = stub_server(deletes.clone()).await;
        let media = MediaEngineClient::new(base_url, "secret");
        let config = RecordConfig {
            filepath: String::new(),
            expire: 7,
            recordmax: 2,
        };
        let stream_ids: Vec<String> = vec!["s1".into(), "s2".into(), "s3".into()];

        let removed = sweep_once(&media, &stream_ids, &config).await;

        assert_eq!(removed, 2);
        assert_eq!(deletes.load(Ordering::SeqCst), 2);
        handle.abort();
    }
}
