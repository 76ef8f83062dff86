use std::sync::Arc;
use std::time::Duration;

use gb28181_media_client::MediaEngineClient;
use gb28181_session_core::{PlaySessionManager, StreamStore};
use tracing::{info, warn};

const PROBE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Every interval, ask the media engine whether each Stream the store still
/// considers pending is actually live. A Stream the engine has silently
/// dropped (crash, network partition) never gets another `on_stream_changed`
/// or `on_stream_none_reader` webhook to tell us so — this probe is the
/// only thing that notices and tears it down.
pub async fn run(store: StreamStore, sessions: Arc<PlaySessionManager>, media: MediaEngineClient) {
    let mut ticker = tokio::time::interval(PROBE_INTERVAL);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let pending = match store.pending().await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "stream liveness probe: could not read pending streams");
                continue;
            }
        };
        for (stream_id, ssrc) in pending {
            let online = media.is_media_online(&stream_id).await;
            if let Err(err) = &online {
                warn!(stream_id = %stream_id, error = %err, "stream liveness probe: engine query failed");
            }
            if should_teardown(&online) {
                warn!(stream_id = %stream_id, "stream liveness probe: engine reports stream gone, tearing down");
                if let Err(err) = sessions.stop_play(&ssrc).await {
                    warn!(stream_id = %stream_id, error = %err, "stream liveness probe: teardown failed");
                }
            }
        }
        info!("stream liveness probe swept");
    }
}

/// A query failure is inconclusive, not confirmation the stream is gone —
/// only an explicit `online: false` from the engine triggers teardown.
fn should_teardown<E>(online: &Result<bool, E>) -> bool {
    matches!(online, Ok(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_a_confirmed_offline_response_triggers_teardown() {
        assert!(!should_teardown::<()>(&Ok(true)));
        assert!(should_teardown::<()>(&Ok(false)));
        assert!(!should_teardown(&Err(())));
    }
}
