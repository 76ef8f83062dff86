use dashmap::DashMap;
use tokio::sync::oneshot;

/// Correlates a `startRecord` call with the `on_record_mp4` webhook that
/// eventually reports where the finished file landed, the same
/// request/response correlation shape the transaction layer uses for SIP.
#[derive(Default)]
pub struct RecordingRegistry {
    pending: DashMap<String, oneshot::Sender<String>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `stream_id`'s next completed recording file.
    pub fn watch(&self, stream_id: impl Into<String>) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(stream_id.into(), tx);
        rx
    }

    /// Deliver the file URL to whoever is watching `stream_id`, if anyone.
    /// A no-op if nothing registered interest (e.g. server restarted).
    pub fn complete(&self, stream_id: &str, file_url: String) {
        if let Some((_, tx)) = self.pending.remove(stream_id) {
            let _ = tx.send(file_url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_the_file_url_to_the_watcher() {
        let registry = RecordingRegistry::new();
        let rx = registry.watch("0100000001");
        registry.complete("0100000001", "http://media/record/a.mp4".to_string());
        assert_eq!(rx.await.unwrap(), "http://media/record/a.mp4");
    }

    #[test]
    fn completing_an_unwatched_stream_is_a_no_op() {
        let registry = RecordingRegistry::new();
        registry.complete("unknown", "http://media/record/a.mp4".to_string());
    }
}
