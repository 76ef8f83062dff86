use std::sync::Arc;

use gb28181_common::AppConfig;
use gb28181_session_core::PlaySessionManager;

use crate::recording::RecordingRegistry;

/// Shared state every hook handler reads from. Cloning is cheap — every
/// field is already an `Arc` or a plain config snapshot.
#[derive(Clone)]
pub struct WebhookState {
    pub sessions: Arc<PlaySessionManager>,
    pub config: Arc<AppConfig>,
    pub recordings: Arc<RecordingRegistry>,
}

impl WebhookState {
    pub fn new(sessions: Arc<PlaySessionManager>, config: Arc<AppConfig>) -> Self {
        Self {
            sessions,
            config,
            recordings: Arc::new(RecordingRegistry::new()),
        }
    }
}
