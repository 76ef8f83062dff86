//! Background tasks that run for the lifetime of the process, independent
//! of any single SIP dialog: the outbound cascade registrant, a stream
//! liveness probe, a recording-file expiry sweep, and a catalog replay to
//! the upstream platform.

pub mod catalog_replay;
pub mod liveness;
pub mod recording;

use std::sync::Arc;

use gb28181_catalog_core::ChannelStore;
use gb28181_common::config::RecordConfig;
use gb28181_media_client::MediaEngineClient;
use gb28181_registrar_core::{CascadeRegistrant, DeviceStore};
use gb28181_session_core::{PlaySessionManager, StreamStore};
use gb28181_transaction_core::TransactionManager;

/// Owns every periodic background task. [`Supervisor::start`] spawns each
/// task independently — a stall in one (a slow media-engine call, a stuck
/// upstream) never blocks the others, since each is its own `tokio::spawn`
/// loop with its own ticker.
pub struct Supervisor {
    cascade: Arc<CascadeRegistrant>,
    tx_manager: Arc<TransactionManager>,
    devices: Arc<DeviceStore>,
    channels: Arc<ChannelStore>,
    sessions: Arc<PlaySessionManager>,
    stream_store: StreamStore,
    media: MediaEngineClient,
    record_config: RecordConfig,
}

impl Supervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cascade: Arc<CascadeRegistrant>,
        tx_manager: Arc<TransactionManager>,
        devices: Arc<DeviceStore>,
        channels: Arc<ChannelStore>,
        sessions: Arc<PlaySessionManager>,
        stream_store: StreamStore,
        media: MediaEngineClient,
        record_config: RecordConfig,
    ) -> Self {
        Self {
            cascade,
            tx_manager,
            devices,
            channels,
            sessions,
            stream_store,
            media,
            record_config,
        }
    }

    /// Spawn every background task and return immediately. Intended to be
    /// called once, from `main`, after every other component is wired up.
    pub async fn start(self) {
        self.cascade.start(self.tx_manager.clone()).await;

        tokio::spawn(liveness::run(self.stream_store.clone(), self.sessions, self.media.clone()));
        tokio::spawn(recording::run(self.stream_store, self.media, self.record_config));
        tokio::spawn(catalog_replay::run(self.cascade, self.tx_manager, self.devices, self.channels));
    }
}
