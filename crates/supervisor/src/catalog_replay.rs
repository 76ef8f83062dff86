use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gb28181_catalog_core::ChannelStore;
use gb28181_registrar_core::{CascadeRegistrant, CascadeState, DeviceStore};
use gb28181_transaction_core::TransactionManager;
use tracing::{info, warn};

const REPLAY_INTERVAL: Duration = Duration::from_secs(3600);

/// Every hour, once the cascade registrant is [`CascadeState::Registered`],
/// push an unsolicited Catalog of everything this broker owns upstream.
/// [`CascadeRegistrant::start`] already re-REGISTERs on the same cadence;
/// this pushes the catalog refresh a parent platform would otherwise have to
/// poll for with its own Catalog query.
pub async fn run(
    cascade: Arc<CascadeRegistrant>,
    tx_manager: Arc<TransactionManager>,
    devices: Arc<DeviceStore>,
    channels: Arc<ChannelStore>,
) {
    let sn = AtomicU32::new(0);
    let mut ticker = tokio::time::interval(REPLAY_INTERVAL);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if cascade.state().await != CascadeState::Registered {
            continue;
        }

        let query_device_id = cascade.config().sid.clone();
        let mut rows = Vec::new();
        for device in devices.online_devices() {
            let device_channels = channels.by_device(&device.device_id);
            rows.extend(gb28181_catalog_core::catalog::catalog_rows(&device.device_id, &device_channels));
        }
        if rows.is_empty() {
            continue;
        }

        let sn = sn.fetch_add(1, Ordering::SeqCst) + 1;
        let fragments = gb28181_catalog_core::catalog::build_catalog_fragments(sn, &query_device_id, &rows);
        let mut sent = 0usize;
        for fragment in &fragments {
            let Ok(xml) = fragment.to_xml() else {
                continue;
            };
            if cascade.send_xml_message(&tx_manager, xml).await {
                sent += 1;
            }
        }
        info!(total = fragments.len(), sent, "catalog replay sent upstream");
        if sent < fragments.len() {
            warn!(total = fragments.len(), sent, "catalog replay: some fragments were not acknowledged");
        }
    }
}
