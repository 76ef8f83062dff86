//! Process entry point: load configuration, wire every component crate
//! together, and run until interrupted.

mod dispatch;
mod locator;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use gb28181_catalog_core::ChannelStore;
use gb28181_common::config::CascadeConfig as YamlCascadeConfig;
use gb28181_common::logging::{setup_logging, LoggingConfig};
use gb28181_common::{db, AppConfig};
use gb28181_media_client::MediaEngineClient;
use gb28181_registrar_core::cascade::CascadeConfig as CascadeRuntimeConfig;
use gb28181_registrar_core::{CascadeRegistrant, DeviceStore};
use gb28181_session_core::{PassivePortAllocator, PlaySessionManager, StreamStore};
use gb28181_sip_transport::UdpTransport;
use gb28181_supervisor::Supervisor;
use gb28181_transaction_core::TransactionManager;
use gb28181_webhook::{router, WebhookState};
use tokio::net::TcpListener;
use tracing::info;

use crate::locator::RegistrarLocator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading config.yml")?;
    setup_logging(LoggingConfig::from_level_name(&config.logger));
    info!(udp = %config.gb28181.udp, api = %config.api, "starting GB/T-28181 broker");

    let pool = db::connect(&config.db).await.context("connecting to the database")?;

    let channels = Arc::new(ChannelStore::new(pool.clone()));
    let devices = Arc::new(DeviceStore::new(pool.clone()));
    devices.load_all().await.context("loading devices from the database")?;

    let locator = Arc::new(RegistrarLocator::new(devices.clone()));

    let bind_addr: SocketAddr = config.gb28181.udp.parse().context("parsing gb28181.udp")?;
    let (sip_transport, sip_events) = UdpTransport::bind(bind_addr, None).await.context("binding the SIP transport")?;
    let (tx_manager, incoming_rx) = TransactionManager::new(sip_transport, sip_events);

    let media = MediaEngineClient::new(config.media.restful.clone(), config.media.secret.clone());
    let engine_ip = media_engine_ip(&config);
    let stream_store = StreamStore::new(pool.clone());

    let sessions = PlaySessionManager::new(
        config.gb28181.region.clone(),
        config.gb28181.lid.clone(),
        config.gb28181.udp.clone(),
        engine_ip,
        channels.clone(),
        locator,
        tx_manager.clone(),
        media.clone(),
        stream_store.clone(),
        passive_port_range(&config.cascade),
    );

    tokio::spawn(dispatch::run(
        incoming_rx,
        tx_manager.clone(),
        devices.clone(),
        channels.clone(),
        sessions.clone(),
        config.gb28181.region.clone(),
    ));

    let cascade = build_cascade(&config.cascade, &config.gb28181.region);

    let webhook_state = WebhookState::new(sessions.clone(), Arc::new(config.clone()));
    let app = router(webhook_state).layer(tower_http::trace::TraceLayer::new_for_http());
    let api_addr: SocketAddr = config.api.parse().context("parsing the northbound API address")?;
    let listener = TcpListener::bind(api_addr).await.context("binding the northbound API")?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::warn!(error = %err, "northbound API server exited");
        }
    });

    Supervisor::new(
        cascade.clone(),
        tx_manager,
        devices,
        channels,
        sessions,
        stream_store,
        media,
        config.record.clone(),
    )
    .start()
    .await;

    info!("broker running");
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received, draining in-flight dialogs");
    cascade.stop().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    info!("broker shut down");
    Ok(())
}

/// The engine IP offered in SDP as the RTP destination. Preferred source is
/// `media.rtp` (`ip:port`, the media engine's RTP listen address); falls
/// back to the host part of `media.restful`, then loopback.
fn media_engine_ip(config: &AppConfig) -> IpAddr {
    if let Ok(addr) = config.media.rtp.parse::<SocketAddr>() {
        return addr.ip();
    }
    let host = config
        .media
        .restful
        .rsplit("://")
        .next()
        .unwrap_or(&config.media.restful)
        .split(':')
        .next()
        .unwrap_or("");
    host.parse().unwrap_or_else(|_| IpAddr::from([127, 0, 0, 1]))
}

/// Guards against an unconfigured (`sport`/`eport` both zero, or inverted)
/// cascade passive-push range with a safe default rather than panicking on
/// [`PassivePortAllocator::new`]'s ordering assertion.
fn passive_port_range(cfg: &YamlCascadeConfig) -> PassivePortAllocator {
    if cfg.sport > 0 && cfg.eport > cfg.sport {
        PassivePortAllocator::new(cfg.sport, cfg.eport)
    } else {
        PassivePortAllocator::new(30000, 30500)
    }
}

/// `cascade.run == 0` means cascading upstream isn't configured for this
/// deployment; the registrant is still built so [`Supervisor`] always has
/// one to own, it just never manages to REGISTER against an empty address
/// and sits harmlessly idle.
fn build_cascade(cfg: &YamlCascadeConfig, region_id: &str) -> Arc<CascadeRegistrant> {
    let remote: SocketAddr = cfg.sudp.parse().unwrap_or(SocketAddr::new(IpAddr::from([0, 0, 0, 0]), 0));
    CascadeRegistrant::new(CascadeRuntimeConfig {
        sid: cfg.sid.clone(),
        sudp: cfg.sudp.clone(),
        spwd: cfg.spwd.clone(),
        laddr: cfg.laddr.clone(),
        region_id: region_id.to_string(),
        remote,
    })
}
