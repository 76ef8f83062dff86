//! Configuration loading.
//!
//! Layering, lowest to highest priority: compiled-in defaults, `config.yml`
//! in the working directory, environment variables prefixed `GB28181_` with
//! `__` as the nesting separator (e.g. `GB28181_MEDIA__SECRET`).

use serde::Deserialize;
use std::collections::HashMap;

/// Root configuration, mirroring the `config.yml` schema.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `release` or `debug`.
    #[serde(default = "default_mod")]
    pub mod_: String,
    /// Own northbound HTTP API listen address.
    #[serde(default = "default_api")]
    pub api: String,
    /// Logger level, e.g. `debug`, `info`.
    #[serde(default = "default_logger")]
    pub logger: String,
    #[serde(default)]
    pub db: DatabaseConfig,
    #[serde(default)]
    pub media: MediaServerConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub record: RecordConfig,
    pub gb28181: Gb28181Config,
    #[serde(default)]
    pub cascade: CascadeConfig,
    /// dotted-key -> URL, e.g. `on_stream_changed: http://...`
    #[serde(default)]
    pub notify: HashMap<String, String>,
}

fn default_mod() -> String {
    "release".to_string()
}
fn default_api() -> String {
    "0.0.0.0:8090".to_string()
}
fn default_logger() -> String {
    "debug".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres` or `sqlite`.
    #[serde(default = "default_db_driver")]
    pub driver: String,
    #[serde(default = "default_db_url")]
    pub url: String,
}

fn default_db_driver() -> String {
    "sqlite".to_string()
}
fn default_db_url() -> String {
    "sqlite::memory:".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_db_driver(),
            url: default_db_url(),
        }
    }
}

/// ZLMediaKit-like media engine endpoints.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MediaServerConfig {
    #[serde(default)]
    pub restful: String,
    #[serde(default)]
    pub http: String,
    #[serde(default)]
    pub ws: String,
    #[serde(default)]
    pub rtmp: String,
    #[serde(default)]
    pub rtsp: String,
    #[serde(default)]
    pub rtp: String,
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StreamConfig {
    #[serde(default)]
    pub hls: bool,
    #[serde(default)]
    pub rtmp: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordConfig {
    #[serde(default)]
    pub filepath: String,
    #[serde(default = "default_record_expire")]
    pub expire: i64,
    #[serde(default = "default_record_max")]
    pub recordmax: i64,
}

fn default_record_expire() -> i64 {
    7
}
fn default_record_max() -> i64 {
    600
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            filepath: String::new(),
            expire: default_record_expire(),
            recordmax: default_record_max(),
        }
    }
}

/// The broker's own GB/T-28181 identity.
#[derive(Debug, Clone, Deserialize)]
pub struct Gb28181Config {
    #[serde(default = "default_udp")]
    pub udp: String,
    pub region: String,
    pub cid: String,
    pub did: String,
    pub lid: String,
}

fn default_udp() -> String {
    "0.0.0.0:5060".to_string()
}

/// Upstream cascade registration parameters.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CascadeConfig {
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub sudp: String,
    #[serde(default)]
    pub spwd: String,
    #[serde(default)]
    pub laddr: String,
    #[serde(default)]
    pub ludp: String,
    #[serde(default)]
    pub ltcp: String,
    #[serde(default)]
    pub run: i32,
    #[serde(default)]
    pub sport: u16,
    #[serde(default)]
    pub eport: u16,
    #[serde(default)]
    pub cityid: String,
    #[serde(default)]
    pub cityname: String,
    #[serde(default)]
    pub catamod: i32,
}

impl AppConfig {
    /// Load configuration from `config.yml` in the working directory,
    /// overlaid with `GB28181_*` environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config.yml")
    }

    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("GB28181")
                    .separator("__")
                    .try_parsing(true),
            );
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_gb28181_identity_is_set() {
        let minimal = r#"{
            "gb28181": {
                "region": "3402000000",
                "cid": "34020000001310000",
                "did": "34020000001320000001",
                "lid": "34020000002000000001"
            }
        }"#;
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(minimal, config::FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.api, default_api());
        assert_eq!(cfg.gb28181.udp, default_udp());
        assert_eq!(cfg.record.expire, 7);
        assert_eq!(cfg.record.recordmax, 600);
    }
}
