//! Shared ambient stack for the GB28181 broker workspace.
//!
//! Every other crate in the workspace depends on this one for configuration
//! loading, logging setup and the persistence pool — the concerns that are
//! identical across the SIP, catalog, session and supervisor crates and
//! therefore live here once rather than being duplicated per-crate.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod time;

pub use config::AppConfig;
pub use error::{Error, Result};
