//! Client over the media engine's JSON control-plane API (the RTP relay,
//! recorder, and snapshot service sitting alongside the SIP broker).
//!
//! Every call is a POST of `{"secret": ..., ...}` to
//! `<base>/index/api/<method>`, and every response is `{"code": 0, ...}` on
//! success. This crate owns that envelope and nothing else — no retries, no
//! circuit breaking; callers decide what a failure means for their flow.

pub mod client;
pub mod error;

pub use client::MediaEngineClient;
pub use error::{Error, Result};
