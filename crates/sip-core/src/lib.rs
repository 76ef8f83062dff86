//! # GB/T-28181 SIP Message Codec
//!
//! This crate implements the "Message Codec" component (C1) of the broker:
//! parsing and serializing SIP request/response messages, the SDP subset the
//! GB/T-28181 profile uses, the MANSCDP XML control bodies, and the digest
//! authentication helpers REGISTER relies on.
//!
//! Every message is fully re-parsed into a typed structure and fully
//! re-serialized on the way out — raw bytes are never passed through
//! verbatim, so header casing and ordering are always under this crate's
//! control.
//!
//! ```rust
//! use gb28181_sip_core::{Method, Request};
//!
//! let req = Request::new(Method::Register, "sip:34020000001320000001@3402000000".parse().unwrap());
//! assert_eq!(req.method, Method::Register);
//! ```

pub mod digest;
pub mod error;
pub mod header;
pub mod manscdp;
pub mod message;
pub mod method;
pub mod parser;
pub mod sdp;
pub mod tokens;
pub mod uri;

pub use error::{Error, Result};
pub use header::{Header, HeaderName};
pub use message::{Message, Request, Response, StatusLine};
pub use method::Method;
pub use uri::Uri;
