//! Device registry (inbound REGISTER/KEEPALIVE) and cascade registrant
//! (outbound REGISTER to an upstream platform).

pub mod cascade;
pub mod device;
pub mod error;
pub mod inbound;
pub mod store;

pub use cascade::{CascadeConfig, CascadeRegistrant, CascadeState};
pub use device::{Device, DeviceStatus};
pub use error::{Error, Result};
pub use store::DeviceStore;
