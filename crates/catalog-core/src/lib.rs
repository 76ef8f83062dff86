//! Device/channel catalog store and Catalog/RecordInfo query-response
//! construction.

pub mod catalog;
pub mod channel;
pub mod error;
pub mod recordinfo;
pub mod store;
pub mod tree;

pub use channel::{Channel, ChannelStatus, StreamType};
pub use error::{Error, Result};
pub use store::ChannelStore;
pub use tree::{CityDistrictSource, EmptySource, StaticSource};
