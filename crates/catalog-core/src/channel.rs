use gb28181_common::time::now_unix;

/// A logical media source owned by exactly one Device.
#[derive(Debug, Clone)]
pub struct Channel {
    pub channel_id: String,
    pub device_id: String,
    pub name: String,
    pub stream_type: StreamType,
    pub uri: String,
    pub status: ChannelStatus,
    pub active: i64,
    pub civil_code: String,
    pub longitude: f64,
    pub latitude: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Push,
    Pull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    On,
    Off,
    Unknown,
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::On => "ON",
            ChannelStatus::Off => "OFF",
            ChannelStatus::Unknown => "UNKNOWN",
        }
    }
}

impl Channel {
    pub fn new(channel_id: impl Into<String>, device_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = now_unix();
        Self {
            channel_id: channel_id.into(),
            device_id: device_id.into(),
            name: name.into(),
            stream_type: StreamType::Push,
            uri: String::new(),
            status: ChannelStatus::Unknown,
            active: now,
            civil_code: String::new(),
            longitude: 0.0,
            latitude: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}
