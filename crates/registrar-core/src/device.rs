use gb28181_common::time::now_unix;

/// A physical NVR or standalone camera.
#[derive(Debug, Clone)]
pub struct Device {
    pub device_id: String,
    pub region_id: String,
    pub parent_device_id: Option<String>,
    pub source_addr: Option<String>,
    pub password: String,
    pub active: i64,
    pub registered: bool,
    pub status: DeviceStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    On,
    Off,
    Unknown,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::On => "ON",
            DeviceStatus::Off => "OFF",
            DeviceStatus::Unknown => "UNKNOWN",
        }
    }
}

/// An offline device is filtered at query time, never deleted: considered
/// offline once `now - Active > 30 min`.
pub const OFFLINE_THRESHOLD_SECS: i64 = 30 * 60;

impl Device {
    pub fn new(device_id: impl Into<String>, region_id: impl Into<String>, password: impl Into<String>) -> Self {
        let now = now_unix();
        Self {
            device_id: device_id.into(),
            region_id: region_id.into(),
            parent_device_id: None,
            source_addr: None,
            password: password.into(),
            active: now,
            registered: false,
            status: DeviceStatus::Unknown,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_online(&self) -> bool {
        now_unix() - self.active <= OFFLINE_THRESHOLD_SECS
    }

    pub fn touch(&mut self) {
        self.active = now_unix();
        self.updated_at = self.active;
        self.status = DeviceStatus::On;
    }
}
