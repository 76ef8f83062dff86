use std::net::SocketAddr;
use std::sync::Arc;

use gb28181_registrar_core::DeviceStore;
use gb28181_session_core::DeviceLocator;

/// Resolves a device's address from whatever it last REGISTERed with.
pub struct RegistrarLocator {
    devices: Arc<DeviceStore>,
}

impl RegistrarLocator {
    pub fn new(devices: Arc<DeviceStore>) -> Self {
        Self { devices }
    }
}

impl DeviceLocator for RegistrarLocator {
    fn source_addr(&self, device_id: &str) -> Option<SocketAddr> {
        self.devices.get(device_id)?.source_addr?.parse().ok()
    }
}
