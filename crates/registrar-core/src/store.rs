use dashmap::DashMap;
use sqlx::AnyPool;

use crate::device::{Device, DeviceStatus};
use crate::error::Result;

/// Owns the Device set. The in-memory map is the hot path for the
/// request/response cycle (location.rs's pattern, adapted: every device
/// lookup must answer inline while a datagram is in flight); the pool is
/// the write-through copy of record ("the store is the
/// authoritative persistent copy — all mutators write-through").
pub struct DeviceStore {
    cache: DashMap<String, Device>,
    pool: AnyPool,
}

impl DeviceStore {
    pub fn new(pool: AnyPool) -> Self {
        Self {
            cache: DashMap::new(),
            pool,
        }
    }

    /// Load every device row into the cache. Called once at startup.
    pub async fn load_all(&self) -> Result<()> {
        let rows = sqlx::query_as::<_, DeviceRow>(
            "SELECT device_id, region_id, parent_device_id, source_addr, password, \
             active, registered, status, created_at, updated_at FROM devices",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in rows {
            self.cache.insert(row.device_id.clone(), row.into_device());
        }
        Ok(())
    }

    pub fn get(&self, device_id: &str) -> Option<Device> {
        self.cache.get(device_id).map(|d| d.clone())
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.cache.contains_key(device_id)
    }

    /// Upsert on successful REGISTER: `Registered = true`,
    /// `Active = now`, source address captured from the packet.
    pub async fn upsert_registered(
        &self,
        device_id: &str,
        region_id: &str,
        password: &str,
        source_addr: &str,
    ) -> Result<()> {
        let mut device = self
            .cache
            .get(device_id)
            .map(|d| d.clone())
            .unwrap_or_else(|| Device::new(device_id, region_id, password));
        device.touch();
        device.registered = true;
        device.source_addr = Some(source_addr.to_string());

        sqlx::query(
            "INSERT INTO devices (device_id, region_id, source_addr, password, active, \
             registered, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(device_id) DO UPDATE SET source_addr = excluded.source_addr, \
             active = excluded.active, registered = excluded.registered, \
             status = excluded.status, updated_at = excluded.updated_at",
        )
        .bind(&device.device_id)
        .bind(&device.region_id)
        .bind(&device.source_addr)
        .bind(&device.password)
        .bind(device.active)
        .bind(device.registered)
        .bind(device.status.as_str())
        .bind(device.created_at)
        .bind(device.updated_at)
        .execute(&self.pool)
        .await?;

        self.cache.insert(device_id.to_string(), device);
        Ok(())
    }

    /// De-registration, signaled by `Expires: 0`.
    pub async fn mark_unregistered(&self, device_id: &str) -> Result<()> {
        if let Some(mut entry) = self.cache.get_mut(device_id) {
            entry.registered = false;
            entry.status = DeviceStatus::Off;
        }
        sqlx::query("UPDATE devices SET registered = 0, status = 'OFF' WHERE device_id = ?")
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// KEEPALIVE: bump `Active` without touching `Registered`.
    pub async fn touch_keepalive(&self, device_id: &str) -> Result<bool> {
        let Some(mut entry) = self.cache.get_mut(device_id) else {
            return Ok(false);
        };
        entry.touch();
        let active = entry.active;
        drop(entry);
        sqlx::query("UPDATE devices SET active = ?, status = 'ON', updated_at = ? WHERE device_id = ?")
            .bind(active)
            .bind(active)
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    /// All devices active within the last 30 minutes: the catalog query's
    /// pagination source set.
    pub fn online_devices(&self) -> Vec<Device> {
        self.cache
            .iter()
            .filter(|d| d.is_online())
            .map(|d| d.clone())
            .collect()
    }
}

#[derive(sqlx::FromRow)]
struct DeviceRow {
    device_id: String,
    region_id: Option<String>,
    parent_device_id: Option<String>,
    source_addr: Option<String>,
    password: String,
    active: i64,
    registered: bool,
    status: String,
    created_at: i64,
    updated_at: i64,
}

impl DeviceRow {
    fn into_device(self) -> Device {
        Device {
            device_id: self.device_id,
            region_id: self.region_id.unwrap_or_default(),
            parent_device_id: self.parent_device_id,
            source_addr: self.source_addr,
            password: self.password,
            active: self.active,
            registered: self.registered,
            status: match self.status.as_str() {
                "ON" => DeviceStatus::On,
                "OFF" => DeviceStatus::Off,
                _ => DeviceStatus::Unknown,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
