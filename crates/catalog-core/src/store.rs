use dashmap::DashMap;
use sqlx::AnyPool;

use crate::channel::{Channel, ChannelStatus, StreamType};
use crate::error::Result;

/// Owns the Channel set, following the registrar's device store's
/// cache-plus-write-through shape ("the store is the
/// authoritative persistent copy — all mutators write-through").
pub struct ChannelStore {
    cache: DashMap<String, Channel>,
    pool: AnyPool,
}

impl ChannelStore {
    pub fn new(pool: AnyPool) -> Self {
        Self {
            cache: DashMap::new(),
            pool,
        }
    }

    pub async fn load_all(&self) -> Result<()> {
        let rows = sqlx::query_as::<_, ChannelRow>(
            "SELECT channel_id, device_id, name, stream_type, uri, status, active, \
             civil_code, longitude, latitude, created_at, updated_at FROM channels",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in rows {
            self.cache.insert(row.channel_id.clone(), row.into_channel());
        }
        Ok(())
    }

    pub fn get(&self, channel_id: &str) -> Option<Channel> {
        self.cache.get(channel_id).map(|c| c.clone())
    }

    /// Channels owned by `device_id`, insertion order is not guaranteed —
    /// callers that page results must sort by `channel_id` for a stable cut.
    pub fn by_device(&self, device_id: &str) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self
            .cache
            .iter()
            .filter(|c| c.device_id == device_id)
            .map(|c| c.clone())
            .collect();
        channels.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        channels
    }

    pub async fn upsert(&self, channel: Channel) -> Result<()> {
        sqlx::query(
            "INSERT INTO channels (channel_id, device_id, name, stream_type, uri, status, \
             active, civil_code, longitude, latitude, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(channel_id) DO UPDATE SET name = excluded.name, \
             stream_type = excluded.stream_type, uri = excluded.uri, status = excluded.status, \
             active = excluded.active, updated_at = excluded.updated_at",
        )
        .bind(&channel.channel_id)
        .bind(&channel.device_id)
        .bind(&channel.name)
        .bind(stream_type_str(channel.stream_type))
        .bind(&channel.uri)
        .bind(channel.status.as_str())
        .bind(channel.active)
        .bind(&channel.civil_code)
        .bind(channel.longitude)
        .bind(channel.latitude)
        .bind(channel.created_at)
        .bind(channel.updated_at)
        .execute(&self.pool)
        .await?;
        self.cache.insert(channel.channel_id.clone(), channel);
        Ok(())
    }
}

fn stream_type_str(t: StreamType) -> &'static str {
    match t {
        StreamType::Push => "push",
        StreamType::Pull => "pull",
    }
}

#[derive(sqlx::FromRow)]
struct ChannelRow {
    channel_id: String,
    device_id: String,
    name: Option<String>,
    stream_type: Option<String>,
    uri: Option<String>,
    status: Option<String>,
    active: Option<i64>,
    civil_code: Option<String>,
    longitude: Option<f64>,
    latitude: Option<f64>,
    created_at: Option<i64>,
    updated_at: i64,
}

impl ChannelRow {
    fn into_channel(self) -> Channel {
        Channel {
            channel_id: self.channel_id,
            device_id: self.device_id,
            name: self.name.unwrap_or_default(),
            stream_type: match self.stream_type.as_deref() {
                Some("pull") => StreamType::Pull,
                _ => StreamType::Push,
            },
            uri: self.uri.unwrap_or_default(),
            status: match self.status.as_deref() {
                Some("ON") => ChannelStatus::On,
                Some("OFF") => ChannelStatus::Off,
                _ => ChannelStatus::Unknown,
            },
            active: self.active.unwrap_or(0),
            civil_code: self.civil_code.unwrap_or_default(),
            longitude: self.longitude.unwrap_or(0.0),
            latitude: self.latitude.unwrap_or(0.0),
            created_at: self.created_at.unwrap_or(0),
            updated_at: self.updated_at,
        }
    }
}
