use gb28181_common::time::now_unix;
use sqlx::AnyPool;
use sqlx::Row;

use crate::error::Result;
use crate::stream::{SessionState, Stream};

/// Write-through persistence for Streams. The in-memory live set in
/// [`crate::manager::PlaySessionManager`] is authoritative for anything
/// currently negotiating or streaming; this store is the durable record a
/// restart or an operational query reads from.
#[derive(Clone)]
pub struct StreamStore {
    pool: AnyPool,
}

fn state_code(state: SessionState) -> i32 {
    if state.is_terminal() {
        1
    } else {
        0
    }
}

impl StreamStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, stream: &Stream) -> Result<()> {
        let now = now_unix();
        sqlx::query(
            "INSERT INTO streams (stream_id, call_id, ssrc, channel_id, device_id, kind, start_time, end_time, \
             from_tag, to_tag, cseq, stop, status, registered_in_engine, ext_deadline, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(stream_id, call_id) DO UPDATE SET \
             to_tag = excluded.to_tag, cseq = excluded.cseq, stop = excluded.stop, status = excluded.status, \
             registered_in_engine = excluded.registered_in_engine, ext_deadline = excluded.ext_deadline, \
             updated_at = excluded.updated_at",
        )
        .bind(&stream.stream_id)
        .bind(&stream.call_id)
        .bind(&stream.ssrc)
        .bind(&stream.channel_id)
        .bind(&stream.device_id)
        .bind(stream.kind.digit() as i32)
        .bind(stream.start)
        .bind(stream.end)
        .bind(&stream.from_tag)
        .bind(&stream.to_tag)
        .bind(stream.cseq as i32)
        .bind(stream.stop)
        .bind(state_code(stream.state))
        .bind(stream.registered_in_engine)
        .bind(stream.ext_deadline)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All Streams still marked `Status=0` (pending) at the last save —
    /// the liveness probe's candidate set.
    pub async fn pending(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT stream_id, ssrc FROM streams WHERE status = 0")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>("stream_id"), r.get::<String, _>("ssrc")))
            .collect())
    }

    /// Every distinct stream id ever recorded, terminal or not — the
    /// recording-expiry sweep's candidate set (a `Closed` Stream can still
    /// have MP4 files on disk well after the dialog itself is gone).
    pub async fn all_stream_ids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT stream_id FROM streams").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("stream_id")).collect())
    }
}
