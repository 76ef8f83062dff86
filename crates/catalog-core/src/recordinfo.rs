use chrono::{DateTime, Utc};
use gb28181_sip_core::manscdp::{RecordInfoResponse, RecordItem};

/// Recording metadata as reported by a device (RecordInfo).
pub struct RecordRow {
    pub channel_id: String,
    pub name: String,
    pub file_path: String,
    pub start_time: i64,
    pub end_time: i64,
}

/// Translate a Unix-seconds window to the device-local `YYYY-MM-DDThh:mm:ss`
/// format GB/T-28181 RecordInfo queries use.
pub fn format_device_time(unix_seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix_seconds, 0)
        .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap())
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

pub fn build_recordinfo_fragments(sn: u32, device_id: &str, rows: &[RecordRow]) -> Vec<RecordInfoResponse> {
    let sum_num = rows.len() as u32;
    rows.iter()
        .map(|row| {
            let item = RecordItem {
                device_id: row.channel_id.clone(),
                name: row.name.clone(),
                file_path: row.file_path.clone(),
                start_time: format_device_time(row.start_time),
                end_time: format_device_time(row.end_time),
                ..Default::default()
            };
            RecordInfoResponse::fragment(sn, device_id, sum_num, vec![item])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_time_uses_iso_like_local_format() {
        let text = format_device_time(0);
        assert_eq!(text, "1970-01-01T00:00:00");
    }

    #[test]
    fn fragments_echo_sn_and_true_total() {
        let rows = vec![
            RecordRow {
                channel_id: "ch1".into(),
                name: "seg1".into(),
                file_path: "/rec/1.mp4".into(),
                start_time: 0,
                end_time: 60,
            },
            RecordRow {
                channel_id: "ch1".into(),
                name: "seg2".into(),
                file_path: "/rec/2.mp4".into(),
                start_time: 60,
                end_time: 120,
            },
        ];
        let fragments = build_recordinfo_fragments(9, "dev1", &rows);
        assert_eq!(fragments.len(), 2);
        assert!(fragments.iter().all(|f| f.sn == 9 && f.sum_num == 2));
    }
}
