use gb28181_sip_core::manscdp::{CatalogItem, CatalogResponse};

use crate::channel::{Channel, ChannelStatus};

/// One item of the `<Item>` schema, in scope-path order (device, then
/// its channels) so the caller can emit one SIP MESSAGE per item.
pub struct CatalogRow {
    pub device_id: String,
    pub channel_id: String,
    pub name: String,
    pub civil_code: String,
    pub parent_id: String,
    pub status: ChannelStatus,
}

/// Build the flat row list an inbound Catalog query answers with: paginate
/// over the owned Device set (already filtered to online by the caller),
/// and for each Device paginate its Channels.
pub fn catalog_rows(device_id: &str, channels: &[Channel]) -> Vec<CatalogRow> {
    channels
        .iter()
        .map(|c| CatalogRow {
            device_id: device_id.to_string(),
            channel_id: c.channel_id.clone(),
            name: c.name.clone(),
            civil_code: c.civil_code.clone(),
            parent_id: device_id.to_string(),
            status: c.status,
        })
        .collect()
}

/// Emit one [`CatalogResponse`] fragment per row: each matching row becomes
/// one `<Item>`, one SIP MESSAGE per item.
///
/// `SumNum` is fixed at the *true total* across the whole burst and `SN` is
/// echoed unchanged on every fragment, regardless of how many rows are
/// being sent.
pub fn build_catalog_fragments(sn: u32, query_device_id: &str, rows: &[CatalogRow]) -> Vec<CatalogResponse> {
    let sum_num = rows.len() as u32;
    rows.iter()
        .map(|row| {
            let item = CatalogItem {
                device_id: row.channel_id.clone(),
                name: row.name.clone(),
                civil_code: row.civil_code.clone(),
                parental: 0,
                parent_id: row.parent_id.clone(),
                status: row.status.as_str().to_string(),
                ..Default::default()
            };
            CatalogResponse::fragment(sn, query_device_id, sum_num, vec![item])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;

    #[test]
    fn every_fragment_carries_the_same_sn_and_true_sum_num() {
        let channels = vec![
            Channel::new("ch1", "dev1", "Cam 1"),
            Channel::new("ch2", "dev1", "Cam 2"),
            Channel::new("ch3", "dev1", "Cam 3"),
        ];
        let rows = catalog_rows("dev1", &channels);
        let fragments = build_catalog_fragments(42, "dev1", &rows);

        assert_eq!(fragments.len(), 3);
        for f in &fragments {
            assert_eq!(f.sn, 42);
            assert_eq!(f.sum_num, 3);
            assert_eq!(f.device_list.num, 1);
        }
    }
}
