//! MANSCDP XML control bodies: Keepalive, Catalog, RecordInfo, DeviceInfo,
//! DeviceControl, DeviceStatus, MediaStatus — the GB/T-28181 dialect's
//! control-plane XML schema.
//!
//! The wire encoding is GB2312 (decode is tolerant of either GB2312/GB18030
//! or UTF-8); `quick-xml`'s serde integration handles the
//! element structure, `encoding_rs` handles the byte-level transcoding.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Decode a MANSCDP body: UTF-8 first, falling back to GB18030 (a superset
/// of GB2312) if the bytes are not valid UTF-8.
pub fn decode_body(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    let (cow, _, _) = encoding_rs::GB18030.decode(bytes);
    cow.into_owned()
}

/// Encode a MANSCDP body as GB2312-compatible bytes (GB18030 superset; every
/// code point emitted by our own XML templates falls in the GB2312 subset).
pub fn encode_body(xml: &str) -> Vec<u8> {
    let (cow, _, _) = encoding_rs::GB18030.encode(xml);
    cow.into_owned()
}

fn xml_header() -> &'static str {
    "<?xml version=\"1.0\" encoding=\"GB2312\"?>\r\n"
}

fn to_xml<T: Serialize>(value: &T) -> Result<String> {
    let body = quick_xml::se::to_string(value).map_err(|e| Error::InvalidXml(e.to_string()))?;
    Ok(format!("{}{}", xml_header(), body))
}

fn from_xml<T: for<'de> Deserialize<'de>>(xml: &str) -> Result<T> {
    quick_xml::de::from_str(xml).map_err(|e| Error::InvalidXml(e.to_string()))
}

// ---------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "Notify")]
pub struct Keepalive {
    #[serde(rename = "CmdType")]
    pub cmd_type: String,
    #[serde(rename = "SN")]
    pub sn: u32,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "Status")]
    pub status: String,
}

impl Keepalive {
    pub fn new(sn: u32, device_id: impl Into<String>) -> Self {
        Self {
            cmd_type: "Keepalive".to_string(),
            sn,
            device_id: device_id.into(),
            status: "OK".to_string(),
        }
    }

    pub fn to_xml(&self) -> Result<String> {
        to_xml(self)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        from_xml(xml)
    }
}

// ---------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "Query")]
pub struct CatalogQuery {
    #[serde(rename = "CmdType")]
    pub cmd_type: String,
    #[serde(rename = "SN")]
    pub sn: u32,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
}

impl CatalogQuery {
    pub fn new(sn: u32, device_id: impl Into<String>) -> Self {
        Self {
            cmd_type: "Catalog".to_string(),
            sn,
            device_id: device_id.into(),
        }
    }

    pub fn to_xml(&self) -> Result<String> {
        to_xml(self)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        from_xml(xml)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogItem {
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Manufacturer", default)]
    pub manufacturer: String,
    #[serde(rename = "Model", default)]
    pub model: String,
    #[serde(rename = "Owner", default)]
    pub owner: String,
    #[serde(rename = "CivilCode", default)]
    pub civil_code: String,
    #[serde(rename = "Address", default)]
    pub address: String,
    #[serde(rename = "Parental")]
    pub parental: u8,
    #[serde(rename = "ParentID", default)]
    pub parent_id: String,
    #[serde(rename = "SafetyWay", default)]
    pub safety_way: u8,
    #[serde(rename = "RegisterWay", default = "default_register_way")]
    pub register_way: u8,
    #[serde(rename = "Secrecy", default)]
    pub secrecy: u8,
    #[serde(rename = "Status")]
    pub status: String,
}

fn default_register_way() -> u8 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceList {
    #[serde(rename = "@Num")]
    pub num: u32,
    #[serde(rename = "Item", default)]
    pub items: Vec<CatalogItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "Response")]
pub struct CatalogResponse {
    #[serde(rename = "CmdType")]
    pub cmd_type: String,
    #[serde(rename = "SN")]
    pub sn: u32,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "SumNum")]
    pub sum_num: u32,
    #[serde(rename = "DeviceList")]
    pub device_list: DeviceList,
}

impl CatalogResponse {
    /// Build one fragment of a Catalog response burst.
    ///
    /// `SumNum` is the *true total* across the whole burst
    /// and `SN` is echoed unchanged on every fragment — callers must pass
    /// the same `sn`/`sum_num` to every fragment of one query's reply.
    pub fn fragment(
        sn: u32,
        device_id: impl Into<String>,
        sum_num: u32,
        items: Vec<CatalogItem>,
    ) -> Self {
        let num = items.len() as u32;
        Self {
            cmd_type: "Catalog".to_string(),
            sn,
            device_id: device_id.into(),
            sum_num,
            device_list: DeviceList { num, items },
        }
    }

    pub fn to_xml(&self) -> Result<String> {
        to_xml(self)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        from_xml(xml)
    }
}

// ---------------------------------------------------------------------
// RecordInfo
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "Query")]
pub struct RecordInfoQuery {
    #[serde(rename = "CmdType")]
    pub cmd_type: String,
    #[serde(rename = "SN")]
    pub sn: u32,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "StartTime")]
    pub start_time: String,
    #[serde(rename = "EndTime")]
    pub end_time: String,
    #[serde(rename = "Secrecy", default)]
    pub secrecy: u8,
    #[serde(rename = "Type", default = "default_record_type")]
    pub record_type: String,
}

fn default_record_type() -> String {
    "all".to_string()
}

impl RecordInfoQuery {
    pub fn to_xml(&self) -> Result<String> {
        to_xml(self)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        from_xml(xml)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecordItem {
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "FilePath", default)]
    pub file_path: String,
    #[serde(rename = "Address", default)]
    pub address: String,
    #[serde(rename = "StartTime")]
    pub start_time: String,
    #[serde(rename = "EndTime")]
    pub end_time: String,
    #[serde(rename = "Secrecy", default)]
    pub secrecy: u8,
    #[serde(rename = "Type", default = "default_record_type")]
    pub record_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordList {
    #[serde(rename = "@Num")]
    pub num: u32,
    #[serde(rename = "Item", default)]
    pub items: Vec<RecordItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "Response")]
pub struct RecordInfoResponse {
    #[serde(rename = "CmdType")]
    pub cmd_type: String,
    #[serde(rename = "SN")]
    pub sn: u32,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "SumNum")]
    pub sum_num: u32,
    #[serde(rename = "RecordList")]
    pub record_list: RecordList,
}

impl RecordInfoResponse {
    pub fn fragment(
        sn: u32,
        device_id: impl Into<String>,
        sum_num: u32,
        items: Vec<RecordItem>,
    ) -> Self {
        let num = items.len() as u32;
        Self {
            cmd_type: "RecordInfo".to_string(),
            sn,
            device_id: device_id.into(),
            name: String::new(),
            sum_num,
            record_list: RecordList { num, items },
        }
    }

    pub fn to_xml(&self) -> Result<String> {
        to_xml(self)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        from_xml(xml)
    }
}

// ---------------------------------------------------------------------
// DeviceInfo / DeviceStatus queries, DeviceControl, MediaStatus notify
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "Query")]
pub struct SimpleQuery {
    #[serde(rename = "CmdType")]
    pub cmd_type: String,
    #[serde(rename = "SN")]
    pub sn: u32,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
}

impl SimpleQuery {
    pub fn device_info(sn: u32, device_id: impl Into<String>) -> Self {
        Self {
            cmd_type: "DeviceInfo".to_string(),
            sn,
            device_id: device_id.into(),
        }
    }

    pub fn device_status(sn: u32, device_id: impl Into<String>) -> Self {
        Self {
            cmd_type: "DeviceStatus".to_string(),
            sn,
            device_id: device_id.into(),
        }
    }

    pub fn to_xml(&self) -> Result<String> {
        to_xml(self)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        from_xml(xml)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "Control")]
pub struct DeviceControl {
    #[serde(rename = "CmdType")]
    pub cmd_type: String,
    #[serde(rename = "SN")]
    pub sn: u32,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "PTZCmd", skip_serializing_if = "Option::is_none")]
    pub ptz_cmd: Option<String>,
}

impl DeviceControl {
    pub fn ptz(sn: u32, device_id: impl Into<String>, ptz_cmd: impl Into<String>) -> Self {
        Self {
            cmd_type: "DeviceControl".to_string(),
            sn,
            device_id: device_id.into(),
            ptz_cmd: Some(ptz_cmd.into()),
        }
    }

    pub fn to_xml(&self) -> Result<String> {
        to_xml(self)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        from_xml(xml)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "Notify")]
pub struct MediaStatusNotify {
    #[serde(rename = "CmdType")]
    pub cmd_type: String,
    #[serde(rename = "SN")]
    pub sn: u32,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "NotifyType")]
    pub notify_type: String,
}

impl MediaStatusNotify {
    pub fn to_xml(&self) -> Result<String> {
        to_xml(self)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        from_xml(xml)
    }
}

/// Sniffs just the `CmdType` element out of an inbound MESSAGE body, so a
/// dispatcher can pick which concrete query/notify type to parse the rest
/// of the body as without committing to one up front.
#[derive(Debug, Clone, Deserialize)]
pub struct CmdTypeProbe {
    #[serde(rename = "CmdType")]
    pub cmd_type: String,
}

impl CmdTypeProbe {
    pub fn from_xml(xml: &str) -> Result<Self> {
        from_xml(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_type_probe_reads_the_tag_regardless_of_root_element_name() {
        let keepalive = Keepalive::new(1, "34020000001320000001").to_xml().unwrap();
        assert_eq!(CmdTypeProbe::from_xml(&keepalive).unwrap().cmd_type, "Keepalive");

        let catalog = CatalogQuery::new(2, "34020000001320000001").to_xml().unwrap();
        assert_eq!(CmdTypeProbe::from_xml(&catalog).unwrap().cmd_type, "Catalog");
    }

    #[test]
    fn keepalive_round_trips() {
        let k = Keepalive::new(10, "34020000001320000001");
        let xml = k.to_xml().unwrap();
        assert!(xml.contains("<CmdType>Keepalive</CmdType>"));
        let parsed = Keepalive::from_xml(&xml).unwrap();
        assert_eq!(parsed.sn, 10);
        assert_eq!(parsed.device_id, "34020000001320000001");
    }

    #[test]
    fn catalog_fragment_carries_matching_sn_and_true_sum_num() {
        let item = CatalogItem {
            device_id: "34020000001310000001".to_string(),
            name: "Camera 1".to_string(),
            status: "ON".to_string(),
            ..Default::default()
        };
        let frag1 = CatalogResponse::fragment(7, "34020000001320000001", 2, vec![item.clone()]);
        let frag2 = CatalogResponse::fragment(7, "34020000001320000001", 2, vec![item]);
        assert_eq!(frag1.sn, frag2.sn);
        assert_eq!(frag1.sum_num, 2);
        assert_eq!(frag2.sum_num, 2);
        assert_eq!(frag1.device_list.num, 1);

        let xml = frag1.to_xml().unwrap();
        let parsed = CatalogResponse::from_xml(&xml).unwrap();
        assert_eq!(parsed.device_list.items[0].device_id, "34020000001310000001");
    }

    #[test]
    fn body_decode_accepts_utf8_and_gb18030() {
        let ascii = decode_body(b"<Notify></Notify>");
        assert_eq!(ascii, "<Notify></Notify>");

        let gb_bytes = encode_body("<Name>摄像机</Name>");
        let decoded = decode_body(&gb_bytes);
        assert_eq!(decoded, "<Name>摄像机</Name>");
    }
}
