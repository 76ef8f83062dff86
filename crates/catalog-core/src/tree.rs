use std::collections::HashMap;

use gb28181_sip_core::manscdp::CatalogItem;

/// One entry of the externally-sourced NVR list the cascade-publish tree is
/// built from.
#[derive(Debug, Clone)]
pub struct NvrEntry {
    pub device_id: String,
    pub name: String,
    pub district_code: String,
}

/// One entry of the externally-sourced district list.
#[derive(Debug, Clone)]
pub struct DistrictEntry {
    pub code: String,
    pub name: String,
    pub city_code: String,
    pub city_name: String,
    pub street_name: String,
}

/// Acquisition of the NVR/district lists that seed the cascade-publish
/// catalog tree is pluggable: upstream deployments source these from a
/// provisioning system, a static file, or nothing at all. The tree-building
/// algorithm in [`build_tree`] is fixed; only where the two lists come from
/// varies.
pub trait CityDistrictSource: Send + Sync {
    fn nvrs(&self) -> Vec<NvrEntry>;
    fn districts(&self) -> Vec<DistrictEntry>;
}

/// No external provisioning configured: the tree is just the channels
/// themselves with no city/district wrapping. Lets the catalog service run
/// standalone.
pub struct EmptySource;

impl CityDistrictSource for EmptySource {
    fn nvrs(&self) -> Vec<NvrEntry> {
        Vec::new()
    }
    fn districts(&self) -> Vec<DistrictEntry> {
        Vec::new()
    }
}

/// A static, config-file-backed list for deployments whose district
/// topology doesn't change at runtime.
pub struct StaticSource {
    nvrs: Vec<NvrEntry>,
    districts: Vec<DistrictEntry>,
}

impl StaticSource {
    pub fn new(nvrs: Vec<NvrEntry>, districts: Vec<DistrictEntry>) -> Self {
        Self { nvrs, districts }
    }
}

impl CityDistrictSource for StaticSource {
    fn nvrs(&self) -> Vec<NvrEntry> {
        self.nvrs.clone()
    }
    fn districts(&self) -> Vec<DistrictEntry> {
        self.districts.clone()
    }
}

/// city → district → street → channel. The street dimension
/// is held in a map keyed by `districtName + streetName`, matching the
/// original's flat lookup rather than a further nested level.
pub fn build_tree(source: &dyn CityDistrictSource, root_device_id: &str) -> Vec<CatalogItem> {
    let districts_by_code: HashMap<String, DistrictEntry> = source
        .districts()
        .into_iter()
        .map(|d| (d.code.clone(), d))
        .collect();

    let mut streets: HashMap<String, CatalogItem> = HashMap::new();
    let mut cities: HashMap<String, CatalogItem> = HashMap::new();
    let mut items = Vec::new();

    for nvr in source.nvrs() {
        let Some(district) = districts_by_code.get(&nvr.district_code) else {
            continue;
        };

        let city_item = cities.entry(district.city_code.clone()).or_insert_with(|| CatalogItem {
            device_id: district.city_code.clone(),
            name: district.city_name.clone(),
            parental: 1,
            parent_id: root_device_id.to_string(),
            register_way: 1,
            status: "ON".to_string(),
            ..Default::default()
        });
        if items.iter().all(|i: &CatalogItem| i.device_id != city_item.device_id) {
            items.push(city_item.clone());
        }

        let district_item = CatalogItem {
            device_id: district.code.clone(),
            name: district.name.clone(),
            parental: 1,
            parent_id: district.city_code.clone(),
            register_way: 1,
            status: "ON".to_string(),
            ..Default::default()
        };
        if items.iter().all(|i| i.device_id != district_item.device_id) {
            items.push(district_item.clone());
        }

        let street_key = format!("{}{}", district.name, district.street_name);
        let street_item = streets.entry(street_key).or_insert_with(|| CatalogItem {
            device_id: format!("{}-street", district.code),
            name: district.street_name.clone(),
            parental: 1,
            parent_id: district.code.clone(),
            register_way: 1,
            status: "ON".to_string(),
            ..Default::default()
        });
        if items.iter().all(|i| i.device_id != street_item.device_id) {
            items.push(street_item.clone());
        }

        items.push(CatalogItem {
            device_id: nvr.device_id.clone(),
            name: nvr.name.clone(),
            parental: 0,
            parent_id: street_item.device_id.clone(),
            register_way: 1,
            status: "ON".to_string(),
            ..Default::default()
        });
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_produces_no_tree() {
        let items = build_tree(&EmptySource, "root");
        assert!(items.is_empty());
    }

    #[test]
    fn nvr_parent_chain_reaches_city_through_district_and_street() {
        let source = StaticSource::new(
            vec![NvrEntry {
                device_id: "nvr1".into(),
                name: "NVR One".into(),
                district_code: "d1".into(),
            }],
            vec![DistrictEntry {
                code: "d1".into(),
                name: "District One".into(),
                city_code: "c1".into(),
                city_name: "City One".into(),
                street_name: "Main St".into(),
            }],
        );
        let items = build_tree(&source, "root");
        let nvr_item = items.iter().find(|i| i.device_id == "nvr1").unwrap();
        let street_item = items.iter().find(|i| i.device_id == nvr_item.parent_id).unwrap();
        let district_item = items.iter().find(|i| i.device_id == street_item.parent_id).unwrap();
        assert_eq!(district_item.device_id, "d1");
        assert_eq!(district_item.parent_id, "c1");
    }
}
