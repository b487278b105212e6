//! WMS/WMTS service identification metadata plus the server-wide limits and CRS tables
//! every request is validated against.

use ogctile_core::crs::CrsEquivalenceTable;

#[derive(Debug, Clone)]
pub struct ServiceIdentification {
	pub title: String,
	pub abstract_text: String,
	pub keywords: Vec<String>,
	pub fees: String,
	pub access_constraints: String,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceProvider {
	pub name: String,
	pub site: String,
	pub contact: String,
}

#[derive(Debug, Clone)]
pub struct ServicesConfig {
	pub wms: ServiceIdentification,
	pub wmts: ServiceIdentification,
	pub provider: ServiceProvider,
	pub format_list: Vec<ogctile_core::format::TileFormat>,
	pub global_crs_list: Vec<String>,
	pub layer_limit: usize,
	pub max_width: u32,
	pub max_height: u32,
	pub inspire: bool,
	pub equivalence_table: CrsEquivalenceTable,
	pub restricted_crs_list: Vec<String>,
	pub feature_post_enabled: bool,
}

impl Default for ServicesConfig {
	fn default() -> Self {
		ServicesConfig {
			wms: ServiceIdentification {
				title: String::new(),
				abstract_text: String::new(),
				keywords: Vec::new(),
				fees: "none".into(),
				access_constraints: "none".into(),
			},
			wmts: ServiceIdentification {
				title: String::new(),
				abstract_text: String::new(),
				keywords: Vec::new(),
				fees: "none".into(),
				access_constraints: "none".into(),
			},
			provider: ServiceProvider::default(),
			format_list: vec![
				ogctile_core::format::TileFormat::Png,
				ogctile_core::format::TileFormat::Jpeg,
				ogctile_core::format::TileFormat::Tiff,
			],
			global_crs_list: vec!["epsg:4326".into(), "epsg:3857".into()],
			layer_limit: 10,
			max_width: 4096,
			max_height: 4096,
			inspire: false,
			equivalence_table: CrsEquivalenceTable::default(),
			restricted_crs_list: Vec::new(),
			feature_post_enabled: true,
		}
	}
}
