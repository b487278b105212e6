//! A published layer: a pyramid plus the styles, CRS list and metadata WMS/WMTS advertise
//! for it, and the resolution window a `GetMap` request is validated against.

use crate::pyramid::Pyramid;
use crate::style::Style;
use ogctile_core::bbox::BoundingBox;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct GetFeatureInfoConfig {
	/// Delegate-to-upstream URL template for the WMTS `GetFeatureInfo` path (§9 Open
	/// Question); `None` means "respond 501".
	pub upstream_url_template: Option<String>,
}

pub struct Layer {
	pub id: String,
	pub title: String,
	pub abstract_text: String,
	pub keywords: Vec<String>,
	pub pyramid: Arc<Pyramid>,
	pub styles: Vec<Style>,
	pub min_res: f64,
	pub max_res: f64,
	pub wms_crs_list: Vec<String>,
	pub geographic_bbox: BoundingBox<f64>,
	pub native_bbox: BoundingBox<f64>,
	pub metadata_urls: Vec<String>,
	pub wms_authorised: bool,
	pub wmts_authorised: bool,
	pub gfi_config: GetFeatureInfoConfig,
}

impl Layer {
	#[must_use]
	pub fn default_style(&self) -> Option<&Style> {
		self.styles.first()
	}

	#[must_use]
	pub fn style(&self, id: &str) -> Option<&Style> {
		if id.is_empty() {
			return self.default_style();
		}
		self.styles.iter().find(|s| s.id == id)
	}

	/// Per the §3.2 invariant: a layer whose pyramid has any on-demand level must disable
	/// WMS regardless of what the catalogue loader declared, since on-demand levels can
	/// reject `best_level` with `NoSuitableLevel` in ways WMS's synchronous contract can't
	/// gracefully represent.
	#[must_use]
	pub fn effective_wms_authorised(&self) -> bool {
		self.wms_authorised && !self.pyramid.on_demand
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::level::Level;
	use crate::source::slab::{SlabLayout, SlabTileSource};
	use crate::tile_matrix::{TileLimits, TileMatrix, TileMatrixSet};
	use ogctile_core::blob::Blob;
	use ogctile_core::crs::Crs;
	use ogctile_core::format::TileFormat;

	fn sample_layer(on_demand: bool) -> Layer {
		let crs = Arc::new(Crs::resolve("EPSG:3857").unwrap());
		let tm = TileMatrix::new("0", 1.0, 0.0, 0.0, 256, 256, 10, 10);
		let limits = TileLimits::full(&tm);
		let source = Arc::new(SlabTileSource::new("/tmp/x", SlabLayout { slab_width: 8, slab_height: 8, path_depth: 1 }));
		let level = Level::new(tm.clone(), limits, 3, TileFormat::Png, vec![0.0], source, Blob::new_empty());
		let tms = Arc::new(TileMatrixSet::new("TMS", crs, vec![tm]));
		let pyramid = Arc::new(Pyramid::new(tms, TileFormat::Png, 3, false, on_demand, vec![level]));
		Layer {
			id: "orthos".into(),
			title: "Orthos".into(),
			abstract_text: String::new(),
			keywords: Vec::new(),
			pyramid,
			styles: vec![Style {
				id: "normal".into(),
				titles: vec!["Normal".into()],
				abstracts: Vec::new(),
				keywords: Vec::new(),
				legend_urls: Vec::new(),
				palette: None,
			}],
			min_res: 0.5,
			max_res: 100.0,
			wms_crs_list: vec!["epsg:3857".into()],
			geographic_bbox: BoundingBox::new(-5.0, 41.0, 11.0, 51.0),
			native_bbox: BoundingBox::new(0.0, 0.0, 2560.0, 2560.0),
			metadata_urls: Vec::new(),
			wms_authorised: true,
			wmts_authorised: true,
			gfi_config: GetFeatureInfoConfig::default(),
		}
	}

	#[test]
	fn empty_style_slot_resolves_to_default() {
		let layer = sample_layer(false);
		assert_eq!(layer.style("").unwrap().id, "normal");
	}

	#[test]
	fn on_demand_pyramid_disables_wms_regardless_of_catalogue_flag() {
		let layer = sample_layer(true);
		assert!(!layer.effective_wms_authorised());
	}
}
