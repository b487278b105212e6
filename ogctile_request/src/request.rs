//! Per-operation parameter parsing and validation (§4.6 "Key validation rules"). Each
//! `parse_*` function validates in the order the spec fixes and returns the first failing
//! check as the `CoreError` that becomes the response's `ServiceException`.

use crate::kvp::ParamMap;
use ogctile_core::bbox::BoundingBox;
use ogctile_core::crs::Crs;
use ogctile_core::error::CoreError;
use ogctile_core::format::TileFormat;
use ogctile_pyramid::catalogue::Catalogue;
use ogctile_pyramid::layer::Layer;
use std::sync::Arc;

pub const SUPPORTED_WMS_VERSIONS: &[&str] = &["1.1.1", "1.3.0"];
pub const SUPPORTED_WMTS_VERSION: &str = "1.0.0";

/// WMS version negotiation (§4.6): a version higher than anything we support negotiates
/// down to the highest we support; lower than anything negotiates up to the lowest.
#[must_use]
pub fn negotiate_wms_version(requested: Option<&str>) -> &'static str {
	let Some(requested) = requested else {
		return SUPPORTED_WMS_VERSIONS[SUPPORTED_WMS_VERSIONS.len() - 1];
	};
	if SUPPORTED_WMS_VERSIONS.contains(&requested) {
		return SUPPORTED_WMS_VERSIONS.iter().find(|v| **v == requested).unwrap();
	}
	if requested > SUPPORTED_WMS_VERSIONS[SUPPORTED_WMS_VERSIONS.len() - 1] {
		SUPPORTED_WMS_VERSIONS[SUPPORTED_WMS_VERSIONS.len() - 1]
	} else {
		SUPPORTED_WMS_VERSIONS[0]
	}
}

fn get_required<'a>(params: &'a ParamMap, name: &str) -> Result<&'a str, CoreError> {
	params.get(name).filter(|v| !v.is_empty()).ok_or_else(|| CoreError::MissingParameter(name.to_uppercase()))
}

fn invalid(name: &str, reason: impl Into<String>) -> CoreError {
	CoreError::InvalidParameter { name: name.to_uppercase(), reason: reason.into() }
}

pub struct GetMapRequest {
	pub layer: Arc<Layer>,
	pub style_id: String,
	pub crs: Crs,
	pub bbox: BoundingBox<f64>,
	pub width: u32,
	pub height: u32,
	pub format: TileFormat,
	pub transparent: bool,
	pub version: &'static str,
}

pub fn parse_get_map(params: &ParamMap, catalogue: &Catalogue, services_layer_limit: usize) -> anyhow::Result<GetMapRequest> {
	let version = negotiate_wms_version(params.get("version"));

	let layers_param = get_required(params, "layers")?;
	let layer_ids: Vec<&str> = layers_param.split(',').collect();
	if layer_ids.len() > services_layer_limit {
		return Err(invalid("LAYERS", format!("requested {} layers, limit is {services_layer_limit}", layer_ids.len())).into());
	}
	let layer_id = layer_ids.first().copied().ok_or_else(|| CoreError::MissingParameter("LAYERS".into()))?;
	let layer = catalogue.layer(layer_id).ok_or_else(|| CoreError::UnknownLayer(layer_id.to_string()))?.clone();
	if !layer.effective_wms_authorised() {
		return Err(CoreError::UnknownLayer(layer_id.to_string()).into());
	}

	let styles_param = params.get("styles").unwrap_or_default();
	let style_id = styles_param.split(',').next().unwrap_or_default().to_string();
	if layer.style(&style_id).is_none() {
		return Err(CoreError::UnknownStyle(style_id).into());
	}

	let crs_code = params.get("crs").or_else(|| params.get("srs")).ok_or_else(|| CoreError::MissingParameter("CRS".into()))?;
	let crs_allowed = layer.wms_crs_list.iter().any(|c| c.eq_ignore_ascii_case(crs_code))
		|| catalogue.services.global_crs_list.iter().any(|c| c.eq_ignore_ascii_case(crs_code))
		|| layer
			.wms_crs_list
			.iter()
			.any(|c| catalogue.services.equivalence_table.equivalent(c, crs_code));
	if !crs_allowed {
		return Err(CoreError::UnknownCrs(crs_code.to_string()).into());
	}
	let crs = Crs::resolve(crs_code)?;

	let bbox_param = get_required(params, "bbox")?;
	let mut bbox = parse_bbox(bbox_param).map_err(|reason| invalid("BBOX", reason))?;
	if version == "1.3.0" && crs.wire_axis_is_lat_lon() {
		bbox = bbox.swap_axes();
	}
	if !bbox.is_valid() || bbox.is_empty() {
		return Err(invalid("BBOX", "xmin must be < xmax and ymin must be < ymax").into());
	}

	let width = parse_positive_u32(get_required(params, "width")?).map_err(|r| invalid("WIDTH", r))?;
	let height = parse_positive_u32(get_required(params, "height")?).map_err(|r| invalid("HEIGHT", r))?;
	if width > catalogue.services.max_width || height > catalogue.services.max_height {
		return Err(invalid("WIDTH", format!("exceeds the server's {}x{} limit", catalogue.services.max_width, catalogue.services.max_height)).into());
	}

	let format_param = get_required(params, "format")?;
	let format = TileFormat::parse(format_param).ok_or_else(|| CoreError::UnknownFormat(format_param.to_string()))?;
	if !catalogue.services.format_list.contains(&format) {
		return Err(CoreError::UnknownFormat(format_param.to_string()).into());
	}

	let transparent = params.get_lower("transparent").as_deref() == Some("true");

	Ok(GetMapRequest { layer, style_id, crs, bbox, width, height, format, transparent, version })
}

/// WMS `GetFeatureInfo` (§4.6): the same parameter set as `GetMap`, plus `QUERY_LAYERS`,
/// `INFO_FORMAT` and the queried pixel, given as `X`/`Y` (1.1.1) or `I`/`J` (1.3.0).
pub struct GetFeatureInfoRequest {
	pub map: GetMapRequest,
	pub query_layers: Vec<Arc<Layer>>,
	pub info_format: String,
	pub pixel_x: u32,
	pub pixel_y: u32,
}

pub fn parse_get_feature_info(params: &ParamMap, catalogue: &Catalogue, services_layer_limit: usize) -> anyhow::Result<GetFeatureInfoRequest> {
	let map = parse_get_map(params, catalogue, services_layer_limit)?;

	let query_layers_param = get_required(params, "query_layers")?;
	let query_layers = query_layers_param
		.split(',')
		.map(|id| catalogue.layer(id).cloned().ok_or_else(|| CoreError::UnknownLayer(id.to_string())))
		.collect::<Result<Vec<_>, _>>()?;

	let info_format = params.get("info_format").unwrap_or("text/plain").to_string();

	let x_param = params.get("x").or_else(|| params.get("i")).ok_or_else(|| CoreError::MissingParameter("X".into()))?;
	let y_param = params.get("y").or_else(|| params.get("j")).ok_or_else(|| CoreError::MissingParameter("Y".into()))?;
	let pixel_x = parse_u32(x_param).map_err(|r| invalid("X", r))?;
	let pixel_y = parse_u32(y_param).map_err(|r| invalid("Y", r))?;
	if pixel_x >= map.width || pixel_y >= map.height {
		return Err(invalid("X", format!("must lie within the requested {}x{} image", map.width, map.height)).into());
	}

	Ok(GetFeatureInfoRequest { map, query_layers, info_format, pixel_x, pixel_y })
}

pub struct GetTileRequest {
	pub layer: Arc<Layer>,
	pub style_id: String,
	pub format: TileFormat,
	pub tile_matrix_set: String,
	pub tile_matrix: String,
	pub tile_row: i64,
	pub tile_col: i64,
	pub nodata_as_http_status: bool,
}

pub fn parse_get_tile(params: &ParamMap, catalogue: &Catalogue) -> anyhow::Result<GetTileRequest> {
	let version = params.get("version").ok_or_else(|| CoreError::MissingParameter("VERSION".into()))?;
	if version != SUPPORTED_WMTS_VERSION {
		return Err(invalid("VERSION", format!("only {SUPPORTED_WMTS_VERSION} is supported")).into());
	}

	let layer_id = get_required(params, "layer")?;
	let layer = catalogue.layer(layer_id).ok_or_else(|| CoreError::UnknownLayer(layer_id.to_string()))?.clone();
	if !layer.wmts_authorised {
		return Err(CoreError::UnknownLayer(layer_id.to_string()).into());
	}

	let style_id = params.get("style").unwrap_or_default().to_string();
	if layer.style(&style_id).is_none() {
		return Err(CoreError::UnknownStyle(style_id).into());
	}

	let format_param = get_required(params, "format")?;
	let format = TileFormat::parse(format_param).ok_or_else(|| CoreError::UnknownFormat(format_param.to_string()))?;

	let tile_matrix_set = get_required(params, "tilematrixset")?.to_string();
	if layer.pyramid.tms.id != tile_matrix_set {
		return Err(invalid("TILEMATRIXSET", format!("layer does not publish '{tile_matrix_set}'")).into());
	}

	let tile_matrix = get_required(params, "tilematrix")?.to_string();
	if layer.pyramid.level(&tile_matrix).is_none() {
		return Err(invalid("TILEMATRIX", format!("no such tile matrix id '{tile_matrix}'")).into());
	}

	let tile_row = parse_i64(get_required(params, "tilerow")?).map_err(|r| invalid("TILEROW", r))?;
	let tile_col = parse_i64(get_required(params, "tilecol")?).map_err(|r| invalid("TILECOL", r))?;
	let nodata_as_http_status = params.get_lower("nodataashttpstatus").as_deref() == Some("1") || params.get_lower("nodataashttpstatus").as_deref() == Some("true");

	Ok(GetTileRequest { layer, style_id, format, tile_matrix_set, tile_matrix, tile_row, tile_col, nodata_as_http_status })
}

fn parse_bbox(s: &str) -> Result<BoundingBox<f64>, String> {
	let parts: Vec<&str> = s.split(',').collect();
	if parts.len() != 4 {
		return Err(format!("expected 4 comma-separated values, got {}", parts.len()));
	}
	let mut v = [0f64; 4];
	for (i, p) in parts.iter().enumerate() {
		v[i] = p.trim().parse().map_err(|_| format!("'{p}' is not a finite number"))?;
		if !v[i].is_finite() {
			return Err(format!("'{p}' is not finite"));
		}
	}
	Ok(BoundingBox::new(v[0], v[1], v[2], v[3]))
}

fn parse_positive_u32(s: &str) -> Result<u32, String> {
	let v: i64 = s.parse().map_err(|_| format!("'{s}' is not an integer"))?;
	if v <= 0 {
		return Err("must be positive".into());
	}
	u32::try_from(v).map_err(|_| "too large".into())
}

fn parse_i64(s: &str) -> Result<i64, String> {
	s.parse().map_err(|_| format!("'{s}' is not an integer"))
}

fn parse_u32(s: &str) -> Result<u32, String> {
	s.parse().map_err(|_| format!("'{s}' is not a non-negative integer"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use ogctile_core::blob::Blob;
	use ogctile_pyramid::layer::GetFeatureInfoConfig;
	use ogctile_pyramid::level::Level;
	use ogctile_pyramid::pyramid::Pyramid;
	use ogctile_pyramid::services::ServicesConfig;
	use ogctile_pyramid::source::RemoteTileSource;
	use ogctile_pyramid::style::Style;
	use ogctile_pyramid::tile_matrix::{TileLimits, TileMatrix, TileMatrixSet};

	#[test]
	fn negotiates_up_to_the_lowest_supported_version() {
		assert_eq!(negotiate_wms_version(Some("1.0.0")), "1.1.1");
	}

	#[test]
	fn negotiates_down_to_the_highest_supported_version() {
		assert_eq!(negotiate_wms_version(Some("9.9.9")), "1.3.0");
	}

	#[test]
	fn missing_version_defaults_to_the_highest_supported() {
		assert_eq!(negotiate_wms_version(None), "1.3.0");
	}

	#[test]
	fn exact_version_passes_through() {
		assert_eq!(negotiate_wms_version(Some("1.1.1")), "1.1.1");
	}

	#[test]
	fn bbox_requires_exactly_four_finite_numbers() {
		assert!(parse_bbox("0,0,1,1").is_ok());
		assert!(parse_bbox("0,0,1").is_err());
		assert!(parse_bbox("0,0,1,nan_literal").is_err());
	}

	fn sample_catalogue() -> Catalogue {
		let matrix = TileMatrix::new("0", 156_543.033_928_040_97, -20_037_508.342_789_244, 20_037_508.342_789_244, 256, 256, 1, 1);
		let limits = TileLimits::full(&matrix);
		let crs = Arc::new(Crs::resolve("epsg:3857").unwrap());
		let tms = Arc::new(TileMatrixSet::new("PM", crs, vec![matrix.clone()]));
		let source = Arc::new(RemoteTileSource::new("https://example.test/{col}/{row}.png"));
		let level = Level::new(matrix, limits, 3, TileFormat::Png, vec![0.0, 0.0, 0.0], source, Blob::new_empty());
		let pyramid = Arc::new(Pyramid::new(tms, TileFormat::Png, 3, false, false, vec![level]));
		let layer = Arc::new(Layer {
			id: "ortho".into(),
			title: "Ortho".into(),
			abstract_text: String::new(),
			keywords: Vec::new(),
			pyramid,
			styles: vec![Style { id: "normal".into(), titles: vec!["Normal".into()], abstracts: Vec::new(), keywords: Vec::new(), legend_urls: Vec::new(), palette: None }],
			min_res: 1.0,
			max_res: 1_000_000.0,
			wms_crs_list: vec!["epsg:3857".into()],
			geographic_bbox: BoundingBox::new(-180.0, -85.0, 180.0, 85.0),
			native_bbox: BoundingBox::new(-20_037_508.34, -20_037_508.34, 20_037_508.34, 20_037_508.34),
			metadata_urls: Vec::new(),
			wms_authorised: true,
			wmts_authorised: true,
			gfi_config: GetFeatureInfoConfig::default(),
		});
		Catalogue::new(Vec::new(), vec![layer], ServicesConfig::default())
	}

	fn sample_get_feature_info_params() -> ParamMap {
		ParamMap::parse(
			"SERVICE=WMS&VERSION=1.1.1&REQUEST=GetFeatureInfo&LAYERS=ortho&STYLES=&CRS=EPSG:3857&BBOX=-20037508.34,-20037508.34,20037508.34,20037508.34&WIDTH=256&HEIGHT=256&FORMAT=image/png&QUERY_LAYERS=ortho&INFO_FORMAT=text/plain&X=128&Y=128",
		)
	}

	#[test]
	fn parses_a_well_formed_get_feature_info_request() {
		let catalogue = sample_catalogue();
		let request = parse_get_feature_info(&sample_get_feature_info_params(), &catalogue, catalogue.services.layer_limit).unwrap();
		assert_eq!(request.query_layers.len(), 1);
		assert_eq!(request.query_layers[0].id, "ortho");
		assert_eq!(request.info_format, "text/plain");
		assert_eq!((request.pixel_x, request.pixel_y), (128, 128));
	}

	#[test]
	fn accepts_i_j_as_aliases_for_x_y() {
		let catalogue = sample_catalogue();
		let params = ParamMap::parse(
			"SERVICE=WMS&VERSION=1.3.0&REQUEST=GetFeatureInfo&LAYERS=ortho&STYLES=&CRS=EPSG:3857&BBOX=-20037508.34,-20037508.34,20037508.34,20037508.34&WIDTH=256&HEIGHT=256&FORMAT=image/png&QUERY_LAYERS=ortho&I=10&J=20",
		);
		let request = parse_get_feature_info(&params, &catalogue, catalogue.services.layer_limit).unwrap();
		assert_eq!((request.pixel_x, request.pixel_y), (10, 20));
	}

	#[test]
	fn rejects_a_pixel_outside_the_requested_image() {
		let catalogue = sample_catalogue();
		let params = ParamMap::parse(
			"SERVICE=WMS&VERSION=1.1.1&REQUEST=GetFeatureInfo&LAYERS=ortho&STYLES=&CRS=EPSG:3857&BBOX=-20037508.34,-20037508.34,20037508.34,20037508.34&WIDTH=256&HEIGHT=256&FORMAT=image/png&QUERY_LAYERS=ortho&X=999&Y=0",
		);
		assert!(parse_get_feature_info(&params, &catalogue, catalogue.services.layer_limit).is_err());
	}

	#[test]
	fn rejects_an_unknown_query_layer() {
		let catalogue = sample_catalogue();
		let params = ParamMap::parse(
			"SERVICE=WMS&VERSION=1.1.1&REQUEST=GetFeatureInfo&LAYERS=ortho&STYLES=&CRS=EPSG:3857&BBOX=-20037508.34,-20037508.34,20037508.34,20037508.34&WIDTH=256&HEIGHT=256&FORMAT=image/png&QUERY_LAYERS=nope&X=0&Y=0",
		);
		assert!(parse_get_feature_info(&params, &catalogue, catalogue.services.layer_limit).is_err());
	}
}
