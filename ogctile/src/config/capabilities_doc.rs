//! Serialises the three `GetCapabilities` documents (WMS 1.1.1, WMS 1.3.0, WMTS 1.0.0) from
//! the loaded catalogue, with `]HOSTNAME[`/`]HOSTNAME/PATH[` placeholders standing in for
//! the public base URL wherever an `OnlineResource` would otherwise need the request's own
//! host (§4.7). These are built once at startup and fed straight into
//! `ogctile_request::capabilities::CapabilitiesTemplate::build`.

use ogctile_core::bbox::BoundingBox;
use ogctile_core::crs::Crs;
use ogctile_pyramid::catalogue::Catalogue;
use ogctile_pyramid::layer::Layer;
use std::fmt::Write as _;

fn escape(value: &str) -> String {
	value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// §4.7 "Bounding-box emission": reprojects `layer`'s geographic bbox into `crs_code`,
/// cropping to the CRS's definition area first and swapping axes for EPSG geographic
/// CRSes. Returns `None` if the CRS doesn't resolve or reprojection fails for every
/// corner, in which case the caller skips emitting a bbox for that `(layer, crs)` pair.
fn reprojected_layer_bbox(layer: &Layer, crs_code: &str) -> Option<(Crs, BoundingBox<f64>)> {
	let crs = Crs::resolve(crs_code).ok()?;
	let cropped = crs.crop_geographic_bbox(&layer.geographic_bbox);
	let corners = [(cropped.xmin, cropped.ymin), (cropped.xmin, cropped.ymax), (cropped.xmax, cropped.ymin), (cropped.xmax, cropped.ymax)];
	let projected: Vec<(f64, f64)> = corners.iter().filter_map(|&(x, y)| crs.from_geographic(x, y).ok()).collect();
	let mut bbox = BoundingBox::from_points(&projected)?;
	if crs.wire_axis_is_lat_lon() {
		bbox = bbox.swap_axes();
	}
	Some((crs, bbox))
}

/// Fractional digits needed to represent the largest-magnitude value without trailing
/// zeros, capped at 9 — §4.7's adaptive rounding rule, to bound textual length.
fn adaptive_precision(values: &[f64]) -> usize {
	let largest = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
	let formatted = format!("{largest:.9}");
	let fractional = formatted.split_once('.').map_or("", |(_, f)| f).trim_end_matches('0');
	fractional.len().min(9)
}

fn format_bbox(bbox: &BoundingBox<f64>) -> [String; 4] {
	let precision = adaptive_precision(&[bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax]);
	[format!("{:.precision$}", bbox.xmin), format!("{:.precision$}", bbox.ymin), format!("{:.precision$}", bbox.xmax), format!("{:.precision$}", bbox.ymax)]
}

pub fn build_wms(catalogue: &Catalogue, version: &str) -> String {
	let mut out = String::new();
	let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
	let _ = writeln!(out, r#"<WMT_MS_Capabilities version="{version}">"#);
	let _ = writeln!(out, "<Service><Name>OGC:WMS</Name><Title>{}</Title><Abstract>{}</Abstract>", escape(&catalogue.services.wms.title), escape(&catalogue.services.wms.abstract_text));
	let _ = writeln!(out, r#"<OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:href="]HOSTNAME[" />"#);
	let _ = writeln!(out, "<Fees>{}</Fees><AccessConstraints>{}</AccessConstraints></Service>", escape(&catalogue.services.wms.fees), escape(&catalogue.services.wms.access_constraints));

	out.push_str("<Capability><Request><GetCapabilities><Format>text/xml</Format><DCPType><HTTP><Get>");
	let _ = writeln!(out, r#"<OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:href="]HOSTNAME/PATH[" />"#);
	out.push_str("</Get></HTTP></DCPType></GetCapabilities><GetMap>");
	for format in &catalogue.services.format_list {
		let _ = write!(out, "<Format>{}</Format>", format.mime());
	}
	out.push_str("<DCPType><HTTP><Get>");
	let _ = writeln!(out, r#"<OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:href="]HOSTNAME/PATH[" />"#);
	out.push_str("</Get></HTTP></DCPType></GetMap></Request><Exception><Format>application/vnd.ogc.se_xml</Format></Exception>");

	out.push_str("<Layer><Title>Root</Title>");
	for crs in &catalogue.services.global_crs_list {
		let _ = write!(out, "<{}>{}</{0}>", if version == "1.3.0" { "CRS" } else { "SRS" }, escape(crs));
	}
	for layer in catalogue.layers() {
		if !layer.effective_wms_authorised() {
			continue;
		}
		out.push_str("<Layer queryable=\"1\"><Name>");
		out.push_str(&escape(&layer.id));
		out.push_str("</Name><Title>");
		out.push_str(&escape(&layer.title));
		out.push_str("</Title>");
		for crs in &layer.wms_crs_list {
			let _ = write!(out, "<{}>{}</{0}>", if version == "1.3.0" { "CRS" } else { "SRS" }, escape(crs));
		}
		let bbox = &layer.geographic_bbox;
		let _ = write!(out, r#"<LatLonBoundingBox minx="{}" miny="{}" maxx="{}" maxy="{}" />"#, bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax);
		for crs_code in &layer.wms_crs_list {
			if let Some((crs, projected)) = reprojected_layer_bbox(layer, crs_code) {
				let [minx, miny, maxx, maxy] = format_bbox(&projected);
				let attr = if version == "1.3.0" { "CRS" } else { "SRS" };
				let _ = write!(out, r#"<BoundingBox {attr}="{}" minx="{minx}" miny="{miny}" maxx="{maxx}" maxy="{maxy}" />"#, escape(&crs.request_code));
			}
		}
		for style in &layer.styles {
			let _ = write!(out, "<Style><Name>{}</Name><Title>{}</Title></Style>", escape(&style.id), escape(style.titles.first().map_or(style.id.as_str(), String::as_str)));
		}
		out.push_str("</Layer>");
	}
	out.push_str("</Layer></Capability></WMT_MS_Capabilities>");
	out
}

pub fn build_wmts(catalogue: &Catalogue) -> String {
	let mut out = String::new();
	let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
	out.push_str(r#"<Capabilities xmlns:xlink="http://www.w3.org/1999/xlink" version="1.0.0">"#);
	let _ = writeln!(out, "<ows:ServiceIdentification><ows:Title>{}</ows:Title><ows:Abstract>{}</ows:Abstract></ows:ServiceIdentification>", escape(&catalogue.services.wmts.title), escape(&catalogue.services.wmts.abstract_text));

	out.push_str("<ows:OperationsMetadata>");
	for op in ["GetCapabilities", "GetTile", "GetFeatureInfo"] {
		let _ = write!(out, r#"<ows:Operation name="{op}"><ows:DCP><ows:HTTP><ows:Get xlink:href="]HOSTNAME/PATH[" /></ows:HTTP></ows:DCP></ows:Operation>"#);
	}
	out.push_str("</ows:OperationsMetadata>");

	out.push_str("<Contents>");
	for layer in catalogue.layers() {
		if !layer.wmts_authorised {
			continue;
		}
		let _ = write!(out, "<Layer><ows:Title>{}</ows:Title><ows:Identifier>{}</ows:Identifier>", escape(&layer.title), escape(&layer.id));
		let geo = &layer.geographic_bbox;
		let [gminx, gminy, gmaxx, gmaxy] = format_bbox(geo);
		let _ = write!(out, "<ows:WGS84BoundingBox><ows:LowerCorner>{gminx} {gminy}</ows:LowerCorner><ows:UpperCorner>{gmaxx} {gmaxy}</ows:UpperCorner></ows:WGS84BoundingBox>");
		if let Some((crs, projected)) = reprojected_layer_bbox(layer, &layer.pyramid.tms.crs.code) {
			let [minx, miny, maxx, maxy] = format_bbox(&projected);
			let _ = write!(out, r#"<ows:BoundingBox crs="{}"><ows:LowerCorner>{minx} {miny}</ows:LowerCorner><ows:UpperCorner>{maxx} {maxy}</ows:UpperCorner></ows:BoundingBox>"#, escape(&crs.code));
		}
		for format in &catalogue.services.format_list {
			let _ = write!(out, "<Format>{}</Format>", format.mime());
		}
		for style in &layer.styles {
			let _ = write!(out, r#"<Style isDefault="{}"><ows:Identifier>{}</ows:Identifier></Style>"#, style.id == layer.default_style().map_or("", |s| s.id.as_str()), escape(&style.id));
		}
		let _ = write!(out, "<TileMatrixSetLink><TileMatrixSet>{}</TileMatrixSet></TileMatrixSetLink>", escape(&layer.pyramid.tms.id));
		out.push_str("</Layer>");
	}
	for tms in catalogue.tile_matrix_sets() {
		let _ = write!(out, "<TileMatrixSet><ows:Identifier>{}</ows:Identifier><ows:SupportedCRS>{}</ows:SupportedCRS>", escape(&tms.id), escape(&tms.crs.code));
		for matrix in tms.sorted_by_resolution() {
			let _ = write!(
				out,
				r#"<TileMatrix><ows:Identifier>{}</ows:Identifier><ScaleDenominator>{}</ScaleDenominator><TopLeftCorner>{} {}</TopLeftCorner><TileWidth>{}</TileWidth><TileHeight>{}</TileHeight><MatrixWidth>{}</MatrixWidth><MatrixHeight>{}</MatrixHeight></TileMatrix>"#,
				escape(&matrix.id), matrix.resolution / 0.00028, matrix.x0, matrix.y0, matrix.tile_width, matrix.tile_height, matrix.matrix_width, matrix.matrix_height,
			);
		}
		out.push_str("</TileMatrixSet>");
	}
	out.push_str("</Contents></Capabilities>");
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use ogctile_core::format::TileFormat;
	use ogctile_pyramid::catalogue::Catalogue;
	use ogctile_pyramid::layer::GetFeatureInfoConfig;
	use ogctile_pyramid::level::Level;
	use ogctile_pyramid::pyramid::Pyramid;
	use ogctile_pyramid::services::ServicesConfig;
	use ogctile_pyramid::source::RemoteTileSource;
	use ogctile_pyramid::style::Style;
	use ogctile_pyramid::tile_matrix::{TileLimits, TileMatrix, TileMatrixSet};
	use std::sync::Arc;

	#[test]
	fn empty_catalogue_still_produces_well_formed_documents() {
		let catalogue = Catalogue::new(Vec::new(), Vec::new(), ServicesConfig::default());
		for doc in [build_wms(&catalogue, "1.1.1"), build_wms(&catalogue, "1.3.0"), build_wmts(&catalogue)] {
			roxmltree::Document::parse(&doc).unwrap_or_else(|e| panic!("malformed document: {e}\n{doc}"));
		}
	}

	fn sample_layer() -> Layer {
		let matrix = TileMatrix::new("0", 156_543.033_928_040_97, -20_037_508.342_789_244, 20_037_508.342_789_244, 256, 256, 1, 1);
		let limits = TileLimits::full(&matrix);
		let tms = Arc::new(TileMatrixSet::new("PM", Arc::new(Crs::resolve("epsg:3857").unwrap()), vec![matrix.clone()]));
		let source = Arc::new(RemoteTileSource::new("https://example.test/{z}/{x}/{y}.png"));
		let nodata_tile = ogctile_core::blob::Blob::new_empty();
		let level = Level::new(matrix, limits, 3, TileFormat::Png, vec![0.0, 0.0, 0.0], source, nodata_tile);
		let pyramid = Arc::new(Pyramid::new(tms, TileFormat::Png, 3, false, false, vec![level]));

		Layer {
			id: "ortho".into(),
			title: "Ortho".into(),
			abstract_text: String::new(),
			keywords: Vec::new(),
			pyramid,
			styles: vec![Style { id: "normal".into(), titles: vec!["Normal".into()], abstracts: Vec::new(), keywords: Vec::new(), legend_urls: Vec::new(), palette: None }],
			min_res: 1.0,
			max_res: 1_000_000.0,
			wms_crs_list: vec!["epsg:3857".into(), "epsg:4326".into()],
			geographic_bbox: BoundingBox::new(-5.0, 41.0, 11.0, 51.0),
			native_bbox: BoundingBox::new(-2_000_000.0, 4_000_000.0, 2_000_000.0, 6_000_000.0),
			metadata_urls: Vec::new(),
			wms_authorised: true,
			wmts_authorised: true,
			gfi_config: GetFeatureInfoConfig::default(),
		}
	}

	#[test]
	fn adaptive_precision_drops_trailing_zeros_and_caps_at_nine() {
		assert_eq!(adaptive_precision(&[1.5, 2.0]), 1);
		assert_eq!(adaptive_precision(&[0.0]), 0);
		assert_eq!(adaptive_precision(&[1.123_456_789_123]), 9);
	}

	#[test]
	fn per_crs_bounding_box_is_reprojected_and_axis_swapped() {
		let layer = sample_layer();

		let (crs, mercator_bbox) = reprojected_layer_bbox(&layer, "epsg:3857").expect("epsg:3857 should reproject");
		assert!(!crs.wire_axis_is_lat_lon());
		assert!(mercator_bbox.xmin < mercator_bbox.xmax);
		assert!(mercator_bbox.ymin < mercator_bbox.ymax);
		// Mercator easting for 11 degrees east is a few million metres, not a handful of degrees.
		assert!(mercator_bbox.xmax > 100_000.0);

		let (geo_crs, geo_bbox) = reprojected_layer_bbox(&layer, "epsg:4326").expect("epsg:4326 should reproject");
		assert!(geo_crs.wire_axis_is_lat_lon());
		// After the EPSG geographic axis swap the bbox reads (lat, lon), so the swapped
		// xmin/xmax (originally latitude) stay within [-90, 90].
		assert!(geo_bbox.xmin >= -90.0 && geo_bbox.xmax <= 90.0);
	}

	#[test]
	fn wms_capabilities_emit_a_bounding_box_per_crs() {
		let catalogue = Catalogue::new(Vec::new(), vec![Arc::new(sample_layer())], ServicesConfig::default());
		let doc = build_wms(&catalogue, "1.3.0");
		roxmltree::Document::parse(&doc).unwrap_or_else(|e| panic!("malformed document: {e}\n{doc}"));
		assert!(doc.matches("<BoundingBox ").count() >= 2, "expected one <BoundingBox> per wms_crs_list entry:\n{doc}");
	}

	#[test]
	fn wmts_capabilities_emit_wgs84_and_native_bounding_boxes() {
		let catalogue = Catalogue::new(Vec::new(), vec![Arc::new(sample_layer())], ServicesConfig::default());
		let doc = build_wmts(&catalogue);
		roxmltree::Document::parse(&doc).unwrap_or_else(|e| panic!("malformed document: {e}\n{doc}"));
		assert!(doc.contains("<ows:WGS84BoundingBox>"));
		assert!(doc.contains(r#"<ows:BoundingBox crs="epsg:3857">"#));
	}
}
