//! Services catalogue loader (§4.8), grounded on `original_source/rok4/ConfLoader.h/.cpp`:
//! one XML file per `TileMatrixSet`, one per `Style`, one per `Layer`, plus a top-level
//! `services.xml`-shaped descriptor, walked with `roxmltree` in the same
//! find-child-by-tag-name style the pack's `francegen` WMTS client uses.
//!
//! Structurally invalid XML anywhere aborts the whole load (`spec.md`'s "built once during
//! server initialisation" rule); a single layer referencing an unresolvable CRS or a
//! `TileMatrix` id absent from its set is rejected - logged and skipped - without aborting
//! the rest of the catalogue (§3.2).

use anyhow::{Context, Result, anyhow, bail};
use ogctile_core::blob::Blob;
use ogctile_core::crs::{Crs, CrsEquivalenceTable};
use ogctile_core::format::TileFormat;
use ogctile_derive::context;
use ogctile_pyramid::catalogue::Catalogue;
use ogctile_pyramid::layer::{GetFeatureInfoConfig, Layer};
use ogctile_pyramid::level::Level;
use ogctile_pyramid::pyramid::Pyramid;
use ogctile_pyramid::services::{ServiceIdentification, ServiceProvider, ServicesConfig};
use ogctile_pyramid::source::cached::CachedTileSource;
use ogctile_pyramid::source::{RemoteTileSource, SlabTileSource};
use ogctile_pyramid::source::slab::SlabLayout;
use ogctile_pyramid::style::{Palette, Style};
use ogctile_pyramid::tile_matrix::{TileLimits, TileMatrix, TileMatrixSet};
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Loads the full catalogue from `catalogue_dir` (containing `tile_matrix_sets/`, `styles/`
/// and `layers/` subdirectories) and `services_file`. `tile_cache_capacity` of `0` disables
/// the byte cache in front of every slab/remote source.
#[context("loading catalogue from {}", catalogue_dir.display())]
pub fn load(catalogue_dir: &Path, services_file: &Path, tile_cache_capacity: u64) -> Result<Catalogue> {
	let services = load_services(services_file)?;

	let tile_matrix_sets = load_all(&catalogue_dir.join("tile_matrix_sets"), parse_tile_matrix_set)?;
	let tms_by_id: HashMap<String, Arc<TileMatrixSet>> = tile_matrix_sets.iter().map(|tms| (tms.id.clone(), tms.clone())).collect();

	let styles = load_all(&catalogue_dir.join("styles"), parse_style)?;
	let style_by_id: HashMap<String, Style> = styles.into_iter().map(|s| (s.id.clone(), (*s).clone())).collect();

	let mut layers = Vec::new();
	for entry in read_xml_dir(&catalogue_dir.join("layers"))? {
		let xml = std::fs::read_to_string(&entry).with_context(|| format!("reading {}", entry.display()))?;
		let doc = Document::parse(&xml).with_context(|| format!("parsing {}", entry.display()))?;
		match parse_layer(doc.root_element(), &tms_by_id, &style_by_id, tile_cache_capacity) {
			Ok(layer) => layers.push(Arc::new(layer)),
			Err(e) => log::warn!("rejecting layer from {}: {e:#}", entry.display()),
		}
	}

	Ok(Catalogue::new(tile_matrix_sets, layers, services))
}

fn read_xml_dir(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
	if !dir.is_dir() {
		return Ok(Vec::new());
	}
	let mut paths: Vec<_> = std::fs::read_dir(dir)
		.with_context(|| format!("reading directory {}", dir.display()))?
		.filter_map(|e| e.ok())
		.map(|e| e.path())
		.filter(|p| p.extension().is_some_and(|ext| ext == "xml"))
		.collect();
	paths.sort();
	Ok(paths)
}

fn load_all<T>(dir: &Path, parse: impl Fn(Node) -> Result<T>) -> Result<Vec<Arc<T>>> {
	let mut out = Vec::new();
	for path in read_xml_dir(dir)? {
		let xml = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
		let doc = Document::parse(&xml).with_context(|| format!("parsing {}", path.display()))?;
		out.push(Arc::new(parse(doc.root_element()).with_context(|| format!("parsing {}", path.display()))?));
	}
	Ok(out)
}

fn child_text<'a>(node: Node<'a, 'a>, name: &str) -> Option<&'a str> {
	node.children().find(|c| c.is_element() && c.tag_name().name() == name).and_then(|c| c.text()).map(str::trim)
}

fn children_text(node: Node, parent: &str, child: &str) -> Vec<String> {
	node
		.children()
		.find(|c| c.is_element() && c.tag_name().name() == parent)
		.map(|group| {
			group
				.children()
				.filter(|c| c.is_element() && c.tag_name().name() == child)
				.filter_map(|c| c.text())
				.map(|t| t.trim().to_string())
				.collect()
		})
		.unwrap_or_default()
}

fn attr_f64(node: Node, name: &str) -> Result<f64> {
	node.attribute(name).ok_or_else(|| anyhow!("<{}> missing attribute {name}", node.tag_name().name()))?.parse().with_context(|| format!("invalid {name}"))
}

fn attr_u32(node: Node, name: &str) -> Result<u32> {
	node.attribute(name).ok_or_else(|| anyhow!("<{}> missing attribute {name}", node.tag_name().name()))?.parse().with_context(|| format!("invalid {name}"))
}

fn parse_tile_matrix_set(node: Node) -> Result<TileMatrixSet> {
	let id = node.attribute("id").ok_or_else(|| anyhow!("tileMatrixSet missing id"))?;
	let crs_code = child_text(node, "crs").ok_or_else(|| anyhow!("tileMatrixSet {id} missing <crs>"))?;
	let crs = Arc::new(Crs::resolve(crs_code).with_context(|| format!("tileMatrixSet {id}"))?);

	let mut matrices = Vec::new();
	for m in node.children().filter(|c| c.is_element() && c.tag_name().name() == "tileMatrix") {
		let mid = m.attribute("id").ok_or_else(|| anyhow!("tileMatrix missing id in set {id}"))?;
		matrices.push(TileMatrix::new(
			mid,
			attr_f64(m, "resolution")?,
			attr_f64(m, "x0")?,
			attr_f64(m, "y0")?,
			attr_u32(m, "tileWidth")?,
			attr_u32(m, "tileHeight")?,
			attr_u32(m, "matrixWidth")?,
			attr_u32(m, "matrixHeight")?,
		));
	}
	if matrices.is_empty() {
		bail!("tileMatrixSet {id} declares no tileMatrix levels");
	}

	let mut tms = TileMatrixSet::new(id, crs, matrices);
	tms.title = node.attribute("title").unwrap_or_default().to_string();
	tms.description = child_text(node, "description").unwrap_or_default().to_string();
	Ok(tms)
}

fn parse_style(node: Node) -> Result<Style> {
	let id = node.attribute("id").ok_or_else(|| anyhow!("style missing id"))?.to_string();
	let titles = child_text(node, "title").map(ToString::to_string).into_iter().collect();
	let abstracts = child_text(node, "abstract").map(ToString::to_string).into_iter().collect();
	let legend_urls = children_text(node, "legendUrls", "url");

	let palette = node.children().find(|c| c.is_element() && c.tag_name().name() == "palette").map(|palette_node| {
		let entries = palette_node
			.children()
			.filter(|c| c.is_element() && c.tag_name().name() == "entry")
			.filter_map(|e| {
				let value: f64 = e.attribute("value")?.parse().ok()?;
				let color = parse_hex_color(e.attribute("color")?)?;
				Some((value, color))
			})
			.collect();
		Palette::new(entries)
	});

	Ok(Style { id, titles, abstracts, keywords: Vec::new(), legend_urls, palette })
}

fn parse_hex_color(hex: &str) -> Option<[u8; 4]> {
	let hex = hex.trim_start_matches('#');
	if hex.len() != 8 {
		return None;
	}
	let mut out = [0u8; 4];
	for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
		out[i] = u8::from_str_radix(std::str::from_utf8(chunk).ok()?, 16).ok()?;
	}
	Some(out)
}

fn parse_layer(node: Node, tms_by_id: &HashMap<String, Arc<TileMatrixSet>>, style_by_id: &HashMap<String, Style>, tile_cache_capacity: u64) -> Result<Layer> {
	let id = node.attribute("id").ok_or_else(|| anyhow!("layer missing id"))?.to_string();
	let authorised = node.attribute("authorised").unwrap_or("wms wmts");

	let pyramid_node = node.children().find(|c| c.is_element() && c.tag_name().name() == "pyramid").ok_or_else(|| anyhow!("layer {id} missing <pyramid>"))?;
	let tms_id = pyramid_node.attribute("tileMatrixSet").ok_or_else(|| anyhow!("layer {id} pyramid missing tileMatrixSet"))?;
	let tms = tms_by_id.get(tms_id).ok_or_else(|| anyhow!("layer {id} references unknown tileMatrixSet {tms_id}"))?.clone();
	let format = TileFormat::parse(pyramid_node.attribute("format").unwrap_or("tiff")).ok_or_else(|| anyhow!("layer {id} pyramid has an unrecognised format"))?;
	let channels: u8 = pyramid_node.attribute("channels").unwrap_or("3").parse().context("pyramid channels")?;
	let transparent = pyramid_node.attribute("transparent") == Some("true");
	let on_demand = pyramid_node.attribute("onDemand") == Some("true");

	let mut levels = Vec::new();
	for level_node in pyramid_node.children().filter(|c| c.is_element() && c.tag_name().name() == "level") {
		let level_id = level_node.attribute("id").ok_or_else(|| anyhow!("layer {id} has a <level> with no id"))?;
		let tile_matrix = tms
			.get(level_id)
			.ok_or_else(|| anyhow!("layer {id} level {level_id} has no matching tileMatrix in {tms_id}"))?
			.clone();

		let limits = level_node
			.children()
			.find(|c| c.is_element() && c.tag_name().name() == "limits")
			.map_or_else(|| Ok(TileLimits::full(&tile_matrix)), |l| parse_limits(l))?;

		let level_channels: u8 = level_node.attribute("channels").map(str::parse).transpose().context("level channels")?.unwrap_or(channels);
		let level_format = level_node.attribute("format").and_then(TileFormat::parse).unwrap_or(format);
		let nodata_values = level_node
			.attribute("nodata")
			.map(|s| s.split(',').map(|v| v.trim().parse::<f64>()).collect::<std::result::Result<Vec<_>, _>>())
			.transpose()
			.context("level nodata")?
			.unwrap_or_else(|| vec![0.0; level_channels as usize]);

		let source: Arc<dyn ogctile_pyramid::source::TileSource> = if let Some(slab) = level_node.children().find(|c| c.is_element() && c.tag_name().name() == "slab") {
			let path = slab.attribute("path").ok_or_else(|| anyhow!("level {level_id} slab missing path"))?;
			let layout = SlabLayout {
				slab_width: slab.attribute("slabWidth").unwrap_or("16").parse().context("slabWidth")?,
				slab_height: slab.attribute("slabHeight").unwrap_or("16").parse().context("slabHeight")?,
				path_depth: slab.attribute("pathDepth").unwrap_or("1").parse().context("pathDepth")?,
			};
			Arc::new(SlabTileSource::new(path, layout))
		} else if let Some(remote) = level_node.children().find(|c| c.is_element() && c.tag_name().name() == "remote") {
			let url = remote.attribute("urlTemplate").ok_or_else(|| anyhow!("level {level_id} remote missing urlTemplate"))?;
			Arc::new(RemoteTileSource::new(url))
		} else {
			bail!("level {level_id} has neither <slab> nor <remote>");
		};
		let source = if tile_cache_capacity > 0 { Arc::new(CachedTileSource::new(source, tile_cache_capacity)) as Arc<dyn ogctile_pyramid::source::TileSource> } else { source };

		let nodata_tile = build_nodata_tile(&tile_matrix, level_channels, level_format, &nodata_values)?;
		levels.push(Level::new(tile_matrix, limits, level_channels, level_format, nodata_values, source, nodata_tile));
	}
	if levels.is_empty() {
		bail!("layer {id} pyramid declares no levels");
	}

	let pyramid = Arc::new(Pyramid::new(tms, format, channels, transparent, on_demand, levels));

	let style_ids = children_text(node, "styles", "style");
	let styles = if style_ids.is_empty() {
		vec![style_by_id.values().next().cloned().unwrap_or_else(|| Style { id: "default".into(), titles: vec!["Default".into()], abstracts: Vec::new(), keywords: Vec::new(), legend_urls: Vec::new(), palette: None })]
	} else {
		style_ids
			.iter()
			.map(|sid| style_by_id.get(sid).cloned().ok_or_else(|| anyhow!("layer {id} references unknown style {sid}")))
			.collect::<Result<Vec<_>>>()?
	};

	let bbox_node = |name: &str| -> Result<ogctile_core::bbox::BoundingBox<f64>> {
		let n = node.children().find(|c| c.is_element() && c.tag_name().name() == name).ok_or_else(|| anyhow!("layer {id} missing <{name}>"))?;
		Ok(ogctile_core::bbox::BoundingBox::new(attr_f64(n, "xmin")?, attr_f64(n, "ymin")?, attr_f64(n, "xmax")?, attr_f64(n, "ymax")?))
	};

	let gfi_config = node
		.children()
		.find(|c| c.is_element() && c.tag_name().name() == "gfi")
		.map(|g| GetFeatureInfoConfig { upstream_url_template: g.attribute("upstreamUrlTemplate").map(ToString::to_string) })
		.unwrap_or_default();

	let geographic_bbox = bbox_node("geographicBBox")?;
	let native_bbox = bbox_node("nativeBBox")?;

	Ok(Layer {
		id,
		title: child_text(node, "title").unwrap_or_default().to_string(),
		abstract_text: child_text(node, "abstract").unwrap_or_default().to_string(),
		keywords: children_text(node, "keywords", "keyword"),
		pyramid,
		styles,
		min_res: child_text(node, "minRes").and_then(|s| s.parse().ok()).unwrap_or(0.0),
		max_res: child_text(node, "maxRes").and_then(|s| s.parse().ok()).unwrap_or(f64::MAX),
		wms_crs_list: children_text(node, "wmsCrsList", "crs"),
		geographic_bbox,
		native_bbox,
		metadata_urls: children_text(node, "metadataUrls", "url"),
		wms_authorised: authorised.contains("wms"),
		wmts_authorised: authorised.contains("wmts"),
		gfi_config,
	})
}

fn parse_limits(node: Node) -> Result<TileLimits> {
	Ok(TileLimits {
		min_col: node.attribute("minCol").ok_or_else(|| anyhow!("limits missing minCol"))?.parse()?,
		max_col: node.attribute("maxCol").ok_or_else(|| anyhow!("limits missing maxCol"))?.parse()?,
		min_row: node.attribute("minRow").ok_or_else(|| anyhow!("limits missing minRow"))?.parse()?,
		max_row: node.attribute("maxRow").ok_or_else(|| anyhow!("limits missing maxRow"))?.parse()?,
	})
}

fn build_nodata_tile(tile_matrix: &TileMatrix, channels: u8, format: TileFormat, nodata_values: &[f64]) -> Result<Blob> {
	let fill: Vec<u8> = (0..channels as usize).map(|i| nodata_values.get(i).copied().unwrap_or(0.0).clamp(0.0, 255.0) as u8).collect();
	let raster = ogctile_image::Raster::new(tile_matrix.tile_width, tile_matrix.tile_height, channels, &fill);
	let encoder = ogctile_image::format::make_encoder(format, raster);
	ogctile_image::format::encode_to_blob(encoder)
}

fn load_services(path: &Path) -> Result<ServicesConfig> {
	let xml = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
	let doc = Document::parse(&xml).with_context(|| format!("parsing {}", path.display()))?;
	let root = doc.root_element();

	let mut config = ServicesConfig::default();

	if let Some(wms) = root.children().find(|c| c.is_element() && c.tag_name().name() == "wms") {
		config.wms = parse_identification(wms);
	}
	if let Some(wmts) = root.children().find(|c| c.is_element() && c.tag_name().name() == "wmts") {
		config.wmts = parse_identification(wmts);
	}
	if let Some(provider) = root.children().find(|c| c.is_element() && c.tag_name().name() == "provider") {
		config.provider = ServiceProvider {
			name: child_text(provider, "name").unwrap_or_default().to_string(),
			site: child_text(provider, "site").unwrap_or_default().to_string(),
			contact: child_text(provider, "contact").unwrap_or_default().to_string(),
		};
	}

	let formats = children_text(root, "formats", "format");
	if !formats.is_empty() {
		config.format_list = formats.iter().filter_map(|f| TileFormat::parse(f)).collect();
	}
	let global_crs = children_text(root, "globalCrsList", "crs");
	if !global_crs.is_empty() {
		config.global_crs_list = global_crs;
	}
	if let Some(v) = child_text(root, "layerLimit").and_then(|s| s.parse().ok()) {
		config.layer_limit = v;
	}
	if let Some(v) = child_text(root, "maxWidth").and_then(|s| s.parse().ok()) {
		config.max_width = v;
	}
	if let Some(v) = child_text(root, "maxHeight").and_then(|s| s.parse().ok()) {
		config.max_height = v;
	}
	config.inspire = child_text(root, "inspire") == Some("true");
	config.feature_post_enabled = child_text(root, "featurePostEnabled").is_none_or(|v| v == "true");

	let rows: Vec<Vec<String>> = root
		.children()
		.find(|c| c.is_element() && c.tag_name().name() == "equivalenceTable")
		.into_iter()
		.flat_map(|table| table.children().filter(|c| c.is_element() && c.tag_name().name() == "row"))
		.map(|row| row.children().filter(|c| c.is_element() && c.tag_name().name() == "crs").filter_map(|c| c.text()).map(str::to_string).collect())
		.collect();
	config.equivalence_table = CrsEquivalenceTable::new(rows);
	config.restricted_crs_list = children_text(root, "restrictedCrsList", "crs");

	Ok(config)
}

fn parse_identification(node: Node) -> ServiceIdentification {
	ServiceIdentification {
		title: child_text(node, "title").unwrap_or_default().to_string(),
		abstract_text: child_text(node, "abstract").unwrap_or_default().to_string(),
		keywords: children_text(node, "keywords", "keyword"),
		fees: child_text(node, "fees").unwrap_or("none").to_string(),
		access_constraints: child_text(node, "accessConstraints").unwrap_or("none").to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn write(dir: &Path, rel: &str, contents: &str) {
		let path = dir.join(rel);
		std::fs::create_dir_all(path.parent().unwrap()).unwrap();
		let mut file = std::fs::File::create(path).unwrap();
		file.write_all(contents.as_bytes()).unwrap();
	}

	#[test]
	fn loads_a_minimal_catalogue() {
		let dir = tempfile::tempdir().unwrap();
		let root = dir.path();

		write(root, "services.xml", "<services><layerLimit>5</layerLimit></services>");
		write(
			root,
			"tile_matrix_sets/PM.xml",
			r#"<tileMatrixSet id="PM"><crs>epsg:3857</crs><tileMatrix id="0" resolution="100" x0="0" y0="0" tileWidth="256" tileHeight="256" matrixWidth="4" matrixHeight="4"/></tileMatrixSet>"#,
		);
		write(root, "styles/normal.xml", r#"<style id="normal"><title>Normal</title></style>"#);
		write(
			root,
			"layers/ortho.xml",
			r#"<layer id="ortho" authorised="wms wmts">
				<title>Ortho</title>
				<pyramid tileMatrixSet="PM" format="png" channels="3">
					<level id="0" nodata="0,0,0">
						<slab path="/tmp/does-not-exist" slabWidth="8" slabHeight="8" pathDepth="1"/>
					</level>
				</pyramid>
				<styles><style>normal</style></styles>
				<minRes>1</minRes>
				<maxRes>1000</maxRes>
				<wmsCrsList><crs>epsg:3857</crs></wmsCrsList>
				<geographicBBox xmin="-1" ymin="-1" xmax="1" ymax="1"/>
				<nativeBBox xmin="0" ymin="0" xmax="1000" ymax="1000"/>
			</layer>"#,
		);

		let catalogue = load(root, &root.join("services.xml"), 0).unwrap();
		assert_eq!(catalogue.services.layer_limit, 5);
		let layer = catalogue.layer("ortho").expect("layer should load");
		assert_eq!(layer.pyramid.level("0").unwrap().channels, 3);
		assert!(layer.wms_authorised && layer.wmts_authorised);
	}

	#[test]
	fn a_layer_with_an_unresolvable_crs_is_skipped_not_fatal() {
		let dir = tempfile::tempdir().unwrap();
		let root = dir.path();
		write(root, "services.xml", "<services/>");
		write(
			root,
			"tile_matrix_sets/PM.xml",
			r#"<tileMatrixSet id="PM"><crs>not-a-real-crs</crs><tileMatrix id="0" resolution="100" x0="0" y0="0" tileWidth="256" tileHeight="256" matrixWidth="4" matrixHeight="4"/></tileMatrixSet>"#,
		);

		let catalogue = load(root, &root.join("services.xml"), 0);
		assert!(catalogue.is_err(), "an invalid tileMatrixSet is a structural failure, not a per-layer rejection");
	}
}
