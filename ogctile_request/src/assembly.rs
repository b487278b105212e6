//! The `GetMap`/`GetTile` assembly pipelines (§4.5 "Assembly for a `GetMap`"): tile fetch,
//! decode, crop/merge into an `ExtendedCompound`, optional reprojection, resample, encode.

use ogctile_core::bbox::BoundingBox;
use ogctile_core::blob::Blob;
use ogctile_core::crs::Crs;
use ogctile_core::error::CoreError;
use ogctile_core::grid::{DEFAULT_GRID_SAMPLES, Grid};
use ogctile_image::format::{encode_to_blob, make_encoder};
use ogctile_image::graph::{Empty, ExtendedCompound, ImageNode, Reproject, Resample, ResampleKernel, TileImage};
use ogctile_image::graph::extended_compound::Layer as CompoundLayer;
use ogctile_pyramid::layer::Layer;
use ogctile_pyramid::level::Level;
use ogctile_pyramid::pyramid::Pyramid;
use std::sync::Arc;

/// Reads and decodes one tile's worth of source bytes, promoting any I/O or decode failure
/// to the level's nodata tile rather than failing the whole request (§7 tile-local policy).
async fn fetch_tile_image(level: &Level, col: i64, row: i64) -> ogctile_image::Raster {
	let bytes = if level.limits.contains(col, row) {
		match level.source.get_tile(col, row).await {
			Ok(Some(blob)) => blob,
			Ok(None) => level.nodata_tile.clone(),
			Err(e) => {
				log::warn!("tile read failed at ({col}, {row}): {e}");
				level.nodata_tile.clone()
			}
		}
	} else {
		level.nodata_tile.clone()
	};

	match ogctile_image::format::decode(level.format, bytes.as_slice()) {
		Ok(raster) => raster,
		Err(e) => {
			log::warn!("tile decode failed at ({col}, {row}): {e}");
			match ogctile_image::format::decode(level.format, level.nodata_tile.as_slice()) {
				Ok(raster) => raster,
				Err(_) => ogctile_image::Raster::new(level.tile_matrix.tile_width, level.tile_matrix.tile_height, level.channels, &[0]),
			}
		}
	}
}

/// Builds an `ExtendedCompound` covering every tile the given CRS-space bbox intersects at
/// `level`, each wrapped as a `TileImage` positioned by its pixel offset within the union.
async fn compound_over_bbox(level: &Level, pyramid: &Pyramid, bbox: &BoundingBox<f64>, nodata: &[f64]) -> Box<dyn ImageNode> {
	let Some(tile_range) = level.tile_matrix.tile_range(bbox, &level.limits) else {
		let (px_w, px_h) = pixel_extent(&level.tile_matrix, bbox);
		return Box::new(Empty::new(px_w, px_h, level.channels, *bbox, nodata));
	};

	let tile_w = level.tile_matrix.tile_width;
	let tile_h = level.tile_matrix.tile_height;
	let origin = level.tile_matrix.tile_origin(tile_range.xmin, tile_range.ymin);
	let union_bbox = BoundingBox::new(
		origin.0,
		origin.1 - (tile_range.ymax - tile_range.ymin) as f64 * f64::from(tile_h) * level.tile_matrix.resolution,
		origin.0 + (tile_range.xmax - tile_range.xmin) as f64 * f64::from(tile_w) * level.tile_matrix.resolution,
		origin.1,
	);

	let mut layers = Vec::new();
	for row in tile_range.ymin..tile_range.ymax {
		for col in tile_range.xmin..tile_range.xmax {
			let raster = fetch_tile_image(level, col, row).await;
			let tile_origin = level.tile_matrix.tile_origin(col, row);
			let tile_bbox = BoundingBox::new(
				tile_origin.0,
				tile_origin.1 - f64::from(tile_h) * level.tile_matrix.resolution,
				tile_origin.0 + f64::from(tile_w) * level.tile_matrix.resolution,
				tile_origin.1,
			);
			let node = TileImage::whole(raster, tile_bbox);
			let offset_x = (col - tile_range.xmin) * i64::from(tile_w);
			let offset_y = (row - tile_range.ymin) * i64::from(tile_h);
			layers.push(CompoundLayer { node: Box::new(node), offset_x, offset_y });
		}
	}

	let px_w = ((tile_range.xmax - tile_range.xmin) as u32) * tile_w;
	let px_h = ((tile_range.ymax - tile_range.ymin) as u32) * tile_h;
	Box::new(ExtendedCompound::new(px_w, px_h, level.channels, union_bbox, layers, nodata, pyramid.transparent))
}

fn pixel_extent(tile_matrix: &ogctile_pyramid::tile_matrix::TileMatrix, bbox: &BoundingBox<f64>) -> (u32, u32) {
	let w = (bbox.width() / tile_matrix.resolution).max(1.0) as u32;
	let h = (bbox.height() / tile_matrix.resolution).max(1.0) as u32;
	(w.max(1), h.max(1))
}

/// Non-reprojected `GetMap`: the request CRS matches the pyramid's own CRS, so we fetch at
/// the resolution closest to `width/height` over `bbox` and resample only if the pixel
/// dimensions don't already match (§4.5 steps 1-5).
pub async fn assemble_get_map_native(layer: &Layer, bbox: &BoundingBox<f64>, width: u32, height: u32, kernel: ResampleKernel) -> anyhow::Result<Box<dyn ImageNode>> {
	let target_res = (bbox.width() / f64::from(width)).max(bbox.height() / f64::from(height));
	let level = layer.pyramid.best_level(target_res)?;
	let nodata = &level.nodata_values;
	let compound = compound_over_bbox(level, &layer.pyramid, bbox, nodata).await;

	if compound.width() == width && compound.height() == height {
		return Ok(compound);
	}
	Ok(Box::new(Resample::new(compound.as_ref(), width, height, kernel)?))
}

/// Reprojected `GetMap` (§4.5 "Assembly with reprojection"): reproject the requested bbox
/// into the pyramid CRS to get a crop window, pick a level at the estimated intermediate
/// resolution, assemble an overscanned compound, reproject it, then resample to the exact
/// requested size.
pub async fn assemble_get_map_reprojected(layer: &Layer, dst_crs: &Crs, dst_bbox: &BoundingBox<f64>, width: u32, height: u32, kernel: ResampleKernel) -> anyhow::Result<Box<dyn ImageNode>> {
	let src_crs = &layer.pyramid.tms.crs;
	let (grid, crop_bbox) = Grid::reproject(dst_bbox, dst_crs, src_crs, DEFAULT_GRID_SAMPLES)?;

	let target_res = (dst_bbox.width() / f64::from(width)).max(dst_bbox.height() / f64::from(height));
	let scale = grid.scale_estimate();
	let intermediate_res = (target_res * scale).clamp(layer.min_res, layer.max_res);

	let level = layer.pyramid.best_level(intermediate_res)?;
	let nodata = &level.nodata_values;

	let ratio_x = crop_bbox.width() / (level.tile_matrix.resolution * f64::from(width));
	let ratio_y = crop_bbox.height() / (level.tile_matrix.resolution * f64::from(height));
	let overscan_w = (f64::from(width) * ratio_x) as u32 + 2;
	let overscan_h = (f64::from(height) * ratio_y) as u32 + 2;

	// §4.5 step 4: assemble at (w·ratio_x + 2, h·ratio_y + 2) native pixels, one pixel of
	// overscan on every side, so `Reproject`'s nearest-neighbour lookup never clamps against
	// the exact edge of the mapped region.
	let pad_x = (f64::from(overscan_w) - crop_bbox.width() / level.tile_matrix.resolution) / 2.0 * level.tile_matrix.resolution;
	let pad_y = (f64::from(overscan_h) - crop_bbox.height() / level.tile_matrix.resolution) / 2.0 * level.tile_matrix.resolution;
	let padded_bbox = BoundingBox::new(crop_bbox.xmin - pad_x, crop_bbox.ymin - pad_y, crop_bbox.xmax + pad_x, crop_bbox.ymax + pad_y);

	// `Reproject::new` fixes its own `(width, height, *dst_bbox)` output regardless of the
	// compound's pixel size, so the overscan margin above is dropped automatically once
	// `Reproject` reads through it - no separate crop-back step is needed.
	let compound = compound_over_bbox(level, &layer.pyramid, &padded_bbox, nodata).await;
	let reprojected = Reproject::new(compound, grid, width, height, *dst_bbox);
	let resampled: Box<dyn ImageNode> = if reprojected.width() == width && reprojected.height() == height {
		Box::new(reprojected)
	} else {
		Box::new(Resample::new(&reprojected, width, height, kernel)?)
	};

	if !dst_crs.definition_area.is_empty() && !bbox_within(dst_bbox, &dst_crs.definition_area) {
		let layers = vec![CompoundLayer { node: resampled, offset_x: 0, offset_y: 0 }];
		return Ok(Box::new(ExtendedCompound::new(width, height, layer.pyramid.channels, *dst_bbox, layers, nodata, layer.pyramid.transparent)));
	}
	Ok(resampled)
}

fn bbox_within(inner: &BoundingBox<f64>, outer: &BoundingBox<f64>) -> bool {
	inner.xmin >= outer.xmin && inner.xmax <= outer.xmax && inner.ymin >= outer.ymin && inner.ymax <= outer.ymax
}

/// Encodes an assembled image graph node with `format`, returning the encoded bytes.
pub fn encode_node(node: &dyn ImageNode, format: ogctile_core::format::TileFormat) -> anyhow::Result<Blob> {
	let raster = ogctile_image::graph::materialize_u8(node);
	let encoder = make_encoder(format, raster);
	encode_to_blob(encoder)
}

/// Direct `GetTile` fetch: pass through the stored bytes unchanged when the stored format
/// matches the request, otherwise decode and re-encode (§6.2 "transcoded otherwise").
pub async fn fetch_tile(level: &Level, col: i64, row: i64, requested_format: ogctile_core::format::TileFormat) -> anyhow::Result<Option<Blob>> {
	if !level.limits.contains(col, row) {
		return Ok(None);
	}
	let bytes = match level.source.get_tile(col, row).await {
		Ok(Some(blob)) => blob,
		Ok(None) => return Ok(None),
		Err(e) => return Err(CoreError::TileReadError(e.to_string()).into()),
	};
	if requested_format == level.format {
		return Ok(Some(bytes));
	}
	let raster = ogctile_image::format::decode(level.format, bytes.as_slice())?;
	let encoder = make_encoder(requested_format, raster);
	Ok(Some(encode_to_blob(encoder)?))
}

/// Transcodes the level's pre-encoded nodata tile into `requested_format`, used by
/// `GetTile` for out-of-range tiles when the caller hasn't requested `nodataashttpstatus`.
pub fn transcode_nodata(level: &Level, requested_format: ogctile_core::format::TileFormat) -> anyhow::Result<Blob> {
	if requested_format == level.format {
		return Ok(level.nodata_tile.clone());
	}
	let raster = ogctile_image::format::decode(level.format, level.nodata_tile.as_slice())?;
	encode_to_blob(make_encoder(requested_format, raster))
}

/// Arc-sharing convenience used by handlers that need to keep a pyramid alive across an
/// `.await` boundary alongside the level borrowed from it.
pub type SharedPyramid = Arc<Pyramid>;
