//! A runtime materialisation of one `TileMatrix` within one `Pyramid`: physical storage,
//! valid-tile bounds, and the cached encoded nodata tile served for missing tiles.

use crate::source::TileSource;
use crate::tile_matrix::{TileLimits, TileMatrix};
use ogctile_core::blob::Blob;
use ogctile_core::format::TileFormat;
use std::sync::Arc;

pub struct Level {
	pub tile_matrix: TileMatrix,
	pub limits: TileLimits,
	pub channels: u8,
	pub format: TileFormat,
	pub nodata_values: Vec<f64>,
	pub source: Arc<dyn TileSource>,
	/// Encoded nodata tile bytes, built once when the level is constructed and served for
	/// every tile outside `limits` or missing from a present slab.
	pub nodata_tile: Blob,
}

impl Level {
	#[must_use]
	pub fn new(
		tile_matrix: TileMatrix,
		limits: TileLimits,
		channels: u8,
		format: TileFormat,
		nodata_values: Vec<f64>,
		source: Arc<dyn TileSource>,
		nodata_tile: Blob,
	) -> Self {
		Level {
			tile_matrix,
			limits,
			channels,
			format,
			nodata_values,
			source,
			nodata_tile,
		}
	}

	#[must_use]
	pub fn id(&self) -> &str {
		&self.tile_matrix.id
	}

	#[must_use]
	pub fn resolution(&self) -> f64 {
		self.tile_matrix.resolution
	}
}

impl std::fmt::Debug for Level {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Level")
			.field("id", &self.tile_matrix.id)
			.field("resolution", &self.tile_matrix.resolution)
			.field("format", &self.format)
			.finish()
	}
}
