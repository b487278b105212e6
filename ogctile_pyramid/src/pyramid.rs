//! The set of levels that populate one `TileMatrixSet` with image data for one layer, plus
//! level selection (`best_level`, §4.2).

use crate::level::Level;
use crate::tile_matrix::TileMatrixSet;
use ogctile_core::error::CoreError;
use ogctile_core::format::TileFormat;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Window around `1.0` within which a level's resolution is considered an acceptable match
/// for the requested resolution, per §4.2.
const ACCEPTABLE_RATIO: std::ops::RangeInclusive<f64> = 0.8..=1.8;

pub struct Pyramid {
	pub tms: Arc<TileMatrixSet>,
	pub format: TileFormat,
	pub channels: u8,
	pub transparent: bool,
	/// An on-demand pyramid has no physical storage for some levels; `best_level` only
	/// considers levels whose `d` ratio falls in the acceptable window and errors otherwise.
	pub on_demand: bool,
	levels: BTreeMap<String, Level>,
}

impl Pyramid {
	#[must_use]
	pub fn new(tms: Arc<TileMatrixSet>, format: TileFormat, channels: u8, transparent: bool, on_demand: bool, levels: Vec<Level>) -> Self {
		Pyramid {
			tms,
			format,
			channels,
			transparent,
			on_demand,
			levels: levels.into_iter().map(|l| (l.id().to_string(), l)).collect(),
		}
	}

	#[must_use]
	pub fn level(&self, id: &str) -> Option<&Level> {
		self.levels.get(id)
	}

	pub fn levels(&self) -> impl Iterator<Item = &Level> {
		self.levels.values()
	}

	/// Finest (smallest resolution) level.
	#[must_use]
	pub fn lowest_level(&self) -> Option<&Level> {
		self.levels.values().min_by(|a, b| a.resolution().partial_cmp(&b.resolution()).unwrap())
	}

	/// Coarsest (largest resolution) level.
	#[must_use]
	pub fn highest_level(&self) -> Option<&Level> {
		self.levels.values().max_by(|a, b| a.resolution().partial_cmp(&b.resolution()).unwrap())
	}

	/// Selects the level whose resolution best matches the target `r`, per §4.2.
	pub fn best_level(&self, r: f64) -> Result<&Level, CoreError> {
		let mut candidates: Vec<(&Level, f64)> = self
			.levels
			.values()
			.map(|level| (level, r / level.resolution()))
			.collect();
		candidates.sort_by(|a, b| a.0.resolution().partial_cmp(&b.0.resolution()).unwrap());

		let in_window: Vec<&(&Level, f64)> = candidates.iter().filter(|(_, d)| ACCEPTABLE_RATIO.contains(d)).collect();
		if !in_window.is_empty() {
			return Ok(in_window
				.into_iter()
				.min_by(|(_, a), (_, b)| (a - 1.0).abs().partial_cmp(&(b - 1.0).abs()).unwrap())
				.map(|(level, _)| *level)
				.unwrap());
		}

		if self.on_demand {
			return Err(CoreError::NoSuitableLevel);
		}

		// Coarsest level that still over-samples (d < 0.8); fall back to the finest level.
		candidates
			.iter()
			.rev()
			.find(|(_, d)| *d < 0.8)
			.map(|(level, _)| *level)
			.or_else(|| candidates.first().map(|(level, _)| *level))
			.ok_or(CoreError::NoSuitableLevel)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::level::Level;
	use crate::source::SlabTileSource;
	use crate::tile_matrix::{TileLimits, TileMatrix};
	use ogctile_core::blob::Blob;
	use ogctile_core::crs::Crs;

	fn make_level(id: &str, resolution: f64) -> Level {
		let tm = TileMatrix::new(id, resolution, 0.0, 0.0, 256, 256, 1000, 1000);
		let limits = TileLimits::full(&tm);
		let source = Arc::new(SlabTileSource::new("/tmp/nonexistent", crate::source::slab::SlabLayout {
			slab_width: 16,
			slab_height: 16,
			path_depth: 1,
		}));
		Level::new(tm, limits, 3, TileFormat::Png, vec![0.0], source, Blob::new_empty())
	}

	fn make_pyramid(resolutions: &[f64], on_demand: bool) -> Pyramid {
		let crs = Arc::new(Crs::resolve("EPSG:3857").unwrap());
		let tms = Arc::new(TileMatrixSet::new(
			"TMS",
			crs,
			resolutions.iter().enumerate().map(|(i, r)| TileMatrix::new(i.to_string(), *r, 0.0, 0.0, 256, 256, 1000, 1000)).collect(),
		));
		let levels = resolutions.iter().enumerate().map(|(i, r)| make_level(&i.to_string(), *r)).collect();
		Pyramid::new(tms, TileFormat::Png, 3, false, on_demand, levels)
	}

	#[test]
	fn picks_level_closest_to_one_within_window() {
		let pyramid = make_pyramid(&[1.0, 2.0, 4.0], false);
		let level = pyramid.best_level(1.9).unwrap();
		assert_eq!(level.id(), "1");
	}

	#[test]
	fn falls_back_to_coarsest_oversampling_level_outside_window() {
		let pyramid = make_pyramid(&[10.0, 20.0], false);
		let level = pyramid.best_level(1.0).unwrap();
		assert_eq!(level.id(), "0");
	}

	#[test]
	fn on_demand_pyramid_errors_outside_window() {
		let pyramid = make_pyramid(&[10.0, 20.0], true);
		assert!(matches!(pyramid.best_level(1.0), Err(CoreError::NoSuitableLevel)));
	}
}
