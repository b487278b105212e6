//! `TileMatrix` / `TileMatrixSet`: the resolution-level grid model shared by every pyramid
//! that sits on a given TMS.

use ogctile_core::bbox::BoundingBox;
use ogctile_core::crs::Crs;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One resolution level of a tile matrix set: a grid of equally sized tiles anchored at
/// `(x0, y0)` in CRS units, rows growing downward.
#[derive(Debug, Clone)]
pub struct TileMatrix {
	pub id: String,
	pub resolution: f64,
	pub x0: f64,
	pub y0: f64,
	pub tile_width: u32,
	pub tile_height: u32,
	pub matrix_width: u32,
	pub matrix_height: u32,
}

impl TileMatrix {
	#[must_use]
	pub fn new(
		id: impl Into<String>,
		resolution: f64,
		x0: f64,
		y0: f64,
		tile_width: u32,
		tile_height: u32,
		matrix_width: u32,
		matrix_height: u32,
	) -> Self {
		TileMatrix {
			id: id.into(),
			resolution,
			x0,
			y0,
			tile_width,
			tile_height,
			matrix_width,
			matrix_height,
		}
	}

	/// Top-left corner of tile `(col, row)` in CRS units.
	#[must_use]
	pub fn tile_origin(&self, col: i64, row: i64) -> (f64, f64) {
		let step_x = f64::from(self.tile_width) * self.resolution;
		let step_y = f64::from(self.tile_height) * self.resolution;
		(self.x0 + col as f64 * step_x, self.y0 - row as f64 * step_y)
	}

	/// The `[col_min, col_max] x [row_min, row_max]` tile range a bbox (in this matrix's CRS)
	/// covers, clamped to the matrix extents. Returns `None` when the bbox lies entirely
	/// outside the matrix.
	#[must_use]
	pub fn tile_range(&self, bbox: &BoundingBox<f64>, limits: &TileLimits) -> Option<BoundingBox<i64>> {
		let step_x = f64::from(self.tile_width) * self.resolution;
		let step_y = f64::from(self.tile_height) * self.resolution;

		let c_min = ((bbox.xmin - self.x0) / step_x).floor() as i64;
		let c_max = ((bbox.xmax - self.x0) / step_x).ceil() as i64 - 1;
		let r_min = ((self.y0 - bbox.ymax) / step_y).floor() as i64;
		let r_max = ((self.y0 - bbox.ymin) / step_y).ceil() as i64 - 1;

		let c_min = c_min.max(limits.min_col);
		let c_max = c_max.min(limits.max_col);
		let r_min = r_min.max(limits.min_row);
		let r_max = r_max.min(limits.max_row);

		if c_min > c_max || r_min > r_max {
			return None;
		}
		Some(BoundingBox::new(c_min, r_min, c_max + 1, r_max + 1))
	}
}

/// Per-level bounds of tiles that actually exist — distinct from the matrix's own
/// `(matrix_width, matrix_height)`, which bounds what *could* exist.
#[derive(Debug, Clone, Copy)]
pub struct TileLimits {
	pub min_col: i64,
	pub max_col: i64,
	pub min_row: i64,
	pub max_row: i64,
}

impl TileLimits {
	#[must_use]
	pub fn full(matrix: &TileMatrix) -> Self {
		TileLimits {
			min_col: 0,
			max_col: i64::from(matrix.matrix_width) - 1,
			min_row: 0,
			max_row: i64::from(matrix.matrix_height) - 1,
		}
	}

	#[must_use]
	pub fn contains(&self, col: i64, row: i64) -> bool {
		(self.min_col..=self.max_col).contains(&col) && (self.min_row..=self.max_row).contains(&row)
	}
}

/// An ordered family of `TileMatrix`es sharing one CRS. Lookup is always by id; the
/// `resolutions sorted by id are strictly monotonic` invariant is a catalogue-loading
/// concern, not something this type enforces itself.
#[derive(Debug, Clone)]
pub struct TileMatrixSet {
	pub id: String,
	pub title: String,
	pub description: String,
	pub keywords: Vec<String>,
	pub crs: Arc<Crs>,
	matrices: BTreeMap<String, TileMatrix>,
}

impl TileMatrixSet {
	#[must_use]
	pub fn new(id: impl Into<String>, crs: Arc<Crs>, matrices: Vec<TileMatrix>) -> Self {
		TileMatrixSet {
			id: id.into(),
			title: String::new(),
			description: String::new(),
			keywords: Vec::new(),
			crs,
			matrices: matrices.into_iter().map(|m| (m.id.clone(), m)).collect(),
		}
	}

	#[must_use]
	pub fn get(&self, id: &str) -> Option<&TileMatrix> {
		self.matrices.get(id)
	}

	pub fn iter(&self) -> impl Iterator<Item = &TileMatrix> {
		self.matrices.values()
	}

	/// Matrices sorted from finest (smallest resolution) to coarsest.
	#[must_use]
	pub fn sorted_by_resolution(&self) -> Vec<&TileMatrix> {
		let mut v: Vec<&TileMatrix> = self.matrices.values().collect();
		v.sort_by(|a, b| a.resolution.partial_cmp(&b.resolution).unwrap());
		v
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ogctile_core::crs::Crs;
	use rstest::rstest;

	fn sample_matrix() -> TileMatrix {
		TileMatrix::new("10", 1.0, 0.0, 6_000_000.0, 256, 256, 100_000, 100_000)
	}

	#[test]
	fn tile_origin_moves_down_as_row_grows() {
		let m = sample_matrix();
		let (_, y0) = m.tile_origin(0, 0);
		let (_, y1) = m.tile_origin(0, 1);
		assert!(y1 < y0);
	}

	#[rstest]
	#[case(0.0, 6_000_000.0 - 1000.0, 1000.0, 6_000_000.0, 0, 3, 0, 3)]
	fn tile_range_matches_spec_formula(
		#[case] xmin: f64,
		#[case] ymin: f64,
		#[case] xmax: f64,
		#[case] ymax: f64,
		#[case] c_min: i64,
		#[case] c_max: i64,
		#[case] r_min: i64,
		#[case] r_max: i64,
	) {
		let m = sample_matrix();
		let limits = TileLimits::full(&m);
		let bbox = ogctile_core::bbox::BoundingBox::new(xmin, ymin, xmax, ymax);
		let range = m.tile_range(&bbox, &limits).unwrap();
		assert_eq!((range.xmin, range.xmax, range.ymin, range.ymax), (c_min, c_max, r_min, r_max));
	}

	#[test]
	fn tms_lookup_is_by_id() {
		let crs = Arc::new(Crs::resolve("EPSG:4326").unwrap());
		let tms = TileMatrixSet::new("WGS84G", crs, vec![sample_matrix()]);
		assert!(tms.get("10").is_some());
		assert!(tms.get("99").is_none());
	}
}
