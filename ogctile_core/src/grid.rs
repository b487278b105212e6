//! A table of source coordinates per output pixel, used by the image graph's `Reproject`
//! node and by the capabilities builder's bbox reprojection.

use crate::bbox::BoundingBox;
use crate::crs::Crs;
use crate::error::CoreError;

/// Interior sample density for [`Grid::reproject`]. The default mirrors the "a few
/// destination pixels apart" guidance: 9x9 interior points plus the four corners, capped so
/// a pathological request can't blow up reprojection cost.
pub const DEFAULT_GRID_SAMPLES: usize = 9;

/// A regularly-spaced grid of `(src_x, src_y)` samples covering one destination pixel each.
#[derive(Debug, Clone)]
pub struct Grid {
	pub width: usize,
	pub height: usize,
	samples: Vec<(f64, f64)>,
}

impl Grid {
	/// Samples the four corners of `dst_bbox` plus a `samples x samples` interior grid,
	/// reprojects each from `dst_crs` to `src_crs`, and returns both the resulting `Grid` and
	/// the axis-aligned bounding rectangle of the transformed samples (in `src_crs`).
	///
	/// Any unprojectable sample makes the whole reprojection fail with
	/// [`CoreError::ReprojectionFailed`].
    pub fn reproject(
		dst_bbox: &BoundingBox<f64>,
		dst_crs: &Crs,
		src_crs: &Crs,
		samples: usize,
	) -> anyhow::Result<(Grid, BoundingBox<f64>)> {
		let n = samples.max(2);
		let mut points = Vec::with_capacity(n * n);
		for row in 0..n {
			let v = dst_bbox.ymin + (dst_bbox.ymax - dst_bbox.ymin) * row as f64 / (n - 1) as f64;
			for col in 0..n {
				let u = dst_bbox.xmin + (dst_bbox.xmax - dst_bbox.xmin) * col as f64 / (n - 1) as f64;
				let (lon, lat) = dst_crs.to_geographic(u, v).map_err(|_| CoreError::ReprojectionFailed)?;
				let (sx, sy) = src_crs.from_geographic(lon, lat).map_err(|_| CoreError::ReprojectionFailed)?;
				points.push((sx, sy));
			}
		}

		let bounds = BoundingBox::from_points(&points).ok_or(CoreError::ReprojectionFailed)?;
		Ok((Grid { width: n, height: n, samples: points }, bounds))
	}

	/// Bilinear-samples the grid at normalized destination-pixel coordinates `(u, v) in
	/// [0,1]x[0,1]`, returning the interpolated source coordinate.
	#[must_use]
	pub fn sample(&self, u: f64, v: f64) -> (f64, f64) {
		let fx = u.clamp(0.0, 1.0) * (self.width - 1) as f64;
		let fy = v.clamp(0.0, 1.0) * (self.height - 1) as f64;
		let (x0, y0) = (fx.floor() as usize, fy.floor() as usize);
		let (x1, y1) = ((x0 + 1).min(self.width - 1), (y0 + 1).min(self.height - 1));
		let (tx, ty) = (fx - x0 as f64, fy - y0 as f64);

		let p00 = self.samples[y0 * self.width + x0];
		let p10 = self.samples[y0 * self.width + x1];
		let p01 = self.samples[y1 * self.width + x0];
		let p11 = self.samples[y1 * self.width + x1];

		let lerp = |a: (f64, f64), b: (f64, f64), t: f64| (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
		let top = lerp(p00, p10, tx);
		let bottom = lerp(p01, p11, tx);
		lerp(top, bottom, ty)
	}

	/// A rough Jacobian-scale estimate (source units per destination unit), used to pick an
	/// intermediate resolution before level selection during a reprojected `GetMap`.
	#[must_use]
	pub fn scale_estimate(&self) -> f64 {
		if self.samples.len() < 2 {
			return 1.0;
		}
		let a = self.samples[0];
		let b = self.samples[self.width - 1];
		let dx = (b.0 - a.0).abs();
		let dy = (b.1 - a.1).abs();
		(dx.max(dy) / (self.width - 1).max(1) as f64).max(f64::EPSILON)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;

	#[test]
	fn identity_reprojection_is_close_to_source() {
		let wgs84 = Crs::resolve("EPSG:4326").unwrap();
		let bbox = BoundingBox::new(-5.0, 41.0, 11.0, 51.0);
		let (grid, bounds) = Grid::reproject(&bbox, &wgs84, &wgs84, 3).unwrap();
		assert_relative_eq!(bounds.xmin, bbox.xmin, epsilon = 1e-6);
		assert_relative_eq!(bounds.ymax, bbox.ymax, epsilon = 1e-6);
		assert_eq!(grid.width, 3);
	}
}
