//! Axis-aligned bounding boxes, generic over the coordinate type (`f64` for CRS-space
//! geometry, `i64` for tile ranges).

use num_bounds::Numeric;

/// A private sealed-ish numeric bound so `BoundingBox<T>` only instantiates for the two
/// coordinate kinds the server actually uses.
mod num_bounds {
	pub trait Numeric: Copy + PartialOrd + Default + std::fmt::Debug {}
	impl Numeric for f64 {}
	impl Numeric for i64 {}
}

/// `(xmin, ymin, xmax, ymax)` plus an optional CRS tag. Either empty (`xmin==xmax &&
/// ymin==ymax`) or strictly ordered (`xmin<xmax && ymin<ymax`) — see [`BoundingBox::validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox<T: Numeric> {
	pub xmin: T,
	pub ymin: T,
	pub xmax: T,
	pub ymax: T,
}

impl<T: Numeric> BoundingBox<T> {
	#[must_use]
	pub fn new(xmin: T, ymin: T, xmax: T, ymax: T) -> BoundingBox<T> {
		BoundingBox { xmin, ymin, xmax, ymax }
	}

	#[must_use]
	pub fn empty() -> BoundingBox<T> {
		BoundingBox {
			xmin: T::default(),
			ymin: T::default(),
			xmax: T::default(),
			ymax: T::default(),
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		!(self.xmin < self.xmax) && !(self.ymin < self.ymax)
	}

	/// Either empty, or strictly ordered on both axes — the §3.2 invariant.
	#[must_use]
	pub fn is_valid(&self) -> bool {
		self.is_empty() || (self.xmin < self.xmax && self.ymin < self.ymax)
	}

	#[must_use]
	pub fn width(&self) -> T
	where
		T: std::ops::Sub<Output = T>,
	{
		self.xmax - self.xmin
	}

	#[must_use]
	pub fn height(&self) -> T
	where
		T: std::ops::Sub<Output = T>,
	{
		self.ymax - self.ymin
	}
}

impl BoundingBox<f64> {
	/// Swaps x/y — used for the WMS 1.3.0 axis-order rule on EPSG geographic CRSes.
	#[must_use]
	pub fn swap_axes(&self) -> BoundingBox<f64> {
		BoundingBox::new(self.ymin, self.xmin, self.ymax, self.xmax)
	}

	/// The union of the axis-aligned extents of `points`. Returns `None` for an empty slice.
	#[must_use]
	pub fn from_points(points: &[(f64, f64)]) -> Option<BoundingBox<f64>> {
		let mut it = points.iter();
		let (x0, y0) = *it.next()?;
		let (mut xmin, mut ymin, mut xmax, mut ymax) = (x0, y0, x0, y0);
		for &(x, y) in it {
			xmin = xmin.min(x);
			ymin = ymin.min(y);
			xmax = xmax.max(x);
			ymax = ymax.max(y);
		}
		Some(BoundingBox::new(xmin, ymin, xmax, ymax))
	}

	/// Intersects `self` with `other` component-wise; collapses an axis with no overlap to a
	/// degenerate `(v, v)` pair rather than erroring, per the CRS-crop clarification.
	#[must_use]
	pub fn crop(&self, other: &BoundingBox<f64>) -> BoundingBox<f64> {
		let (xmin, xmax) = crop_axis(self.xmin, self.xmax, other.xmin, other.xmax);
		let (ymin, ymax) = crop_axis(self.ymin, self.ymax, other.ymin, other.ymax);
		BoundingBox::new(xmin, ymin, xmax, ymax)
	}
}

fn crop_axis(amin: f64, amax: f64, bmin: f64, bmax: f64) -> (f64, f64) {
	let lo = amin.max(bmin);
	let hi = amax.min(bmax);
	if lo < hi { (lo, hi) } else { (amin.clamp(bmin, bmax), amin.clamp(bmin, bmax)) }
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;

	#[test]
	fn valid_box_is_strictly_ordered() {
		assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_valid());
		assert!(BoundingBox::<f64>::empty().is_valid());
		assert!(!BoundingBox::new(1.0, 0.0, 0.0, 1.0).is_valid());
	}

	#[test]
	fn crop_degenerates_when_disjoint() {
		let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
		let b = BoundingBox::new(5.0, 5.0, 6.0, 6.0);
		let cropped = a.crop(&b);
		assert_relative_eq!(cropped.xmin, cropped.xmax);
	}

	#[test]
	fn swap_axes_exchanges_components() {
		let bbox = BoundingBox::new(41.0, -5.0, 51.0, 11.0);
		let swapped = bbox.swap_axes();
		assert_relative_eq!(swapped.xmin, -5.0);
		assert_relative_eq!(swapped.ymin, 41.0);
	}

	#[test]
	fn tile_range_box_uses_i64() {
		let b = BoundingBox::<i64>::new(0, 0, 10, 10);
		assert_eq!(b.width(), 10);
	}
}
