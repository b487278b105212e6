//! Same pixel data as the wrapped node, with a shrunken `bbox` — used when an
//! `ExtendedCompound`'s union needs to be re-tagged to a tighter geographic extent without
//! recomputing pixels.

use super::ImageNode;
use ogctile_core::bbox::BoundingBox;

pub struct Crop<N: ImageNode> {
	inner: N,
	bbox: BoundingBox<f64>,
}

impl<N: ImageNode> Crop<N> {
	#[must_use]
	pub fn new(inner: N, bbox: BoundingBox<f64>) -> Self {
		Crop { inner, bbox }
	}
}

impl<N: ImageNode> ImageNode for Crop<N> {
	fn width(&self) -> u32 {
		self.inner.width()
	}

	fn height(&self) -> u32 {
		self.inner.height()
	}

	fn channels(&self) -> u8 {
		self.inner.channels()
	}

	fn bbox(&self) -> BoundingBox<f64> {
		self.bbox
	}

	fn getline(&self, buf: &mut [f32], y: u32) -> usize {
		self.inner.getline(buf, y)
	}
}
