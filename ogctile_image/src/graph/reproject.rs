//! Resamples through a `Grid` of per-output-pixel source coordinates, delegating the
//! actual pixel fetch to a nearest-neighbour lookup on the wrapped node (the node itself is
//! normally pre-overscanned by the assembly pipeline so footprint effects are negligible).

use super::ImageNode;
use ogctile_core::bbox::BoundingBox;
use ogctile_core::grid::Grid;

pub struct Reproject<N: ImageNode> {
	inner: N,
	grid: Grid,
	width: u32,
	height: u32,
	bbox: BoundingBox<f64>,
}

impl<N: ImageNode> Reproject<N> {
	#[must_use]
	pub fn new(inner: N, grid: Grid, width: u32, height: u32, bbox: BoundingBox<f64>) -> Self {
		Reproject { inner, grid, width, height, bbox }
	}

	/// Maps a source-CRS coordinate to a pixel index in `inner`, clamped to its extents.
	fn source_pixel(&self, sx: f64, sy: f64) -> (u32, u32) {
		let src_bbox = self.inner.bbox();
		let u = ((sx - src_bbox.xmin) / (src_bbox.xmax - src_bbox.xmin)).clamp(0.0, 0.999_999);
		let v = ((src_bbox.ymax - sy) / (src_bbox.ymax - src_bbox.ymin)).clamp(0.0, 0.999_999);
		((u * f64::from(self.inner.width())) as u32, (v * f64::from(self.inner.height())) as u32)
	}
}

impl<N: ImageNode> ImageNode for Reproject<N> {
	fn width(&self) -> u32 {
		self.width
	}

	fn height(&self) -> u32 {
		self.height
	}

	fn channels(&self) -> u8 {
		self.inner.channels()
	}

	fn bbox(&self) -> BoundingBox<f64> {
		self.bbox
	}

	fn getline(&self, buf: &mut [f32], y: u32) -> usize {
		let channels = self.channels() as usize;
		let mut src_line = vec![0f32; self.inner.line_len()];
		let v = (f64::from(y) + 0.5) / f64::from(self.height);

		for x in 0..self.width {
			let u = (f64::from(x) + 0.5) / f64::from(self.width);
			let (sx, sy) = self.grid.sample(u, v);
			let (px, py) = self.source_pixel(sx, sy);
			self.inner.getline(&mut src_line, py);
			let src_off = px as usize * channels;
			let dst_off = x as usize * channels;
			buf[dst_off..dst_off + channels].copy_from_slice(&src_line[src_off..src_off + channels]);
		}
		self.width as usize * channels
	}
}
