//! Wraps one decoded tile, exposing only the interior window a caller asked for via a
//! `(left, top)` pixel offset.

use super::ImageNode;
use crate::raster::Raster;
use crate::sample::u8_to_f32;
use ogctile_core::bbox::BoundingBox;

pub struct TileImage {
	raster: Raster,
	left: u32,
	top: u32,
	width: u32,
	height: u32,
	bbox: BoundingBox<f64>,
}

impl TileImage {
	#[must_use]
	pub fn new(raster: Raster, left: u32, top: u32, width: u32, height: u32, bbox: BoundingBox<f64>) -> Self {
		TileImage { raster, left, top, width, height, bbox }
	}

	#[must_use]
	pub fn whole(raster: Raster, bbox: BoundingBox<f64>) -> Self {
		let (w, h) = (raster.width, raster.height);
		TileImage::new(raster, 0, 0, w, h, bbox)
	}
}

impl ImageNode for TileImage {
	fn width(&self) -> u32 {
		self.width
	}

	fn height(&self) -> u32 {
		self.height
	}

	fn channels(&self) -> u8 {
		self.raster.channels
	}

	fn bbox(&self) -> BoundingBox<f64> {
		self.bbox
	}

	fn getline(&self, buf: &mut [f32], y: u32) -> usize {
		let src_y = self.top + y;
		if src_y >= self.raster.height {
			return 0;
		}
		let channels = self.raster.channels as usize;
		for x in 0..self.width {
			let pixel = self.raster.pixel(self.left + x, src_y);
			let dst = &mut buf[x as usize * channels..(x as usize + 1) * channels];
			for (d, s) in dst.iter_mut().zip(pixel) {
				*d = u8_to_f32(*s);
			}
		}
		self.width as usize * channels
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exposes_only_the_requested_window() {
		let raster = Raster::from_bytes(4, 4, 1, &[
			0, 1, 2, 3, //
			4, 5, 6, 7, //
			8, 9, 10, 11, //
			12, 13, 14, 15,
		]);
		let bbox = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
		let tile = TileImage::new(raster, 1, 1, 2, 2, bbox);
		let mut buf = vec![0f32; 2];
		tile.getline(&mut buf, 0);
		assert_eq!(buf, vec![5.0 / 255.0, 6.0 / 255.0]);
	}
}
