//! The lazy image graph (C5): nodes compose by delegating `getline` calls to the sources
//! they wrap, so no full image is ever materialised until an encoder pulls it scanline by
//! scanline.

pub mod crop;
pub mod empty;
pub mod extended_compound;
pub mod reproject;
pub mod resample;
pub mod tile_image;

pub use crop::Crop;
pub use empty::Empty;
pub use extended_compound::ExtendedCompound;
pub use reproject::Reproject;
pub use resample::{Resample, ResampleKernel};
pub use tile_image::TileImage;

use ogctile_core::bbox::BoundingBox;

/// A lazy image node. `getline` fills one row of pixel-interleaved `f32` samples
/// (channel-major within the pixel, e.g. `[r,g,b,a, r,g,b,a, ...]`) and returns the number
/// of samples written (`width * channels` on success).
pub trait ImageNode: Send + Sync {
	fn width(&self) -> u32;
	fn height(&self) -> u32;
	fn channels(&self) -> u8;
	fn bbox(&self) -> BoundingBox<f64>;
	fn getline(&self, buf: &mut [f32], y: u32) -> usize;

	fn line_len(&self) -> usize {
		self.width() as usize * self.channels() as usize
	}
}

impl<T: ImageNode + ?Sized> ImageNode for Box<T> {
	fn width(&self) -> u32 {
		(**self).width()
	}

	fn height(&self) -> u32 {
		(**self).height()
	}

	fn channels(&self) -> u8 {
		(**self).channels()
	}

	fn bbox(&self) -> BoundingBox<f64> {
		(**self).bbox()
	}

	fn getline(&self, buf: &mut [f32], y: u32) -> usize {
		(**self).getline(buf, y)
	}
}

/// Pulls every scanline of `node` into one contiguous `u8` buffer, for handing to an
/// encoder that wants the whole image (PNG/JPEG via the `image` crate).
#[must_use]
pub fn materialize_u8(node: &dyn ImageNode) -> crate::raster::Raster {
	let (w, h, c) = (node.width(), node.height(), node.channels());
	let mut data = vec![0u8; w as usize * h as usize * c as usize];
	let mut line = vec![0f32; node.line_len()];
	for y in 0..h {
		node.getline(&mut line, y);
		let start = y as usize * w as usize * c as usize;
		crate::sample::buf_f32_to_u8(&line, &mut data[start..start + line.len()]);
	}
	crate::raster::Raster { width: w, height: h, channels: c, data }
}
