//! Resamples the wrapped node to a new pixel size using one of the six OGC-named kernels,
//! delegating the actual convolution to `fast_image_resize`.

use super::{ImageNode, materialize_u8};
use crate::raster::Raster;
use crate::sample::u8_to_f32;
use fast_image_resize::{FilterType, ResizeAlg, ResizeOptions, Resizer};
use ogctile_core::bbox::BoundingBox;
use ogctile_derive::context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleKernel {
	Nearest,
	Linear,
	Bicubic,
	Lanczos2,
	Lanczos3,
	Lanczos4,
}

impl ResampleKernel {
	/// `fast_image_resize` has no parametrized Lanczos window, so all three `LANCZOS_n`
	/// variants map onto its single `Lanczos3` kernel (documented in SPEC_FULL.md).
	fn resize_alg(self) -> ResizeAlg {
		match self {
			ResampleKernel::Nearest => ResizeAlg::Nearest,
			ResampleKernel::Linear => ResizeAlg::Convolution(FilterType::Bilinear),
			ResampleKernel::Bicubic => ResizeAlg::Convolution(FilterType::CatmullRom),
			ResampleKernel::Lanczos2 | ResampleKernel::Lanczos3 | ResampleKernel::Lanczos4 => {
				ResizeAlg::Convolution(FilterType::Lanczos3)
			}
		}
	}
}

pub struct Resample {
	raster: Raster,
	bbox: BoundingBox<f64>,
}

impl Resample {
	#[context("resampling {}x{} node to {width}x{height} with {kernel:?}", inner.width(), inner.height())]
	pub fn new(inner: &dyn ImageNode, width: u32, height: u32, kernel: ResampleKernel) -> anyhow::Result<Self> {
		let src_raster = materialize_u8(inner);
		let src_image = src_raster.to_dynamic_image();
		let mut dst_image = image::DynamicImage::new(width, height, src_image.color());
		Resizer::new().resize(&src_image, &mut dst_image, &ResizeOptions::default().resize_alg(kernel.resize_alg()))?;
		let raster = Raster::from_dynamic_image(&dst_image);
		Ok(Resample { raster, bbox: inner.bbox() })
	}
}

impl ImageNode for Resample {
	fn width(&self) -> u32 {
		self.raster.width
	}

	fn height(&self) -> u32 {
		self.raster.height
	}

	fn channels(&self) -> u8 {
		self.raster.channels
	}

	fn bbox(&self) -> BoundingBox<f64> {
		self.bbox
	}

	fn getline(&self, buf: &mut [f32], y: u32) -> usize {
		if y >= self.raster.height {
			return 0;
		}
		let channels = self.raster.channels as usize;
		for x in 0..self.raster.width {
			let pixel = self.raster.pixel(x, y);
			let dst = &mut buf[x as usize * channels..(x as usize + 1) * channels];
			for (d, s) in dst.iter_mut().zip(pixel) {
				*d = u8_to_f32(*s);
			}
		}
		self.raster.width as usize * channels
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::TileImage;

	#[test]
	fn resamples_to_the_requested_dimensions() {
		let raster = Raster::new(4, 4, 3, &[10, 20, 30]);
		let tile = TileImage::whole(raster, BoundingBox::new(0.0, 0.0, 4.0, 4.0));
		let resampled = Resample::new(&tile, 2, 2, ResampleKernel::Nearest).unwrap();
		assert_eq!((resampled.width(), resampled.height()), (2, 2));
	}
}
