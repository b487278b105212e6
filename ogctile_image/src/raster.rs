//! A decoded, fully materialised 8-bit-per-channel image — the boundary type between the
//! codec layer and the lazy image graph.

use image::{DynamicImage, GenericImageView};

#[derive(Debug, Clone)]
pub struct Raster {
	pub width: u32,
	pub height: u32,
	pub channels: u8,
	pub data: Vec<u8>,
}

impl Raster {
	#[must_use]
	pub fn new(width: u32, height: u32, channels: u8, fill: &[u8]) -> Self {
		let mut data = Vec::with_capacity((width * height) as usize * channels as usize);
		for _ in 0..(width * height) {
			data.extend_from_slice(fill);
		}
		Raster { width, height, channels, data }
	}

	#[must_use]
	pub fn from_dynamic_image(image: &DynamicImage) -> Self {
		let (width, height) = image.dimensions();
		let channels = u8::try_from(image.color().channel_count()).unwrap_or(4);
		Raster { width, height, channels, data: image.to_rgba8().into_raw()[..].to_vec() }
			.reinterpret_channels(image)
	}

	/// `DynamicImage::to_rgba8` always yields 4 channels; re-derive the true channel layout
	/// from the source color type so grey/RGB tiles don't balloon into RGBA internally.
	fn reinterpret_channels(self, image: &DynamicImage) -> Self {
		match image.color() {
			image::ColorType::L8 => Raster::from_bytes(self.width, self.height, 1, &image.to_luma8().into_raw()),
			image::ColorType::La8 => Raster::from_bytes(self.width, self.height, 2, &image.to_luma_alpha8().into_raw()),
			image::ColorType::Rgb8 => Raster::from_bytes(self.width, self.height, 3, &image.to_rgb8().into_raw()),
			_ => self,
		}
	}

	#[must_use]
	pub fn from_bytes(width: u32, height: u32, channels: u8, data: &[u8]) -> Self {
		Raster { width, height, channels, data: data.to_vec() }
	}

	#[must_use]
	pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
		let idx = ((y * self.width + x) * u32::from(self.channels)) as usize;
		&self.data[idx..idx + self.channels as usize]
	}

	#[must_use]
	pub fn to_dynamic_image(&self) -> DynamicImage {
		match self.channels {
			1 => DynamicImage::ImageLuma8(image::GrayImage::from_raw(self.width, self.height, self.data.clone()).unwrap()),
			2 => DynamicImage::ImageLumaA8(image::GrayAlphaImage::from_raw(self.width, self.height, self.data.clone()).unwrap()),
			3 => DynamicImage::ImageRgb8(image::RgbImage::from_raw(self.width, self.height, self.data.clone()).unwrap()),
			_ => DynamicImage::ImageRgba8(image::RgbaImage::from_raw(self.width, self.height, self.data.clone()).unwrap()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fills_every_pixel_with_the_given_value() {
		let raster = Raster::new(2, 2, 3, &[1, 2, 3]);
		assert_eq!(raster.pixel(1, 1), &[1, 2, 3]);
	}
}
