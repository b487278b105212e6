//! PNG codec: lossless, used for layers with transparency or sharp edges (style palettes,
//! nodata tiles). Wraps the `image` crate; the whole buffer is encoded eagerly the first
//! time `read` is called with room for it, then drained across subsequent calls.

use super::Encoder;
use crate::raster::Raster;
use image::{ImageEncoder, codecs::png};
use ogctile_core::error::CoreError;
use ogctile_derive::context;

#[context("decoding PNG tile ({} bytes)", bytes.len())]
pub fn decode(bytes: &[u8]) -> anyhow::Result<Raster> {
	let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
		.map_err(|e| CoreError::DecodeError(e.to_string()))?;
	Ok(Raster::from_dynamic_image(&image))
}

pub struct PngEncoder {
	raster: Raster,
	buffer: Vec<u8>,
	cursor: usize,
	encoded: bool,
}

impl PngEncoder {
	#[must_use]
	pub fn new(raster: Raster) -> Self {
		PngEncoder { raster, buffer: Vec::new(), cursor: 0, encoded: false }
	}

	#[context("encoding {}x{} tile as PNG", self.raster.width, self.raster.height)]
	fn encode_eagerly(&mut self) -> anyhow::Result<()> {
		let color = match self.raster.channels {
			1 => image::ExtendedColorType::L8,
			2 => image::ExtendedColorType::La8,
			3 => image::ExtendedColorType::Rgb8,
			_ => image::ExtendedColorType::Rgba8,
		};
		let mut buffer = Vec::new();
		png::PngEncoder::new(&mut buffer)
			.write_image(&self.raster.data, self.raster.width, self.raster.height, color)
			.map_err(|e| CoreError::EncodeError(e.to_string()))?;
		self.buffer = buffer;
		self.encoded = true;
		Ok(())
	}
}

impl Encoder for PngEncoder {
	fn read(&mut self, buf: &mut [u8]) -> anyhow::Result<usize> {
		if !self.encoded {
			self.encode_eagerly()?;
		}
		let remaining = &self.buffer[self.cursor..];
		let n = remaining.len().min(buf.len());
		buf[..n].copy_from_slice(&remaining[..n]);
		self.cursor += n;
		Ok(n)
	}

	fn eof(&self) -> bool {
		self.encoded && self.cursor >= self.buffer.len()
	}

	fn mime(&self) -> &'static str {
		"image/png"
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::pull_all;

	#[test]
	fn round_trips_losslessly() {
		let raster = Raster::new(4, 4, 3, &[10, 20, 30]);
		let mut encoder = PngEncoder::new(raster.clone());
		let bytes = pull_all(&mut encoder);
		let decoded = decode(&bytes).unwrap();
		assert_eq!(decoded.data, raster.data);
	}
}
