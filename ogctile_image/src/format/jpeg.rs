//! JPEG codec: lossy, used for orthophoto layers. The underlying library encodes the whole
//! image in one pass; the pull contract's minimum-buffer floor (§4.4, §9 Open Question) is
//! enforced here at 1024 bytes per `read` call — below that the encoder makes no progress
//! and returns `0` rather than a partial chunk.

use super::Encoder;
use crate::raster::Raster;
use image::{ImageEncoder, codecs::jpeg};
use ogctile_core::error::CoreError;
use ogctile_derive::context;

/// The minimum buffer size this encoder is willing to make progress with per `read` call.
pub const MIN_READ_BUFFER: usize = 1024;

#[context("decoding JPEG tile ({} bytes)", bytes.len())]
pub fn decode(bytes: &[u8]) -> anyhow::Result<Raster> {
	let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
		.map_err(|e| CoreError::DecodeError(e.to_string()))?;
	Ok(Raster::from_dynamic_image(&image))
}

pub struct JpegEncoder {
	raster: Raster,
	quality: u8,
	buffer: Vec<u8>,
	cursor: usize,
	encoded: bool,
}

impl JpegEncoder {
	#[must_use]
	pub fn new(raster: Raster) -> Self {
		Self::with_quality(raster, 85)
	}

	#[must_use]
	pub fn with_quality(raster: Raster, quality: u8) -> Self {
		JpegEncoder { raster, quality, buffer: Vec::new(), cursor: 0, encoded: false }
	}

	#[context("encoding {}x{} tile as JPEG (q={})", self.raster.width, self.raster.height, self.quality)]
	fn encode_eagerly(&mut self) -> anyhow::Result<()> {
		// JPEG has no alpha; flatten an RGBA/LA tile onto white before handing it to the codec.
		let image = if self.raster.channels == 4 || self.raster.channels == 2 {
			flatten_on_white(&self.raster)
		} else {
			self.raster.to_dynamic_image()
		};
		let mut buffer = Vec::new();
		jpeg::JpegEncoder::new_with_quality(&mut buffer, self.quality)
			.write_image(image.as_bytes(), image.width(), image.height(), image.color().into())
			.map_err(|e| CoreError::EncodeError(e.to_string()))?;
		self.buffer = buffer;
		self.encoded = true;
		Ok(())
	}
}

fn flatten_on_white(raster: &Raster) -> image::DynamicImage {
	let channels = raster.channels as usize;
	let mut rgb = Vec::with_capacity(raster.width as usize * raster.height as usize * 3);
	for px in raster.data.chunks(channels) {
		let alpha = u16::from(px[channels - 1]);
		let bg = 255u16 - alpha;
		for &sample in &px[..channels - 1] {
			rgb.push((((u16::from(sample) * alpha) + 255 * bg + 127) / 255) as u8);
		}
		if channels == 2 {
			// grey+alpha: duplicate the flattened grey value into three channels
			let v = rgb[rgb.len() - 1];
			rgb.push(v);
			rgb.push(v);
		}
	}
	image::DynamicImage::ImageRgb8(image::RgbImage::from_raw(raster.width, raster.height, rgb).unwrap())
}

impl Encoder for JpegEncoder {
	fn read(&mut self, buf: &mut [u8]) -> anyhow::Result<usize> {
		if buf.len() < MIN_READ_BUFFER {
			return Ok(0);
		}
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
		"image/jpeg"
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn refuses_progress_below_the_minimum_buffer() {
		let raster = Raster::new(4, 4, 3, &[10, 20, 30]);
		let mut encoder = JpegEncoder::new(raster);
		let mut small = vec![0u8; 16];
		assert_eq!(encoder.read(&mut small).unwrap(), 0);
		assert!(!encoder.eof());
	}

	#[test]
	fn drains_fully_with_a_large_enough_buffer() {
		let raster = Raster::new(8, 8, 3, &[10, 20, 30]);
		let mut encoder = JpegEncoder::new(raster);
		let mut buf = vec![0u8; 64 * 1024];
		let mut total = 0;
		while !encoder.eof() {
			total += encoder.read(&mut buf).unwrap();
		}
		assert!(total > 0);
	}
}
