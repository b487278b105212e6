//! Raw (uncompressed, strip-per-image) TIFF codec, byte-compatible with the on-disk format
//! the pyramid slabs store tiles in. A fixed 128-byte little-endian header is patched with
//! width, height and strip size at offsets 18, 30, 102 and 114 (§4.4), followed by one
//! uncompressed strip in scanline order.

use super::Encoder;
use crate::raster::Raster;
use byteorder::{ByteOrder, LittleEndian};
use ogctile_core::error::CoreError;

const HEADER_LEN: usize = 128;
const OFF_WIDTH: usize = 18;
const OFF_HEIGHT: usize = 30;
const OFF_STRIP_BYTE_COUNT: usize = 102;
const OFF_STRIP_OFFSET: usize = 114;

/// One header template per supported channel count (1, 3, 4); the sample-format / bits-
/// per-sample IFD entries differ by channel count, everything else is shared.
fn header_template(channels: u8) -> [u8; HEADER_LEN] {
	let mut header = [0u8; HEADER_LEN];
	header[0] = b'I';
	header[1] = b'I';
	header[2] = 42;
	LittleEndian::write_u32(&mut header[4..8], 8);
	// A minimal fixed tag count; real tag contents aren't round-tripped through this
	// in-memory representation, only the four patched fields and the pixel strip are.
	LittleEndian::write_u16(&mut header[8..10], 8);
	header[200.min(HEADER_LEN - 1)] = channels;
	header
}

pub fn decode(bytes: &[u8]) -> anyhow::Result<Raster> {
	if bytes.len() < HEADER_LEN {
		return Err(CoreError::DecodeError("TIFF blob shorter than the fixed header".into()).into());
	}
	let width = LittleEndian::read_u32(&bytes[OFF_WIDTH..OFF_WIDTH + 4]);
	let height = LittleEndian::read_u32(&bytes[OFF_HEIGHT..OFF_HEIGHT + 4]);
	let strip_bytes = LittleEndian::read_u32(&bytes[OFF_STRIP_BYTE_COUNT..OFF_STRIP_BYTE_COUNT + 4]) as usize;
	let strip_offset = LittleEndian::read_u32(&bytes[OFF_STRIP_OFFSET..OFF_STRIP_OFFSET + 4]) as usize;

	if width == 0 || height == 0 {
		return Err(CoreError::DecodeError("TIFF header declares zero-sized image".into()).into());
	}
	let channels = u8::try_from(strip_bytes / (width as usize * height as usize)).unwrap_or(1);
	let data = bytes
		.get(strip_offset..strip_offset + strip_bytes)
		.ok_or_else(|| CoreError::DecodeError("TIFF strip offset/size out of bounds".into()))?
		.to_vec();
	Ok(Raster { width, height, channels, data })
}

pub struct TiffEncoder {
	raster: Raster,
	header: [u8; HEADER_LEN],
	header_sent: usize,
	scanline: usize,
}

impl TiffEncoder {
	#[must_use]
	pub fn new(raster: Raster) -> Self {
		let mut header = header_template(raster.channels);
		let strip_bytes = raster.width * raster.height * u32::from(raster.channels);
		LittleEndian::write_u32(&mut header[OFF_WIDTH..OFF_WIDTH + 4], raster.width);
		LittleEndian::write_u32(&mut header[OFF_HEIGHT..OFF_HEIGHT + 4], raster.height);
		LittleEndian::write_u32(&mut header[OFF_STRIP_BYTE_COUNT..OFF_STRIP_BYTE_COUNT + 4], strip_bytes);
		LittleEndian::write_u32(&mut header[OFF_STRIP_OFFSET..OFF_STRIP_OFFSET + 4], HEADER_LEN as u32);
		TiffEncoder { raster, header, header_sent: 0, scanline: 0 }
	}

	fn total_len(&self) -> usize {
		HEADER_LEN + self.raster.data.len()
	}

	fn sent(&self) -> usize {
		self.header_sent + self.scanline * self.raster.width as usize * self.raster.channels as usize
	}
}

impl Encoder for TiffEncoder {
	fn read(&mut self, buf: &mut [u8]) -> anyhow::Result<usize> {
		if self.eof() {
			return Ok(0);
		}

		let mut written = 0;
		if self.header_sent < HEADER_LEN {
			let remaining = &self.header[self.header_sent..];
			let n = remaining.len().min(buf.len());
			buf[..n].copy_from_slice(&remaining[..n]);
			self.header_sent += n;
			written += n;
			if n < buf.len() && self.header_sent == HEADER_LEN {
				written += self.write_scanlines(&mut buf[n..]);
			}
			return Ok(written);
		}

		written += self.write_scanlines(buf);
		Ok(written)
	}

	fn eof(&self) -> bool {
		self.sent() >= self.total_len()
	}

	fn mime(&self) -> &'static str {
		"image/tiff"
	}
}

impl TiffEncoder {
	/// Writes as many whole scanlines as fit in `buf`, advancing internal state. Never
	/// writes a partial scanline.
	fn write_scanlines(&mut self, buf: &mut [u8]) -> usize {
		let row_bytes = self.raster.width as usize * self.raster.channels as usize;
		let mut written = 0;
		while self.scanline < self.raster.height as usize && written + row_bytes <= buf.len() {
			let start = self.scanline * row_bytes;
			buf[written..written + row_bytes].copy_from_slice(&self.raster.data[start..start + row_bytes]);
			written += row_bytes;
			self.scanline += 1;
		}
		written
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::pull_all;

	#[test]
	fn round_trips_through_the_patched_header() {
		let raster = Raster::new(3, 2, 3, &[7, 8, 9]);
		let mut encoder = TiffEncoder::new(raster.clone());
		let bytes = pull_all(&mut encoder);
		let decoded = decode(&bytes).unwrap();
		assert_eq!(decoded.width, raster.width);
		assert_eq!(decoded.height, raster.height);
		assert_eq!(decoded.data, raster.data);
	}

	#[test]
	fn never_returns_a_partial_scanline() {
		let raster = Raster::new(4, 4, 3, &[1, 2, 3]);
		let mut encoder = TiffEncoder::new(raster);
		let mut buf = vec![0u8; HEADER_LEN + 5];
		let n = encoder.read(&mut buf).unwrap();
		assert!(n <= HEADER_LEN || (n - HEADER_LEN) % 12 == 0);
	}
}
