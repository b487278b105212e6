//! BIL codec: raw scanlines, no header at all. Used for elevation/DTM layers where the
//! client already knows width/height/channel count out of band (the layer's declared
//! format and the tile matrix it was requested against).

use super::Encoder;
use crate::raster::Raster;

pub struct BilEncoder {
	raster: Raster,
	cursor: usize,
}

impl BilEncoder {
	#[must_use]
	pub fn new(raster: Raster) -> Self {
		BilEncoder { raster, cursor: 0 }
	}
}

impl Encoder for BilEncoder {
	fn read(&mut self, buf: &mut [u8]) -> anyhow::Result<usize> {
		let remaining = &self.raster.data[self.cursor..];
		let n = remaining.len().min(buf.len());
		buf[..n].copy_from_slice(&remaining[..n]);
		self.cursor += n;
		Ok(n)
	}

	fn eof(&self) -> bool {
		self.cursor >= self.raster.data.len()
	}

	fn mime(&self) -> &'static str {
		"application/bil"
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::pull_all;

	#[test]
	fn emits_the_raw_scanlines_with_no_header() {
		let raster = Raster::new(2, 2, 1, &[42]);
		let mut encoder = BilEncoder::new(raster.clone());
		let bytes = pull_all(&mut encoder);
		assert_eq!(bytes, raster.data);
	}

	#[test]
	fn drains_in_small_increments() {
		let raster = Raster::new(4, 4, 1, &[1, 2, 3, 4]);
		let mut encoder = BilEncoder::new(raster.clone());
		let mut out = Vec::new();
		let mut buf = [0u8; 3];
		while !encoder.eof() {
			let n = encoder.read(&mut buf).unwrap();
			out.extend_from_slice(&buf[..n]);
		}
		assert_eq!(out, raster.data);
	}
}
