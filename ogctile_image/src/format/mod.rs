//! Codecs (C4): full-buffer decode plus a pull-stream encoder contract matched by every
//! format below (`read`/`eof`/`mime`/`http_status`).

pub mod bil;
pub mod jpeg;
pub mod png;
pub mod tiff;

use crate::raster::Raster;
use ogctile_core::format::TileFormat;

/// A stateful pull encoder. `read` may return `0` without that meaning end-of-stream; the
/// caller loops until [`Encoder::eof`].
pub trait Encoder {
	fn read(&mut self, buf: &mut [u8]) -> anyhow::Result<usize>;
	fn eof(&self) -> bool;
	fn mime(&self) -> &'static str;
	fn http_status(&self) -> u16 {
		200
	}
}

pub fn decode(format: TileFormat, bytes: &[u8]) -> anyhow::Result<Raster> {
	match format {
		TileFormat::Png => png::decode(bytes),
		TileFormat::Jpeg => jpeg::decode(bytes),
		TileFormat::Tiff => tiff::decode(bytes),
		TileFormat::Bil => Err(ogctile_core::error::CoreError::DecodeError("BIL has no header to infer dimensions from".into()).into()),
	}
}

#[must_use]
pub fn make_encoder(format: TileFormat, raster: Raster) -> Box<dyn Encoder> {
	match format {
		TileFormat::Png => Box::new(png::PngEncoder::new(raster)),
		TileFormat::Jpeg => Box::new(jpeg::JpegEncoder::new(raster)),
		TileFormat::Tiff => Box::new(tiff::TiffEncoder::new(raster)),
		TileFormat::Bil => Box::new(bil::BilEncoder::new(raster)),
	}
}

/// Drains `encoder` into one `Blob`, used where the caller wants the whole body at once
/// (e.g. assembling a `GetTile` response) rather than streaming scanline by scanline.
pub fn encode_to_blob(mut encoder: Box<dyn Encoder>) -> anyhow::Result<ogctile_core::blob::Blob> {
	let mut out = Vec::new();
	let mut buf = vec![0u8; 64 * 1024];
	while !encoder.eof() {
		let n = encoder.read(&mut buf)?;
		out.extend_from_slice(&buf[..n]);
	}
	Ok(ogctile_core::blob::Blob::from(out))
}
