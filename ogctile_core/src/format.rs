//! The small closed set of encodings a pyramid or a `GetMap` response can use.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFormat {
	Png,
	Jpeg,
	Tiff,
	Bil,
}

impl TileFormat {
	#[must_use]
	pub fn mime(self) -> &'static str {
		match self {
			TileFormat::Png => "image/png",
			TileFormat::Jpeg => "image/jpeg",
			TileFormat::Tiff => "image/tiff",
			TileFormat::Bil => "image/x-bil",
		}
	}

	/// Parses the `FORMAT`/`TILEMATRIX` MIME value used on the wire, accepting the handful of
	/// aliases OGC clients commonly send (`image/geotiff`, bare `png`/`jpg`).
	#[must_use]
	pub fn parse(value: &str) -> Option<TileFormat> {
		match value.to_ascii_lowercase().as_str() {
			"image/png" | "png" => Some(TileFormat::Png),
			"image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Some(TileFormat::Jpeg),
			"image/tiff" | "image/geotiff" | "tiff" | "tif" => Some(TileFormat::Tiff),
			"image/x-bil" | "image/bil" | "bil" => Some(TileFormat::Bil),
			_ => None,
		}
	}

	#[must_use]
	pub fn is_lossless(self) -> bool {
		!matches!(self, TileFormat::Jpeg)
	}
}

impl fmt::Display for TileFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.mime())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_common_aliases() {
		assert_eq!(TileFormat::parse("image/jpeg"), Some(TileFormat::Jpeg));
		assert_eq!(TileFormat::parse("JPG"), Some(TileFormat::Jpeg));
		assert_eq!(TileFormat::parse("image/x-bil"), Some(TileFormat::Bil));
		assert_eq!(TileFormat::parse("webp"), None);
	}
}
