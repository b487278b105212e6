//! Local on-disk slab storage: an `sw x sh` block of tiles per file, headed by an
//! offset/size table in scan order (§4.3, §6.3).

use super::TileSource;
use byteorder::{BigEndian, ReadBytesExt};
use ogctile_core::blob::Blob;
use ogctile_derive::context;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Base-36-ish alphabet used to format slab coordinates into directory path components,
/// matching the "configurable radix depth" layout from §6.3.
const RADIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy)]
pub struct SlabLayout {
	pub slab_width: u32,
	pub slab_height: u32,
	pub path_depth: u32,
}

pub struct SlabTileSource {
	base_path: PathBuf,
	layout: SlabLayout,
}

impl SlabTileSource {
	#[must_use]
	pub fn new(base_path: impl Into<PathBuf>, layout: SlabLayout) -> Self {
		SlabTileSource { base_path: base_path.into(), layout }
	}

	fn slab_path(&self, slab_col: i64, slab_row: i64) -> PathBuf {
		let index = slab_row.unsigned_abs() * 1_000_000 + slab_col.unsigned_abs();
		let encoded = to_radix36(index);
		let mut path = self.base_path.clone();
		let depth = self.layout.path_depth.max(1) as usize;
		let chars: Vec<char> = encoded.chars().collect();
		let split = chars.len().saturating_sub(depth * 3);
		for chunk in chars[split..].chunks(3) {
			path.push(chunk.iter().collect::<String>());
		}
		path.with_extension("slab")
	}

	#[context("reading slab tile ({col}, {row}) from {}", self.base_path.display())]
	fn read_sync(&self, col: i64, row: i64) -> anyhow::Result<Option<Vec<u8>>> {
		let (sw, sh) = (i64::from(self.layout.slab_width), i64::from(self.layout.slab_height));
		let slab_col = col.div_euclid(sw);
		let slab_row = row.div_euclid(sh);
		let within = (col.rem_euclid(sw) + row.rem_euclid(sh) * sw) as u64;

		let path = self.slab_path(slab_col, slab_row);
		let Ok(mut file) = std::fs::File::open(&path) else {
			return Ok(None);
		};

		let tile_count = (sw * sh) as u64;
		file.seek(SeekFrom::Start(within * 4))?;
		let offset = file.read_u32::<BigEndian>()?;
		file.seek(SeekFrom::Start((tile_count + within) * 4))?;
		let size = file.read_u32::<BigEndian>()?;

		if offset == 0 && size == 0 {
			return Ok(None);
		}

		file.seek(SeekFrom::Start(u64::from(offset)))?;
		let mut buf = vec![0u8; size as usize];
		file.read_exact(&mut buf)?;
		Ok(Some(buf))
	}
}

#[async_trait::async_trait]
impl TileSource for SlabTileSource {
	async fn get_tile(&self, col: i64, row: i64) -> anyhow::Result<Option<Blob>> {
		let base = self.base_path.clone();
		let layout = self.layout;
		let result = tokio::task::spawn_blocking(move || {
			SlabTileSource { base_path: base, layout }.read_sync(col, row)
		})
		.await??;
		Ok(result.map(Blob::from))
	}
}

fn to_radix36(mut value: u64) -> String {
	if value == 0 {
		return "0".to_string();
	}
	let mut digits = Vec::new();
	while value > 0 {
		digits.push(RADIX_ALPHABET[(value % 36) as usize]);
		value /= 36;
	}
	digits.reverse();
	String::from_utf8(digits).unwrap()
}
