//! Resolves `(col, row)` within a level to encoded tile bytes: opens, seeks, reads. Two
//! implementations share this trait — local slab files (§6.3) and remote codestream
//! sources fetched over HTTP.

pub mod cached;
pub mod remote;
pub mod slab;

use ogctile_core::blob::Blob;

pub use cached::CachedTileSource;
pub use remote::RemoteTileSource;
pub use slab::SlabTileSource;

/// A source of encoded tile bytes for one level. `None` means "absent" (promote to
/// nodata); `Err` means a read failure (also promoted to nodata, but logged).
#[async_trait::async_trait]
pub trait TileSource: Send + Sync {
	async fn get_tile(&self, col: i64, row: i64) -> anyhow::Result<Option<Blob>>;
}
