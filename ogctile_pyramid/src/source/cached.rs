//! An in-memory LRU in front of another `TileSource` (§2 ambient "Tile byte cache"),
//! keyed by `(col, row)` within the level it wraps. Purely a performance layer: a miss
//! falls through to the wrapped source exactly as if the cache weren't there.

use super::TileSource;
use moka::future::Cache;
use ogctile_core::blob::Blob;
use std::sync::Arc;

pub struct CachedTileSource {
	inner: Arc<dyn TileSource>,
	cache: Cache<(i64, i64), Option<Blob>>,
}

impl CachedTileSource {
	#[must_use]
	pub fn new(inner: Arc<dyn TileSource>, max_capacity: u64) -> Self {
		CachedTileSource { inner, cache: Cache::new(max_capacity) }
	}
}

#[async_trait::async_trait]
impl TileSource for CachedTileSource {
	async fn get_tile(&self, col: i64, row: i64) -> anyhow::Result<Option<Blob>> {
		if let Some(hit) = self.cache.get(&(col, row)).await {
			return Ok(hit);
		}
		let value = self.inner.get_tile(col, row).await?;
		self.cache.insert((col, row), value.clone()).await;
		Ok(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct CountingSource {
		reads: AtomicUsize,
		value: Blob,
	}

	#[async_trait::async_trait]
	impl TileSource for CountingSource {
		async fn get_tile(&self, _col: i64, _row: i64) -> anyhow::Result<Option<Blob>> {
			self.reads.fetch_add(1, Ordering::SeqCst);
			Ok(Some(self.value.clone()))
		}
	}

	#[tokio::test]
	async fn repeated_reads_of_the_same_tile_hit_the_cache() {
		let counting = Arc::new(CountingSource { reads: AtomicUsize::new(0), value: Blob::from(vec![1, 2, 3]) });
		let cached = CachedTileSource::new(counting.clone(), 64);

		cached.get_tile(1, 1).await.unwrap();
		cached.get_tile(1, 1).await.unwrap();
		cached.get_tile(1, 1).await.unwrap();

		assert_eq!(counting.reads.load(Ordering::SeqCst), 1);
	}
}
