//! On-demand / remote pyramid backing: fetches encoded tile bytes from an upstream HTTP
//! tile service instead of a local slab file. Implements the same [`TileSource`] contract
//! so level selection and nodata promotion are unaffected by where the bytes come from.

use super::TileSource;
use ogctile_core::blob::Blob;
use ogctile_derive::context;

pub struct RemoteTileSource {
	client: reqwest::Client,
	url_template: String,
}

impl RemoteTileSource {
	/// `url_template` contains `{col}` and `{row}` placeholders.
	#[must_use]
	pub fn new(url_template: impl Into<String>) -> Self {
		RemoteTileSource {
			client: reqwest::Client::new(),
			url_template: url_template.into(),
		}
	}

	fn url_for(&self, col: i64, row: i64) -> String {
		self.url_template.replace("{col}", &col.to_string()).replace("{row}", &row.to_string())
	}

	#[context("fetching remote tile ({col}, {row})")]
	async fn fetch_tile(&self, col: i64, row: i64) -> anyhow::Result<Option<Blob>> {
		let response = self.client.get(self.url_for(col, row)).send().await?;
		if response.status() == reqwest::StatusCode::NOT_FOUND {
			return Ok(None);
		}
		let bytes = response.error_for_status()?.bytes().await?;
		Ok(Some(Blob::from(bytes.to_vec())))
	}
}

#[async_trait::async_trait]
impl TileSource for RemoteTileSource {
	async fn get_tile(&self, col: i64, row: i64) -> anyhow::Result<Option<Blob>> {
		self.fetch_tile(col, row).await
	}
}
