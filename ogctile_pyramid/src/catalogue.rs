//! The immutable, read-only set of objects built once at startup and shared across every
//! worker task for the lifetime of the process (§3.3). Nothing here is ever mutated after
//! [`Catalogue::new`] returns — reload means restarting the process.

use crate::layer::Layer;
use crate::services::ServicesConfig;
use crate::tile_matrix::TileMatrixSet;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct Catalogue {
	tile_matrix_sets: BTreeMap<String, Arc<TileMatrixSet>>,
	layers: BTreeMap<String, Arc<Layer>>,
	pub services: ServicesConfig,
}

impl Catalogue {
	#[must_use]
	pub fn new(tile_matrix_sets: Vec<Arc<TileMatrixSet>>, layers: Vec<Arc<Layer>>, services: ServicesConfig) -> Self {
		Catalogue {
			tile_matrix_sets: tile_matrix_sets.into_iter().map(|tms| (tms.id.clone(), tms)).collect(),
			layers: layers.into_iter().map(|l| (l.id.clone(), l)).collect(),
			services,
		}
	}

	#[must_use]
	pub fn layer(&self, id: &str) -> Option<&Arc<Layer>> {
		self.layers.get(id)
	}

	pub fn layers(&self) -> impl Iterator<Item = &Arc<Layer>> {
		self.layers.values()
	}

	#[must_use]
	pub fn tile_matrix_set(&self, id: &str) -> Option<&Arc<TileMatrixSet>> {
		self.tile_matrix_sets.get(id)
	}

	pub fn tile_matrix_sets(&self) -> impl Iterator<Item = &Arc<TileMatrixSet>> {
		self.tile_matrix_sets.values()
	}
}
