//! The pyramid data model (C2), tile source resolution (C3) and the read-only startup
//! catalogue that ties pyramids to layers, styles and tile matrix sets.

pub mod catalogue;
pub mod layer;
pub mod level;
pub mod pyramid;
pub mod services;
pub mod source;
pub mod style;
pub mod tile_matrix;

pub use catalogue::Catalogue;
pub use layer::Layer;
pub use level::Level;
pub use pyramid::Pyramid;
pub use services::ServicesConfig;
pub use source::TileSource;
pub use style::Style;
pub use tile_matrix::{TileMatrix, TileMatrixSet};
