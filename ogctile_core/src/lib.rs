//! Shared primitives for the ogctile server: byte blobs, bounding boxes, CRS handling and
//! the reprojection grid. Nothing in this crate knows about pyramids, tiles or HTTP.

pub mod blob;
pub mod bbox;
pub mod crs;
pub mod error;
pub mod format;
pub mod grid;

pub use blob::Blob;
pub use bbox::BoundingBox;
pub use crs::Crs;
pub use error::CoreError;
pub use format::TileFormat;
pub use grid::Grid;
