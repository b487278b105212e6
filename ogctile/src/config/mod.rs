//! Configuration ingestion (§4.8 catalogue loader plus the YAML server config): everything
//! needed to go from a directory on disk to a running `TileServer`.

pub mod capabilities_doc;
pub mod catalogue;
pub mod server_config;

pub use server_config::ServerConfig;
