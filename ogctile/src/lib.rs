//! Binary-crate plumbing (C8 Server loop): configuration ingestion, the axum/tower HTTP
//! surface, and `main`'s CLI. Everything that can be unit-tested lives here rather than in
//! `main.rs` itself.

pub mod config;
pub mod server;

pub use config::ServerConfig;
pub use server::TileServer;
