//! YAML server configuration (worker count, listen socket, logging, timeouts), mirroring
//! the teacher's `Config`/`server.yml` pattern but with OGC-specific knobs instead of CORS
//! and static-source lists.

use ogctile_derive::context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
	pub ip: String,
	pub port: u16,
	/// Bounds `tower::limit::ConcurrencyLimitLayer`, matching §5's "fixed-size pool of N
	/// worker tasks" on top of tokio's multi-thread runtime.
	pub worker_count: usize,
	pub request_timeout_seconds: u64,
	pub log_level: String,
	pub log_path: Option<PathBuf>,
	/// Directory holding `tile_matrix_sets/`, `styles/` and `layers/` XML subdirectories.
	pub catalogue_dir: PathBuf,
	/// Path to the top-level `services.xml`-shaped descriptor.
	pub services_file: PathBuf,
	/// Tile byte cache capacity (entries); `0` disables the cache, useful for
	/// deterministic tests.
	pub tile_cache_capacity: u64,
	/// Path component of the service endpoint, spliced into `]HOSTNAME/PATH[` placeholders
	/// in capabilities documents.
	pub service_path: String,
}

impl Default for ServerConfig {
	fn default() -> Self {
		ServerConfig {
			ip: "0.0.0.0".into(),
			port: 8080,
			worker_count: num_cpus::get(),
			request_timeout_seconds: 15,
			log_level: "info".into(),
			log_path: None,
			catalogue_dir: PathBuf::from("catalogue"),
			services_file: PathBuf::from("catalogue/services.xml"),
			tile_cache_capacity: 10_000,
			service_path: "/ows".into(),
		}
	}
}

impl ServerConfig {
	#[context("loading server config from {}", path.as_ref().display())]
	pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<ServerConfig> {
		let text = std::fs::read_to_string(path.as_ref())?;
		Ok(serde_yaml_ng::from_str(&text)?)
	}

	pub fn override_optional_ip(&mut self, ip: &Option<String>) {
		if let Some(ip) = ip {
			self.ip = ip.clone();
		}
	}

	pub fn override_optional_port(&mut self, port: &Option<u16>) {
		if let Some(port) = port {
			self.port = *port;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_a_minimal_yaml_document() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("server.yml");
		std::fs::write(&path, "port: 9090\nworker_count: 4\ncatalogue_dir: /data/catalogue\n").unwrap();

		let config = ServerConfig::from_path(&path).unwrap();
		assert_eq!(config.port, 9090);
		assert_eq!(config.worker_count, 4);
		assert_eq!(config.ip, "0.0.0.0");
	}

	#[test]
	fn command_line_overrides_win_over_the_file() {
		let mut config = ServerConfig::default();
		config.override_optional_ip(&Some("127.0.0.1".into()));
		config.override_optional_port(&Some(65000));
		assert_eq!(config.ip, "127.0.0.1");
		assert_eq!(config.port, 65000);
	}
}
