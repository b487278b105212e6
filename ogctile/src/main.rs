//! CLI entry point. Unlike the teacher's multi-subcommand tool, this binary only ever runs
//! one server mode — `spec.md`'s external interface is "start the server, point it at a
//! catalogue", not a toolbox of conversions — so the CLI is a flat set of overrides rather
//! than a `Subcommand` enum.

use anyhow::{Context, Result};
use clap::Parser;
use ogctile::config::{capabilities_doc, catalogue};
use ogctile::{ServerConfig, TileServer};
use ogctile_request::capabilities::CapabilitiesTemplate;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "An OGC WMS/WMTS raster tile server for pre-tiled image pyramids.", long_about = None)]
struct Cli {
	/// Path to the YAML server configuration file.
	#[arg(short = 'c', long, value_name = "FILE")]
	config: Option<PathBuf>,

	/// Serve via socket ip, overriding the config file.
	#[arg(short = 'i', long)]
	ip: Option<String>,

	/// Serve via port, overriding the config file.
	#[arg(short, long)]
	port: Option<u16>,

	/// Log level: error, warn, info, debug or trace. Overrides the config file.
	#[arg(short = 'l', long)]
	log_level: Option<String>,

	/// Path to a log file; stderr is used when unset.
	#[arg(long)]
	log_path: Option<PathBuf>,
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	let mut config = match &cli.config {
		Some(path) => ServerConfig::from_path(path)?,
		None => ServerConfig::default(),
	};
	config.override_optional_ip(&cli.ip);
	config.override_optional_port(&cli.port);
	if let Some(level) = &cli.log_level {
		config.log_level = level.clone();
	}
	if cli.log_path.is_some() {
		config.log_path = cli.log_path.clone();
	}

	init_logging(&config)?;

	let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().worker_threads(config.worker_count.max(1)).build()?;
	runtime.block_on(run(config))
}

fn init_logging(config: &ServerConfig) -> Result<()> {
	let level = config.log_level.parse().unwrap_or(log::LevelFilter::Info);
	let mut builder = env_logger::Builder::new();
	builder.filter_level(level).format_timestamp(None);
	if let Some(path) = &config.log_path {
		let file = std::fs::OpenOptions::new().create(true).append(true).open(path).with_context(|| format!("opening log file {}", path.display()))?;
		builder.target(env_logger::Target::Pipe(Box::new(file)));
	}
	builder.init();
	Ok(())
}

async fn run(config: ServerConfig) -> Result<()> {
	let catalogue = Arc::new(catalogue::load(&config.catalogue_dir, &config.services_file, config.tile_cache_capacity)?);
	log::info!("loaded catalogue: {} layer(s), {} tile matrix set(s)", catalogue.layers().count(), catalogue.tile_matrix_sets().count());

	let templates: Vec<(&'static str, &'static str, CapabilitiesTemplate)> = vec![
		("wms", "1.1.1", CapabilitiesTemplate::build(&capabilities_doc::build_wms(&catalogue, "1.1.1"))),
		("wms", "1.3.0", CapabilitiesTemplate::build(&capabilities_doc::build_wms(&catalogue, "1.3.0"))),
		("wmts", "1.0.0", CapabilitiesTemplate::build(&capabilities_doc::build_wmts(&catalogue))),
	];

	let mut server = TileServer::new(&config, catalogue, Arc::from(templates.into_boxed_slice()));
	server.start().await?;
	log::info!("listening on {}:{}", config.ip, server.get_port());

	tokio::signal::ctrl_c().await.ok();
	server.stop().await;
	Ok(())
}
