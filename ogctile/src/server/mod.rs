//! HTTP server lifecycle (C8), adapted from the teacher's `tile_server.rs`: the middleware
//! protection stack and start/stop idiom are kept verbatim in spirit, but the dynamic
//! `DashMap`/`ArcSwap` hot-reload state is replaced with a plain immutable `Arc<Catalogue>`
//! — §3.3 makes the catalogue build-once/read-only, so there's nothing left to swap.

mod routes;

use crate::config::ServerConfig;
use anyhow::Result;
use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{BoxError, Router};
use ogctile_derive::context;
use ogctile_pyramid::catalogue::Catalogue;
use ogctile_request::capabilities::CapabilitiesTemplate;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::{ServiceBuilder, buffer::BufferLayer, limit::ConcurrencyLimitLayer, load_shed::LoadShedLayer, timeout::TimeoutLayer};
use tower_http::catch_panic::CatchPanicLayer;

/// One pre-rendered capabilities template per `(service, version)`, built once at startup
/// per §4.7.
pub type CapabilitiesTemplates = Arc<[(&'static str, &'static str, CapabilitiesTemplate)]>;

pub struct AppState {
	pub catalogue: Arc<Catalogue>,
	pub capabilities_templates: CapabilitiesTemplates,
	pub service_path: String,
}

pub struct TileServer {
	ip: String,
	port: u16,
	worker_count: usize,
	request_timeout: std::time::Duration,
	state: Arc<AppState>,
	exit_signal: Option<oneshot::Sender<()>>,
	join: Option<tokio::task::JoinHandle<()>>,
}

impl TileServer {
	#[must_use]
	pub fn new(config: &ServerConfig, catalogue: Arc<Catalogue>, capabilities_templates: CapabilitiesTemplates) -> TileServer {
		TileServer {
			ip: config.ip.clone(),
			port: config.port,
			worker_count: config.worker_count.max(1),
			request_timeout: std::time::Duration::from_secs(config.request_timeout_seconds),
			state: Arc::new(AppState { catalogue, capabilities_templates, service_path: config.service_path.clone() }),
			exit_signal: None,
			join: None,
		}
	}

	#[must_use]
	pub fn get_port(&self) -> u16 {
		self.port
	}

	/// Starts listening. Idempotent: starting an already-running server stops it first.
	#[context("starting server")]
	pub async fn start(&mut self) -> Result<()> {
		if self.exit_signal.is_some() || self.join.is_some() {
			self.stop().await;
		}

		log::info!("starting server");

		let router = routes::build_router(self.state.clone());

		// From innermost to outermost: LoadShed -> ConcurrencyLimit -> Buffer -> Timeout ->
		// CatchPanic -> HandleError, matching the teacher's `tile_server.rs` layering.
		let overload_handler = HandleErrorLayer::new(|_err: BoxError| async move {
			(StatusCode::SERVICE_UNAVAILABLE, "server overloaded, try later").into_response()
		});
		let protection = ServiceBuilder::new()
			.layer(overload_handler)
			.layer(CatchPanicLayer::new())
			.layer(TimeoutLayer::new(self.request_timeout))
			.layer(BufferLayer::new(512))
			.layer(ConcurrencyLimitLayer::new(self.worker_count))
			.layer(LoadShedLayer::new());

		let router = router.layer(protection);

		let addr = format!("{}:{}", self.ip, self.port);
		log::info!("server binding on {addr}");
		let listener = TcpListener::bind(&addr).await?;
		if self.port == 0 {
			self.port = listener.local_addr()?.port();
		}

		let (tx, rx) = oneshot::channel::<()>();
		let handle = tokio::spawn(async move {
			if let Err(err) = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(async { rx.await.ok(); }).await {
				log::error!("server task exited with error: {err}");
			}
		});

		self.exit_signal = Some(tx);
		self.join = Some(handle);
		Ok(())
	}

	/// Signals graceful shutdown and waits (with a timeout) for the listening task to exit.
	/// Idempotent: stopping a server that isn't running is a no-op.
	pub async fn stop(&mut self) {
		if self.exit_signal.is_none() && self.join.is_none() {
			return;
		}
		log::info!("stopping server");
		if let Some(tx) = self.exit_signal.take() {
			let _ = tx.send(());
		}
		if let Some(handle) = self.join.take() {
			match tokio::time::timeout(std::time::Duration::from_secs(10), handle).await {
				Ok(result) => {
					if let Err(e) = result {
						log::warn!("server task join error: {e}");
					}
				}
				Err(_) => log::warn!("server task did not shut down within timeout"),
			}
		}
	}
}
