//! Route wiring: both WMS and WMTS answer GET (KVP in the query string) and POST (KVP or
//! XML body, per §4.6 "Parsing") on the same path, since OGC doesn't route by URL shape.

use super::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response as AxumResponse};
use axum::routing::{get, post};
use axum::Router;
use ogctile_request::ParamMap;
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
	Router::new()
		.route("/status", get(|| async { "ready" }))
		.route("/ows", get(handle_get).post(handle_post))
		.with_state(state)
}

fn request_host(headers: &HeaderMap) -> String {
	headers.get(axum::http::header::HOST).and_then(|v| v.to_str().ok()).unwrap_or("localhost").to_string()
}

fn request_scheme(headers: &HeaderMap) -> &'static str {
	// Behind a reverse proxy this would read X-Forwarded-Proto; this server only ever
	// terminates plain HTTP itself.
	let _ = headers;
	"http"
}

async fn handle_get(State(state): State<Arc<AppState>>, headers: HeaderMap, uri: axum::http::Uri) -> AxumResponse {
	let params = ParamMap::parse(uri.query().unwrap_or(""));
	respond(state, headers, &params).await
}

async fn handle_post(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> AxumResponse {
	let text = String::from_utf8_lossy(&body);
	let trimmed = text.trim_start();
	let params = if trimmed.starts_with('<') {
		match parse_xml_body(trimmed) {
			Ok(p) => p,
			Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
		}
	} else {
		ParamMap::parse(&text)
	};
	respond(state, headers, &params).await
}

/// Recognises a bare or SOAP-wrapped `GetCapabilities`/`GetMap`/`GetTile` root element and
/// turns its attributes into the same `ParamMap` a KVP request would produce.
fn parse_xml_body(xml: &str) -> Result<ParamMap, String> {
	let doc = roxmltree::Document::parse(xml).map_err(|e| format!("malformed XML request body: {e}"))?;
	let mut root = doc.root_element();
	if root.tag_name().name().eq_ignore_ascii_case("envelope") {
		root = root
			.children()
			.find(|c| c.is_element() && c.tag_name().name().eq_ignore_ascii_case("body"))
			.and_then(|body| body.children().find(|c| c.is_element()))
			.ok_or("SOAP envelope has no body element")?;
	}

	let mut params = ParamMap::default();
	params.insert("request", root.tag_name().name());
	for attr in root.attributes() {
		params.insert(attr.name(), attr.value());
	}
	Ok(params)
}

async fn respond(state: Arc<AppState>, headers: HeaderMap, params: &ParamMap) -> AxumResponse {
	let host = request_host(&headers);
	let scheme = request_scheme(&headers);
	let response = ogctile_request::dispatch(params, &state.catalogue, &state.capabilities_templates, scheme, &host, &state.service_path).await;

	let mut builder = axum::http::Response::builder().status(response.status);
	builder = builder.header(axum::http::header::CONTENT_TYPE, response.mime);
	builder.body(axum::body::Body::from(response.body.into_vec())).unwrap()
}
