//! Top-level operation dispatch (§4.6 "Dispatch"): matches `REQUEST` case-insensitively,
//! routes to the right parser/assembler, and turns any `CoreError` into a `ServiceException`
//! before it reaches the caller.

use crate::exception::{Service, ServiceException};
use crate::kvp::ParamMap;
use crate::request::{GetMapRequest, parse_get_feature_info, parse_get_map, parse_get_tile};
use crate::{assembly, capabilities};
use ogctile_core::bbox::BoundingBox;
use ogctile_core::blob::Blob;
use ogctile_core::error::CoreError;
use ogctile_image::graph::{ImageNode, ResampleKernel};
use ogctile_pyramid::catalogue::Catalogue;

pub struct Response {
	pub status: u16,
	pub mime: String,
	pub body: Blob,
}

impl Response {
	fn ok(mime: impl Into<String>, body: Blob) -> Response {
		Response { status: 200, mime: mime.into(), body }
	}

	fn exception(service: Service, exc: &ServiceException) -> Response {
		Response { status: service.exception_http_status(), mime: service.mime().to_string(), body: Blob::from(exc.to_xml()) }
	}
}

/// Dispatches one already-parsed KVP request. `capabilities_templates` holds the
/// pre-built `CapabilitiesTemplate` per `(service, version)`, built once at startup.
pub async fn dispatch(
	params: &ParamMap,
	catalogue: &Catalogue,
	capabilities_templates: &[(&str, &str, capabilities::CapabilitiesTemplate)],
	request_scheme: &str,
	request_host: &str,
	service_path: &str,
) -> Response {
	let service = params.get_lower("service").unwrap_or_default();
	let operation = params.get("request").unwrap_or_default();

	let wire_service = match service.as_str() {
		"wms" => Service::Wms,
		"wmts" => Service::Wmts,
		_ => Service::Wms,
	};

	match operation.to_ascii_lowercase().as_str() {
		"getcapabilities" => handle_get_capabilities(&service, capabilities_templates, request_scheme, request_host, service_path),
		"getmap" => handle_get_map(params, catalogue).await,
		"gettile" => handle_get_tile(params, catalogue).await,
		"getfeatureinfo" => handle_get_feature_info(params, catalogue, &service).await,
		"" => Response::exception(wire_service, &ServiceException::from_core_error(&CoreError::MissingParameter("REQUEST".into()))),
		other => Response::exception(wire_service, &ServiceException::from_core_error(&CoreError::OperationNotSupported(other.to_string()))),
	}
}

fn handle_get_capabilities(
	service: &str,
	templates: &[(&str, &str, capabilities::CapabilitiesTemplate)],
	scheme: &str,
	host: &str,
	service_path: &str,
) -> Response {
	let Some((_, _, template)) = templates.iter().find(|(s, _, _)| *s == service) else {
		return Response::exception(Service::Wms, &ServiceException::from_core_error(&CoreError::InvalidParameter { name: "SERVICE".into(), reason: format!("unknown service '{service}'") }));
	};
	Response::ok("text/xml", Blob::from(template.render(scheme, host, service_path)))
}

async fn handle_get_map(params: &ParamMap, catalogue: &Catalogue) -> Response {
	let request = match parse_get_map(params, catalogue, catalogue.services.layer_limit) {
		Ok(r) => r,
		Err(e) => return respond_error(Service::Wms, e),
	};

	let kernel = ResampleKernel::Bicubic;
	let native_crs = request.crs.code == request.layer.pyramid.tms.crs.code;
	let assembled = if native_crs {
		assembly::assemble_get_map_native(&request.layer, &request.bbox, request.width, request.height, kernel).await
	} else {
		assembly::assemble_get_map_reprojected(&request.layer, &request.crs, &request.bbox, request.width, request.height, kernel).await
	};

	// A failed reprojection is local to this request and answers with an empty image,
	// not a service exception (§7).
	let node: Box<dyn ogctile_image::graph::ImageNode> = match assembled {
		Ok(n) => n,
		Err(e) if matches!(e.downcast_ref::<CoreError>(), Some(CoreError::ReprojectionFailed)) => {
			let channels = request.layer.pyramid.channels;
			Box::new(ogctile_image::graph::Empty::new(request.width, request.height, channels, request.bbox, &vec![0.0; channels as usize]))
		}
		Err(e) => return respond_error(Service::Wms, e),
	};

	match assembly::encode_node(node.as_ref(), request.format) {
		Ok(body) => Response::ok(request.format.mime(), body),
		Err(e) => respond_error(Service::Wms, e),
	}
}

async fn handle_get_tile(params: &ParamMap, catalogue: &Catalogue) -> Response {
	let request = match parse_get_tile(params, catalogue) {
		Ok(r) => r,
		Err(e) => return respond_error(Service::Wmts, e),
	};

	let level = request.layer.pyramid.level(&request.tile_matrix).expect("validated by parse_get_tile");
	let in_range = level.limits.contains(request.tile_col, request.tile_row);

	if !in_range {
		if request.nodata_as_http_status {
			return Response { status: 404, mime: request.format.mime().to_string(), body: Blob::new_empty() };
		}
		return match assembly::transcode_nodata(level, request.format) {
			Ok(body) => Response::ok(request.format.mime(), body),
			Err(_) => Response::ok(level.format.mime(), level.nodata_tile.clone()),
		};
	}

	match assembly::fetch_tile(level, request.tile_col, request.tile_row, request.format).await {
		Ok(Some(body)) => Response::ok(request.format.mime(), body),
		Ok(None) => match assembly::transcode_nodata(level, request.format) {
			Ok(body) => Response::ok(request.format.mime(), body),
			Err(_) => Response::ok(level.format.mime(), level.nodata_tile.clone()),
		},
		Err(e) => respond_error(Service::Wmts, e),
	}
}

async fn handle_get_feature_info(params: &ParamMap, catalogue: &Catalogue, service: &str) -> Response {
	if service.eq_ignore_ascii_case("wmts") {
		return handle_wmts_get_feature_info(params, catalogue).await;
	}

	let request = match parse_get_feature_info(params, catalogue, catalogue.services.layer_limit) {
		Ok(r) => r,
		Err(e) => return respond_error(Service::Wms, e),
	};
	let map = &request.map;

	// Same assembly pipeline as `GetMap`, narrowed to the single requested pixel's own
	// sub-bbox at 1x1 logical size (§9 item 3).
	let pixel_bbox = pixel_sub_bbox(&map.bbox, map.width, map.height, request.pixel_x, request.pixel_y);
	let kernel = ResampleKernel::Bicubic;
	let native_crs = map.crs.code == map.layer.pyramid.tms.crs.code;
	let assembled = if native_crs {
		assembly::assemble_get_map_native(&map.layer, &pixel_bbox, 1, 1, kernel).await
	} else {
		assembly::assemble_get_map_reprojected(&map.layer, &map.crs, &pixel_bbox, 1, 1, kernel).await
	};

	let node: Box<dyn ImageNode> = match assembled {
		Ok(n) => n,
		Err(e) if matches!(e.downcast_ref::<CoreError>(), Some(CoreError::ReprojectionFailed)) => {
			return Response::ok("text/plain", Blob::from(format!("layer={}\nno data at the requested point (outside the CRS's definition area)\n", map.layer.id)));
		}
		Err(e) => return respond_error(Service::Wms, e),
	};

	Response::ok("text/plain", Blob::from(feature_info_body(map, &request.query_layers, node.as_ref())))
}

/// The bbox of pixel `(px, py)` within an image of `width x height` pixels covering `bbox`,
/// used to assemble at 1x1 logical size for `GetFeatureInfo`'s pixel/palette lookup.
fn pixel_sub_bbox(bbox: &BoundingBox<f64>, width: u32, height: u32, px: u32, py: u32) -> BoundingBox<f64> {
	let step_x = bbox.width() / f64::from(width);
	let step_y = bbox.height() / f64::from(height);
	let xmin = bbox.xmin + f64::from(px) * step_x;
	let ymax = bbox.ymax - f64::from(py) * step_y;
	BoundingBox::new(xmin, ymax - step_y, xmin + step_x, ymax)
}

/// Reports the sampled value, and the palette colour it maps to when the layer's active
/// style carries one, for every layer named in `QUERY_LAYERS` (they all resolve to the same
/// assembled pixel, since `GetFeatureInfo` has exactly one assembly pipeline per request).
fn feature_info_body(map: &GetMapRequest, query_layers: &[std::sync::Arc<ogctile_pyramid::layer::Layer>], node: &dyn ImageNode) -> String {
	use std::fmt::Write as _;

	let mut line = vec![0f32; node.line_len()];
	node.getline(&mut line, 0);
	let style = map.layer.style(&map.style_id);

	let mut out = String::new();
	for layer in query_layers {
		let _ = writeln!(out, "layer={}", layer.id);
		match style.and_then(|s| s.palette.as_ref()) {
			Some(palette) => {
				let [r, g, b, a] = palette.apply(f64::from(line[0]));
				let _ = writeln!(out, "value={}\ncolor=rgba({r},{g},{b},{a})", line[0]);
			}
			None => {
				let values: Vec<String> = line.iter().map(ToString::to_string).collect();
				let _ = writeln!(out, "values={}", values.join(","));
			}
		}
	}
	out
}

/// Delegates to the layer's configured upstream endpoint, proxying the request's own
/// parameters verbatim and streaming the response straight back.
async fn handle_wmts_get_feature_info(params: &ParamMap, catalogue: &Catalogue) -> Response {
	let layer_id = params.get("layer").unwrap_or_default();
	let Some(layer) = catalogue.layer(layer_id) else {
		return respond_error(Service::Wmts, CoreError::UnknownLayer(layer_id.to_string()).into());
	};
	let Some(upstream_url_template) = layer.gfi_config.upstream_url_template.clone() else {
		return Response { status: 501, mime: "text/plain".into(), body: Blob::from("GetFeatureInfo is not configured for this layer") };
	};

	let separator = if upstream_url_template.contains('?') { "&" } else { "?" };
	let url = format!("{upstream_url_template}{separator}{}", params.to_query_string());

	let client = reqwest::Client::new();
	match client.get(&url).send().await {
		Ok(response) => {
			let status = response.status().as_u16();
			let mime = response
				.headers()
				.get(reqwest::header::CONTENT_TYPE)
				.and_then(|v| v.to_str().ok())
				.unwrap_or("application/octet-stream")
				.to_string();
			match response.bytes().await {
				Ok(bytes) => Response { status, mime, body: Blob::from(bytes.to_vec()) },
				Err(e) => {
					log::warn!("reading upstream GetFeatureInfo response from {url} failed: {e}");
					Response { status: 502, mime: "text/plain".into(), body: Blob::from("upstream GetFeatureInfo response could not be read") }
				}
			}
		}
		Err(e) => {
			log::warn!("proxying GetFeatureInfo to {url} failed: {e}");
			Response { status: 502, mime: "text/plain".into(), body: Blob::from("upstream GetFeatureInfo request failed") }
		}
	}
}

fn respond_error(service: Service, err: anyhow::Error) -> Response {
	let core_err = err.downcast_ref::<CoreError>();
	let exc = core_err.map_or_else(|| ServiceException { code: "NoApplicableCode", locator: None, message: err.to_string() }, ServiceException::from_core_error);
	log::warn!("request failed: {err:#}");
	Response::exception(service, &exc)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pixel_sub_bbox_covers_one_pixel_cell() {
		let bbox = BoundingBox::new(0.0, 0.0, 256.0, 256.0);

		let top_left = pixel_sub_bbox(&bbox, 256, 256, 0, 0);
		assert_eq!((top_left.xmin, top_left.xmax), (0.0, 1.0));
		assert_eq!((top_left.ymin, top_left.ymax), (255.0, 256.0), "row 0 is the top, not the bottom");

		let bottom_right = pixel_sub_bbox(&bbox, 256, 256, 255, 255);
		assert_eq!((bottom_right.xmin, bottom_right.xmax), (255.0, 256.0));
		assert_eq!((bottom_right.ymin, bottom_right.ymax), (0.0, 1.0));
	}
}
