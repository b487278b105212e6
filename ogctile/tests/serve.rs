//! End-to-end scenarios (§8): a real catalogue on disk, a real listening server, real HTTP
//! requests via `reqwest`, mirroring the teacher's `versatiles/tests/serve.rs` harness.

use ogctile::config::{catalogue, capabilities_doc, ServerConfig};
use ogctile::TileServer;
use ogctile_request::capabilities::CapabilitiesTemplate;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

fn write_file(path: &Path, contents: &str) {
	std::fs::create_dir_all(path.parent().unwrap()).unwrap();
	std::fs::File::create(path).unwrap().write_all(contents.as_bytes()).unwrap();
}

fn write_slab(path: &Path, sw: u32, sh: u32, tiles: &[(usize, &[u8])]) {
	std::fs::create_dir_all(path.parent().unwrap()).unwrap();
	let count = (sw * sh) as usize;
	let mut offsets = vec![0u32; count];
	let mut sizes = vec![0u32; count];
	let mut body = Vec::new();
	let header_len = count * 8;
	for &(index, bytes) in tiles {
		offsets[index] = (header_len + body.len()) as u32;
		sizes[index] = bytes.len() as u32;
		body.extend_from_slice(bytes);
	}
	let mut file = std::fs::File::create(path).unwrap();
	for o in &offsets {
		file.write_all(&o.to_be_bytes()).unwrap();
	}
	for s in &sizes {
		file.write_all(&s.to_be_bytes()).unwrap();
	}
	file.write_all(&body).unwrap();
}

fn encode_png(width: u32, height: u32) -> Vec<u8> {
	let raster = ogctile_image::Raster::new(width, height, 3, &[200, 100, 50]);
	let encoder = ogctile_image::format::make_encoder(ogctile_core::format::TileFormat::Png, raster);
	ogctile_image::format::encode_to_blob(encoder).unwrap().into_vec()
}

async fn start_test_server() -> (TileServer, String) {
	let dir = tempfile::tempdir().unwrap();
	let root = dir.path();

	write_file(&root.join("services.xml"), "<services><layerLimit>10</layerLimit></services>");
	write_file(
		&root.join("tile_matrix_sets/PM.xml"),
		r#"<tileMatrixSet id="PM"><crs>epsg:3857</crs><tileMatrix id="0" resolution="156543.03392804097" x0="-20037508.342789244" y0="20037508.342789244" tileWidth="256" tileHeight="256" matrixWidth="1" matrixHeight="1"/></tileMatrixSet>"#,
	);
	write_file(&root.join("styles/normal.xml"), r#"<style id="normal"><title>Normal</title></style>"#);

	// `SlabTileSource` computes the on-disk filename itself (base36-encoded slab coordinates
	// under the configured path depth); for slab (0, 0) at depth 1 that's `{base}/0.slab`.
	let slab_dir = root.join("slabs");
	std::fs::create_dir_all(&slab_dir).unwrap();
	write_slab(&slab_dir.join("0.slab"), 1, 1, &[(0, &encode_png(256, 256))]);

	write_file(
		&root.join("layers/ortho.xml"),
		&format!(
			r#"<layer id="ortho" authorised="wms wmts">
				<title>Ortho</title>
				<pyramid tileMatrixSet="PM" format="png" channels="3">
					<level id="0" nodata="0,0,0">
						<slab path="{}" slabWidth="1" slabHeight="1" pathDepth="1"/>
					</level>
				</pyramid>
				<styles><style>normal</style></styles>
				<minRes>1</minRes>
				<maxRes>1000000</maxRes>
				<wmsCrsList><crs>epsg:3857</crs></wmsCrsList>
				<geographicBBox xmin="-180" ymin="-85" xmax="180" ymax="85"/>
				<nativeBBox xmin="-20037508.34" ymin="-20037508.34" xmax="20037508.34" ymax="20037508.34"/>
			</layer>"#,
			root.join("slabs").display()
		),
	);

	let catalogue = Arc::new(catalogue::load(&root.join("."), &root.join("services.xml"), 0).unwrap());
	let templates: Vec<(&'static str, &'static str, CapabilitiesTemplate)> = vec![
		("wms", "1.1.1", CapabilitiesTemplate::build(&capabilities_doc::build_wms(&catalogue, "1.1.1"))),
		("wms", "1.3.0", CapabilitiesTemplate::build(&capabilities_doc::build_wms(&catalogue, "1.3.0"))),
		("wmts", "1.0.0", CapabilitiesTemplate::build(&capabilities_doc::build_wmts(&catalogue))),
	];

	let mut config = ServerConfig::default();
	config.ip = "127.0.0.1".into();
	config.port = 0;

	let mut server = TileServer::new(&config, catalogue, Arc::from(templates.into_boxed_slice()));
	server.start().await.unwrap();
	let host = format!("http://127.0.0.1:{}", server.get_port());
	(server, host)
}

#[tokio::test]
async fn wmts_get_tile_returns_the_stored_png() {
	let (mut server, host) = start_test_server().await;

	let resp = reqwest::get(format!("{host}/ows?SERVICE=WMTS&REQUEST=GetTile&VERSION=1.0.0&LAYER=ortho&STYLE=normal&TILEMATRIXSET=PM&TILEMATRIX=0&TILEROW=0&TILECOL=0&FORMAT=image/png")).await.unwrap();
	assert_eq!(resp.status(), 200);
	assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
	let bytes = resp.bytes().await.unwrap();
	assert!(!bytes.is_empty());

	server.stop().await;
}

#[tokio::test]
async fn wmts_get_tile_out_of_range_honours_nodata_as_http_status() {
	let (mut server, host) = start_test_server().await;

	let resp = reqwest::get(format!("{host}/ows?SERVICE=WMTS&REQUEST=GetTile&VERSION=1.0.0&LAYER=ortho&STYLE=normal&TILEMATRIXSET=PM&TILEMATRIX=0&TILEROW=99&TILECOL=99&FORMAT=image/png&nodataashttpstatus=1")).await.unwrap();
	assert_eq!(resp.status(), 404);

	server.stop().await;
}

#[tokio::test]
async fn wms_get_map_native_crs_returns_an_image() {
	let (mut server, host) = start_test_server().await;

	let url = format!(
		"{host}/ows?SERVICE=WMS&REQUEST=GetMap&VERSION=1.1.1&LAYERS=ortho&STYLES=&CRS=EPSG:3857&BBOX=-20037508.34,-20037508.34,20037508.34,20037508.34&WIDTH=256&HEIGHT=256&FORMAT=image/png"
	);
	let resp = reqwest::get(url).await.unwrap();
	assert_eq!(resp.status(), 200);
	assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");

	server.stop().await;
}

#[tokio::test]
async fn get_capabilities_splices_the_request_host_into_the_document() {
	let (mut server, host) = start_test_server().await;

	let resp = reqwest::get(format!("{host}/ows?SERVICE=WMS&REQUEST=GetCapabilities&VERSION=1.1.1")).await.unwrap();
	assert_eq!(resp.status(), 200);
	let body = resp.text().await.unwrap();
	assert!(body.contains("127.0.0.1"), "capabilities document should splice in the request host:\n{body}");
	assert!(!body.contains("]HOSTNAME["), "no placeholder token should survive rendering");

	server.stop().await;
}

#[tokio::test]
async fn unknown_layer_answers_with_a_service_exception_not_a_crash() {
	let (mut server, host) = start_test_server().await;

	let url = format!("{host}/ows?SERVICE=WMS&REQUEST=GetMap&VERSION=1.1.1&LAYERS=nope&STYLES=&CRS=EPSG:3857&BBOX=0,0,1,1&WIDTH=16&HEIGHT=16&FORMAT=image/png");
	let resp = reqwest::get(url).await.unwrap();
	assert_eq!(resp.status(), 200, "WMS exceptions answer with HTTP 200 per spec");
	let body = resp.text().await.unwrap();
	assert!(body.contains("LayerNotDefined"));

	server.stop().await;
}
