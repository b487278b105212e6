//! CRS resolution, equivalence and axis-order handling.
//!
//! Construction tries the user's code verbatim, then lowercased, then uppercased against
//! `proj`'s own CRS database; on miss it falls back to a small hard-coded alias table. A
//! `Crs` that resolves carries its canonical `authority:code` form and a geographic
//! definition area fetched from `proj`'s area-of-use metadata.

use crate::bbox::BoundingBox;
use crate::error::CoreError;
use ogctile_derive::context;
use proj::Proj;
use std::sync::Arc;

const WGS84: &str = "epsg:4326";

/// Codes that do not resolve against `proj` directly but are common enough on the wire to
/// warrant a hard-coded alias, mirroring the original `CRS:84 -> epsg:4326` table.
const ALIASES: &[(&str, &str)] = &[("crs:84", "epsg:4326"), ("crs:83", "epsg:4269"), ("crs:27", "epsg:4267")];

#[derive(Debug, Clone)]
pub struct Crs {
	/// The original spelling the client or catalogue supplied, e.g. `"CRS:84"`.
	pub request_code: String,
	/// Canonical lowercase `authority:code` form, e.g. `"epsg:4326"`.
	pub code: String,
	pub definition_area: BoundingBox<f64>,
	pub is_longlat: bool,
	pub is_projlib_compatible: bool,
}

impl PartialEq for Crs {
	fn eq(&self, other: &Self) -> bool {
		self.code == other.code
	}
}

impl Eq for Crs {}

impl Crs {
	/// Resolves a user- or catalogue-supplied CRS code. Tries the code as-is, lowercased,
	/// then uppercased against the projection library, then the alias table.
	#[context("resolving CRS code {request_code:?}")]
	pub fn resolve(request_code: &str) -> anyhow::Result<Crs> {
		let candidates = [request_code.to_string(), request_code.to_lowercase(), request_code.to_uppercase()];

		for candidate in &candidates {
			if let Some(crs) = Self::try_resolve(candidate, request_code) {
				return Ok(crs);
			}
		}

		let lower = request_code.to_lowercase();
		if let Some((_, target)) = ALIASES.iter().find(|(alias, _)| *alias == lower) {
			if let Some(crs) = Self::try_resolve(target, request_code) {
				return Ok(crs);
			}
		}

		Err(CoreError::UnknownCrs(request_code.to_string()).into())
	}

	fn try_resolve(candidate: &str, request_code: &str) -> Option<Crs> {
		let code = normalize_code(candidate)?;
		let projector = Proj::new_known_crs(WGS84, &code, None).ok()?;
		let definition_area = fetch_definition_area(&projector);
		let is_longlat = code.starts_with("epsg:4326") || code.starts_with("crs:84");
		Some(Crs {
			request_code: request_code.to_string(),
			code,
			definition_area,
			is_longlat,
			is_projlib_compatible: true,
		})
	}

	#[must_use]
	pub fn authority(&self) -> &str {
		self.code.split_once(':').map_or(self.code.as_str(), |(a, _)| a)
	}

	#[must_use]
	pub fn identifier(&self) -> &str {
		self.code.split_once(':').map_or("", |(_, id)| id)
	}

	/// WMS 1.3.0 rule: `EPSG:*` geographic CRSes present their bbox/point axes as (lat, lon).
	#[must_use]
	pub fn wire_axis_is_lat_lon(&self) -> bool {
		self.authority() == "epsg" && self.is_longlat
	}

	fn projector(&self) -> anyhow::Result<Proj> {
		Proj::new_known_crs(WGS84, &self.code, None)
			.map_err(|e| CoreError::UnknownCrs(format!("{}: {e}", self.code)).into())
	}

	/// `self.projector()` transforms WGS84 -> this CRS; the inverse direction gives us the
	/// point's geographic coordinates.
	#[context("reprojecting ({x}, {y}) from {} to geographic", self.code)]
	pub fn to_geographic(&self, x: f64, y: f64) -> anyhow::Result<(f64, f64)> {
		self
			.projector()?
			.project((x, y), true)
			.map_err(|_| CoreError::ReprojectionFailed.into())
	}

	#[context("reprojecting ({x}, {y}) from geographic to {}", self.code)]
	pub fn from_geographic(&self, x: f64, y: f64) -> anyhow::Result<(f64, f64)> {
		self
			.projector()?
			.convert((x, y))
			.map_err(|_| CoreError::ReprojectionFailed.into())
	}

	/// Crops `bbox` (in this CRS's geographic definition area's units) against the
	/// definition area, degenerating any non-overlapping axis instead of erroring.
	#[must_use]
	pub fn crop_geographic_bbox(&self, bbox: &BoundingBox<f64>) -> BoundingBox<f64> {
		bbox.crop(&self.definition_area)
	}
}

/// A small, append-only table of authority codes a services configuration declares
/// interchangeable (e.g. an IGNF and an EPSG code for the same datum).
#[derive(Debug, Clone, Default)]
pub struct CrsEquivalenceTable {
	rows: Vec<Vec<String>>,
}

impl CrsEquivalenceTable {
	#[must_use]
	pub fn new(rows: Vec<Vec<String>>) -> Self {
		let rows = rows
			.into_iter()
			.map(|row| row.into_iter().map(|c| c.to_lowercase()).collect())
			.collect();
		CrsEquivalenceTable { rows }
	}

	/// True if `a` and `b` name the same CRS, or appear on the same configured row,
	/// case-insensitively.
	#[must_use]
	pub fn equivalent(&self, a: &str, b: &str) -> bool {
		let (a, b) = (a.to_lowercase(), b.to_lowercase());
		if a == b {
			return true;
		}
		self.rows.iter().any(|row| row.contains(&a) && row.contains(&b))
	}
}

fn normalize_code(candidate: &str) -> Option<String> {
	if candidate.contains(':') { Some(candidate.to_lowercase()) } else { None }
}

fn fetch_definition_area(projector: &Proj) -> BoundingBox<f64> {
	projector
		.area_of_use()
		.ok()
		.and_then(|(area, _)| area)
		.map(|area| BoundingBox::new(area.west, area.south, area.east, area.north))
		.unwrap_or_else(|| BoundingBox::new(-180.0, -90.0, 180.0, 90.0))
}

/// A shared, reference-counted handle suitable for storing inside the read-only catalogue.
pub type SharedCrs = Arc<Crs>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn alias_table_resolves_crs84() {
		let crs = Crs::resolve("CRS:84").expect("CRS:84 should resolve via the alias table");
		assert_eq!(crs.code, "epsg:4326");
		assert_eq!(crs.request_code, "CRS:84");
	}

	#[test]
	fn unknown_code_is_rejected() {
		let err = Crs::resolve("NOPE:0").unwrap_err();
		assert!(err.to_string().contains("resolving CRS code"));
	}

	#[test]
	fn equivalence_is_case_insensitive() {
		let table = CrsEquivalenceTable::new(vec![vec!["IGNF:LAMB93".into(), "EPSG:2154".into()]]);
		assert!(table.equivalent("ignf:lamb93", "epsg:2154"));
		assert!(!table.equivalent("epsg:2154", "epsg:4326"));
	}
}
