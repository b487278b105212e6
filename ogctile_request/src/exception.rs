//! OGC `ServiceException` responses: every request-local `CoreError` (§7) becomes one of
//! these rather than propagating past the dispatch boundary.

use ogctile_core::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
	Wms,
	Wmts,
}

impl Service {
	/// WMS tradition answers exceptions with `200`; WMTS answers with `400` (§6.1).
	#[must_use]
	pub fn exception_http_status(self) -> u16 {
		match self {
			Service::Wms => 200,
			Service::Wmts => 400,
		}
	}

	#[must_use]
	pub fn mime(self) -> &'static str {
		"application/vnd.ogc.se_xml"
	}
}

#[derive(Debug, Clone)]
pub struct ServiceException {
	pub code: &'static str,
	pub locator: Option<String>,
	pub message: String,
}

impl ServiceException {
	#[must_use]
	pub fn from_core_error(err: &CoreError) -> ServiceException {
		ServiceException {
			code: err.exception_code(),
			locator: err.locator().map(str::to_owned),
			message: err.to_string(),
		}
	}

	#[must_use]
	pub fn to_xml(&self) -> String {
		let locator = self
			.locator
			.as_deref()
			.map(|l| format!(" locator=\"{}\"", escape_xml(l)))
			.unwrap_or_default();
		format!(
			"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
			<ServiceExceptionReport version=\"1.3.0\" xmlns=\"http://www.opengis.net/ogc\">\n\
			<ServiceException code=\"{}\"{}>{}</ServiceException>\n\
			</ServiceExceptionReport>\n",
			self.code,
			locator,
			escape_xml(&self.message)
		)
	}
}

fn escape_xml(s: &str) -> String {
	s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn maps_missing_parameter_to_the_right_code_and_locator() {
		let err = CoreError::MissingParameter("BBOX".into());
		let exc = ServiceException::from_core_error(&err);
		assert_eq!(exc.code, "MissingParameterValue");
		assert_eq!(exc.locator.as_deref(), Some("BBOX"));
	}

	#[test]
	fn xml_escapes_the_message() {
		let exc = ServiceException { code: "InvalidParameterValue", locator: None, message: "bad <value> & \"stuff\"".into() };
		let xml = exc.to_xml();
		assert!(xml.contains("bad &lt;value&gt; &amp; &quot;stuff&quot;"));
	}

	#[test]
	fn wms_exceptions_answer_with_http_200() {
		assert_eq!(Service::Wms.exception_http_status(), 200);
		assert_eq!(Service::Wmts.exception_http_status(), 400);
	}
}
