//! The request-local error taxonomy from the OGC error-handling design: every variant here
//! maps to exactly one row of the server's error table and to one `ServiceException` code.

use thiserror::Error;

/// Errors that can surface while parsing, validating or dispatching a single request.
///
/// Tile-local failures (`TileReadError`, `DecodeError`) are caught by the pyramid/image
/// layers and promoted to nodata before they ever reach this type; `CoreError` only carries
/// what must become a response (a `ServiceException`, an empty image, or a closed
/// connection).
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("malformed request: {0}")]
	ParseError(String),

	#[error("missing required parameter: {0}")]
	MissingParameter(String),

	#[error("invalid value for parameter {name}: {reason}")]
	InvalidParameter { name: String, reason: String },

	#[error("unknown layer: {0}")]
	UnknownLayer(String),

	#[error("unknown style: {0}")]
	UnknownStyle(String),

	#[error("unknown or incompatible CRS: {0}")]
	UnknownCrs(String),

	#[error("unsupported format: {0}")]
	UnknownFormat(String),

	#[error("no suitable level found for the requested resolution")]
	NoSuitableLevel,

	#[error("reprojection failed: could not map the requested bounding box")]
	ReprojectionFailed,

	#[error("operation not supported: {0}")]
	OperationNotSupported(String),

	#[error("tile read failed: {0}")]
	TileReadError(String),

	#[error("tile decode failed: {0}")]
	DecodeError(String),

	#[error("encode failed mid-response: {0}")]
	EncodeError(String),

	#[error("internal error: {0}")]
	InternalError(String),
}

impl CoreError {
	/// The fixed OGC `ServiceException` code this error reports as, per the error table.
	#[must_use]
	pub fn exception_code(&self) -> &'static str {
		match self {
			CoreError::ParseError(_) => "MissingOrInvalidParameter",
			CoreError::MissingParameter(_) => "MissingParameterValue",
			CoreError::InvalidParameter { .. } => "InvalidParameterValue",
			CoreError::UnknownLayer(_) => "LayerNotDefined",
			CoreError::UnknownStyle(_) => "StyleNotDefined",
			CoreError::UnknownCrs(_) => "InvalidCRS",
			CoreError::UnknownFormat(_) => "InvalidFormat",
			CoreError::NoSuitableLevel | CoreError::InternalError(_) => "NoApplicableCode",
			CoreError::OperationNotSupported(_) => "OperationNotSupported",
			CoreError::ReprojectionFailed | CoreError::TileReadError(_) | CoreError::DecodeError(_) => "NoApplicableCode",
			CoreError::EncodeError(_) => "NoApplicableCode",
		}
	}

	/// The OGC parameter name this exception should report as its `locator`, if any.
	#[must_use]
	pub fn locator(&self) -> Option<&str> {
		match self {
			CoreError::MissingParameter(name) | CoreError::InvalidParameter { name, .. } => Some(name),
			CoreError::UnknownLayer(_) => Some("LAYERS"),
			CoreError::UnknownStyle(_) => Some("STYLES"),
			CoreError::UnknownCrs(_) => Some("CRS"),
			CoreError::UnknownFormat(_) => Some("FORMAT"),
			_ => None,
		}
	}

	/// True when this error is fatal for the request (the connection should be closed rather
	/// than carry a `ServiceException` body).
	#[must_use]
	pub fn is_fatal(&self) -> bool {
		matches!(self, CoreError::EncodeError(_) | CoreError::InternalError(_))
	}
}
