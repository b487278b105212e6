//! A thin wrapper around `Vec<u8>` used for tile bytes and encoded responses throughout the
//! server: slab reads, codec output, and XML/exception bodies all pass through a [`Blob`].

use std::fmt::Debug;
use std::ops::Range;

#[derive(Clone, PartialEq, Eq, Default)]
pub struct Blob(Vec<u8>);

impl Blob {
	#[must_use]
	pub fn new_empty() -> Blob {
		Blob(Vec::new())
	}

	#[must_use]
	pub fn with_capacity(capacity: usize) -> Blob {
		Blob(Vec::with_capacity(capacity))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	#[must_use]
	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}

	#[must_use]
	pub fn as_vec(&self) -> &Vec<u8> {
		&self.0
	}

	pub fn into_vec(self) -> Vec<u8> {
		self.0
	}

	#[must_use]
	pub fn range(&self, range: Range<usize>) -> &[u8] {
		&self.0[range]
	}

	pub fn append(&mut self, other: &[u8]) {
		self.0.extend_from_slice(other);
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		std::str::from_utf8(&self.0).unwrap_or_default()
	}
}

impl Debug for Blob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Blob({} bytes)", self.0.len())
	}
}

impl From<Vec<u8>> for Blob {
	fn from(v: Vec<u8>) -> Self {
		Blob(v)
	}
}

impl From<&[u8]> for Blob {
	fn from(v: &[u8]) -> Self {
		Blob(v.to_vec())
	}
}

impl From<String> for Blob {
	fn from(v: String) -> Self {
		Blob(v.into_bytes())
	}
}

impl From<&str> for Blob {
	fn from(v: &str) -> Self {
		Blob(v.as_bytes().to_vec())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn roundtrips_through_vec() {
		let blob = Blob::from(vec![1, 2, 3]);
		assert_eq!(blob.len(), 3);
		assert_eq!(blob.range(1..3), &[2, 3]);
		assert_eq!(blob.into_vec(), vec![1, 2, 3]);
	}

	#[test]
	fn empty_is_empty() {
		assert!(Blob::new_empty().is_empty());
	}
}
