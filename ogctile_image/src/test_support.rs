//! Test-only helpers shared across the codec unit tests.

#![cfg(test)]

use crate::format::Encoder;

pub fn pull_all(encoder: &mut dyn Encoder) -> Vec<u8> {
	let mut out = Vec::new();
	let mut buf = vec![0u8; 4096];
	while !encoder.eof() {
		let n = encoder.read(&mut buf).unwrap();
		out.extend_from_slice(&buf[..n]);
	}
	out
}
