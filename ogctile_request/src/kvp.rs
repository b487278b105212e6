//! KVP query-string parsing (§4.6): split on `&` then `=`, percent-decode each side,
//! lowercase keys. Values are looked up case-insensitively by the parsed map's own keys,
//! but the caller decides which ones get value-side canonicalisation.

use std::collections::BTreeMap;

/// A parsed `key=value&...` query string, keyed by lowercased parameter name.
#[derive(Debug, Clone, Default)]
pub struct ParamMap(BTreeMap<String, String>);

impl ParamMap {
	#[must_use]
	pub fn parse(query: &str) -> ParamMap {
		let mut map = BTreeMap::new();
		for pair in query.split('&').filter(|p| !p.is_empty()) {
			let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
			map.insert(percent_decode(key).to_lowercase(), percent_decode(value));
		}
		ParamMap(map)
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(&key.to_lowercase()).map(String::as_str)
	}

	#[must_use]
	pub fn get_lower(&self, key: &str) -> Option<String> {
		self.get(key).map(str::to_lowercase)
	}

	#[must_use]
	pub fn contains(&self, key: &str) -> bool {
		self.0.contains_key(&key.to_lowercase())
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.0.insert(key.into().to_lowercase(), value.into());
	}

	/// Re-serialises the parsed parameters into a `key=value&...` query string, for proxying
	/// a request verbatim to an upstream endpoint.
	#[must_use]
	pub fn to_query_string(&self) -> String {
		self.0.iter().map(|(k, v)| format!("{k}={}", percent_encode(v))).collect::<Vec<_>>().join("&")
	}
}

fn percent_encode(input: &str) -> String {
	let mut out = String::with_capacity(input.len());
	for byte in input.bytes() {
		match byte {
			b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
			_ => out.push_str(&format!("%{byte:02X}")),
		}
	}
	out
}

/// Minimal `application/x-www-form-urlencoded`-style percent-decoder: `%XX` hex escapes and
/// `+` as space, everything else passed through verbatim.
fn percent_decode(input: &str) -> String {
	let bytes = input.as_bytes();
	let mut out = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		match bytes[i] {
			b'%' if i + 2 < bytes.len() => {
				if let Ok(byte) = u8::from_str_radix(&input[i + 1..i + 3], 16) {
					out.push(byte);
					i += 3;
					continue;
				}
				out.push(bytes[i]);
				i += 1;
			}
			b'+' => {
				out.push(b' ');
				i += 1;
			}
			b => {
				out.push(b);
				i += 1;
			}
		}
	}
	String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lowercases_keys_but_not_values() {
		let params = ParamMap::parse("SERVICE=WMS&Request=GetMap");
		assert_eq!(params.get("service"), Some("WMS"));
		assert_eq!(params.get("REQUEST"), Some("GetMap"));
	}

	#[test]
	fn percent_decodes_both_sides() {
		let params = ParamMap::parse("layers=ortho%2Fphoto&bbox=0%2C0%2C1%2C1");
		assert_eq!(params.get("layers"), Some("ortho/photo"));
		assert_eq!(params.get("bbox"), Some("0,0,1,1"));
	}

	#[test]
	fn plus_decodes_to_space() {
		let params = ParamMap::parse("title=hello+world");
		assert_eq!(params.get("title"), Some("hello world"));
	}

	#[test]
	fn to_query_string_round_trips_through_percent_encoding() {
		let params = ParamMap::parse("layer=ortho&bbox=0,0,1,1");
		let query = params.to_query_string();
		let reparsed = ParamMap::parse(&query);
		assert_eq!(reparsed.get("layer"), Some("ortho"));
		assert_eq!(reparsed.get("bbox"), Some("0,0,1,1"));
	}
}
