//! The invariant `GetCapabilities` fragment builder/splicer (§4.7), grounded byte-for-byte
//! on `original_source/rok4/CapabilitiesBuilder.cpp`: a capabilities document is serialised
//! once at startup with two placeholder tokens standing in for the public base URL, split
//! into fragments at those tokens, and interleaved with the actual request's host/path at
//! request time without touching XML again.

const HOSTNAME_TOKEN: &str = "]HOSTNAME[";
const HOSTNAME_PATH_TOKEN: &str = "]HOSTNAME/PATH[";

/// A pre-serialised capabilities document, split at every `]HOSTNAME[` / `]HOSTNAME/PATH[`
/// occurrence. `fragments.len() == placeholders.len() + 1`.
#[derive(Debug, Clone)]
pub struct CapabilitiesTemplate {
	fragments: Vec<String>,
	placeholders: Vec<Placeholder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
	Host,
	HostPath,
}

impl CapabilitiesTemplate {
	/// Splits `document` at the first occurrence of each placeholder token, in document
	/// order — matching the original's single left-to-right scan rather than two separate
	/// passes, so `]HOSTNAME[` text inside a `]HOSTNAME/PATH[` span can't be double-matched.
	#[must_use]
	pub fn build(document: &str) -> CapabilitiesTemplate {
		let mut fragments = Vec::new();
		let mut placeholders = Vec::new();
		let mut rest = document;

		loop {
			let host_path_pos = rest.find(HOSTNAME_PATH_TOKEN);
			let host_pos = rest.find(HOSTNAME_TOKEN).filter(|&p| host_path_pos.is_none_or(|hp| p < hp));

			match (host_pos, host_path_pos) {
				(Some(pos), _) => {
					fragments.push(rest[..pos].to_string());
					placeholders.push(Placeholder::Host);
					rest = &rest[pos + HOSTNAME_TOKEN.len()..];
				}
				(None, Some(pos)) => {
					fragments.push(rest[..pos].to_string());
					placeholders.push(Placeholder::HostPath);
					rest = &rest[pos + HOSTNAME_PATH_TOKEN.len()..];
				}
				(None, None) => {
					fragments.push(rest.to_string());
					break;
				}
			}
		}

		CapabilitiesTemplate { fragments, placeholders }
	}

	/// Interleaves the fragments with `scheme://host` and `scheme://host/path?` computed
	/// from the inbound request, producing the final document without re-serialising XML.
	#[must_use]
	pub fn render(&self, scheme: &str, host: &str, service_path: &str) -> String {
		let host_url = format!("{scheme}://{host}");
		let host_path_url = format!("{scheme}://{host}{service_path}?");

		let mut out = String::new();
		for (i, fragment) in self.fragments.iter().enumerate() {
			out.push_str(fragment);
			if let Some(placeholder) = self.placeholders.get(i) {
				out.push_str(match placeholder {
					Placeholder::Host => &host_url,
					Placeholder::HostPath => &host_path_url,
				});
			}
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_and_rejoins_around_both_tokens() {
		let doc = "<a>]HOSTNAME[</a><b>]HOSTNAME/PATH[</b>";
		let template = CapabilitiesTemplate::build(doc);
		assert_eq!(template.fragments.len(), 3);
		let rendered = template.render("http", "maps.example.org", "/wms");
		assert_eq!(rendered, "<a>http://maps.example.org</a><b>http://maps.example.org/wms?</b>");
	}

	#[test]
	fn document_with_no_placeholders_renders_unchanged() {
		let template = CapabilitiesTemplate::build("<a>plain</a>");
		assert_eq!(template.render("https", "x", "/y"), "<a>plain</a>");
	}

	#[test]
	fn rendered_fragments_reparse_as_well_formed_xml() {
		let doc = "<?xml version=\"1.0\"?><Root xmlns=\"urn:x\"><Url>]HOSTNAME/PATH[</Url></Root>";
		let template = CapabilitiesTemplate::build(doc);
		let rendered = template.render("http", "maps.example.org", "/wms");
		let parsed = roxmltree::Document::parse(&rendered).expect("rendered document should be well-formed XML");
		assert_eq!(parsed.root_element().tag_name().name(), "Root");
	}
}
