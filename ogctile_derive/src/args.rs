extern crate proc_macro;

use proc_macro2::TokenStream as TokenStream2;
use syn::Token;
use syn::parse::{self, Parse, ParseStream};

/// Argument list accepted by `#[context(...)]`: an optional leading `move`
/// keyword followed by a comma, then the format-string expression.
#[derive(Debug)]
pub struct ContextArgs(pub Option<Token![move]>, pub TokenStream2);

impl Parse for ContextArgs {
	fn parse(input: ParseStream<'_>) -> parse::Result<Self> {
		let move_token = if input.peek(Token![move]) {
			let token = input.parse()?;
			input.parse::<Token![,]>()?;
			Some(token)
		} else {
			None
		};
		Ok(Self(move_token, input.parse()?))
	}
}

#[cfg(test)]
mod tests {
	use super::ContextArgs;
	use syn::parse_str;

	#[test]
	fn without_move() {
		let args: ContextArgs = parse_str("fetching {id}").expect("parse");
		assert!(args.0.is_none());
		assert_eq!(args.1.to_string(), "fetching { id }");
	}

	#[test]
	fn with_move() {
		let args: ContextArgs = parse_str("move, fetching {id}").expect("parse");
		assert!(args.0.is_some());
		assert_eq!(args.1.to_string(), "fetching { id }");
	}

	#[test]
	fn complex_expression() {
		let args: ContextArgs = parse_str("move, \"tile {}/{}\", col, row").expect("parse");
		assert!(args.0.is_some());
	}

	#[test]
	fn missing_comma_after_move_is_rejected() {
		let err = parse_str::<ContextArgs>("move fetching").unwrap_err();
		assert!(err.to_string().contains(','));
	}
}
