use std::fmt::Display;

/// The single reply sent back for a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
	action: String,
}

impl Response {
	pub fn new<S: Into<String>>(action: S) -> Self {
		Self {
			action: action.into(),
		}
	}

	pub fn action(&self) -> &str {
		&self.action
	}

	pub fn as_string(&self) -> String {
		// The action line, then the empty line closing the block
		format!("action={}\n\n", self.action)
	}
}

impl Display for Response {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_string())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn wire_format() {
		assert_eq!(Response::new("DUNNO").as_string(), "action=DUNNO\n\n");
		assert_eq!(
			Response::new("REJECT Not authorized").to_string(),
			"action=REJECT Not authorized\n\n"
		);
	}
}
