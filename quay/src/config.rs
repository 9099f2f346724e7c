use std::time::Duration;

pub const DEFAULT_ACTION: &str = "DUNNO";

pub trait Config: Send + Sync {
	/// The action sent back when no plugin has an opinion, or when deciding
	/// failed altogether.
	fn default_action(&self) -> &str;

	/// Bounds applied to every connection.
	fn limits(&self) -> Limits {
		Limits::default()
	}

	/// How many evaluator calls may be in flight at once across all
	/// connections.
	fn evaluator_workers(&self) -> usize {
		8
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
	/// Longest line we'll buffer while waiting for its newline
	pub max_line_length: usize,
	/// Attribute lines allowed in a single transaction
	pub max_lines: usize,
	/// Close connections that send nothing for this long
	pub idle_timeout: Option<Duration>,
}

impl Default for Limits {
	fn default() -> Self {
		Self {
			max_line_length: 4096,
			max_lines: 1000,
			idle_timeout: Some(Duration::from_secs(300)),
		}
	}
}
