use thiserror::Error;
use tracing::debug;

use crate::{
	backend::{Backend, Connections},
	plugin::{PluginContext, PluginError, PluginSpec},
	protocol::SessionRecord,
};

/// Turns a finished transaction into an action, or no opinion at all.
pub trait Evaluator: Send + Sync {
	fn evaluate(
		&self,
		record: &SessionRecord,
		plugins: &[PluginSpec],
		sender_search_attrs: &[String],
		recipient_search_attrs: &[String],
	) -> Result<Option<String>, EvaluateError>;
}

/// Asks each plugin in turn and goes with the first one that has an opinion.
pub struct PluginChain {
	backend: Backend,
	connections: Connections,
}

impl PluginChain {
	pub fn new(backend: Backend, connections: Connections) -> Self {
		Self {
			backend,
			connections,
		}
	}
}

impl Evaluator for PluginChain {
	fn evaluate(
		&self,
		record: &SessionRecord,
		plugins: &[PluginSpec],
		sender_search_attrs: &[String],
		recipient_search_attrs: &[String],
	) -> Result<Option<String>, EvaluateError> {
		let context = PluginContext {
			record,
			backend: self.backend,
			connections: &self.connections,
			sender_search_attrs,
			recipient_search_attrs,
		};

		for spec in plugins {
			let action = spec
				.plugin()
				.restriction(&context)
				.map_err(|source| EvaluateError::Plugin {
					plugin: spec.name().into(),
					source,
				})?;

			match action {
				Some(action) if !is_no_opinion(&action) => {
					debug!("<-- Result of plugin {}: {}", spec.name(), action);
					return Ok(Some(action));
				}
				_ => debug!("<-- Result of plugin {}: DUNNO", spec.name()),
			}
		}

		Ok(None)
	}
}

fn is_no_opinion(action: &str) -> bool {
	let action = action.trim();

	action.is_empty()
		|| action
			.get(..5)
			.map_or(false, |verb| verb.eq_ignore_ascii_case("DUNNO"))
}

#[derive(Debug, Error)]
pub enum EvaluateError {
	#[error("plugin {plugin} failed: {source}")]
	Plugin {
		plugin: String,
		#[source]
		source: PluginError,
	},
	#[error("evaluation panicked")]
	Panicked,
	#[error("no evaluator available")]
	Unavailable,
}
