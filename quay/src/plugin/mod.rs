//! Decision plugins and the startup-time resolution of which ones run, and
//! in what order.

mod catalog;
mod registry;

use std::{fmt::Debug, sync::Arc};

use thiserror::Error;

use crate::{
	backend::{Backend, Connections},
	protocol::SessionRecord,
};

pub use catalog::Catalog;
pub use registry::{merge, order, Priorities, Registry, BASELINE_SEARCH_ATTR};

/// A unit of decision logic.
pub trait Plugin: Send + Sync {
	fn name(&self) -> &str;

	/// Extra directory attributes this plugin needs when looking up the sender
	fn sender_search_attrs(&self) -> &[&str] {
		&[]
	}

	/// Extra directory attributes this plugin needs when looking up the recipient
	fn recipient_search_attrs(&self) -> &[&str] {
		&[]
	}

	/// Decide on a transaction. `None`, or an action starting with `DUNNO`,
	/// means the plugin has no opinion and the next one gets asked.
	fn restriction(&self, context: &PluginContext<'_>) -> Result<Option<String>, PluginError>;
}

/// Everything a plugin gets to look at while deciding.
pub struct PluginContext<'a> {
	pub record: &'a SessionRecord,
	pub backend: Backend,
	pub connections: &'a Connections,
	pub sender_search_attrs: &'a [String],
	pub recipient_search_attrs: &'a [String],
}

/// A loaded plugin and the priority it was ordered by.
#[derive(Clone)]
pub struct PluginSpec {
	name: String,
	priority: i32,
	plugin: Arc<dyn Plugin>,
}

impl PluginSpec {
	pub fn new<S: Into<String>>(name: S, priority: i32, plugin: Arc<dyn Plugin>) -> Self {
		Self {
			name: name.into(),
			priority,
			plugin,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn priority(&self) -> i32 {
		self.priority
	}

	pub fn plugin(&self) -> &dyn Plugin {
		self.plugin.as_ref()
	}
}

impl Debug for PluginSpec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PluginSpec")
			.field("name", &self.name)
			.field("priority", &self.priority)
			.finish()
	}
}

#[derive(Debug, Error)]
pub enum PluginError {
	#[error("plugin '{0}' does not exist")]
	NotFound(String),
	#[error("{0}")]
	Load(String),
	#[error("{0}")]
	Restriction(String),
}
