use std::{collections::HashMap, sync::Arc};

use super::{Plugin, PluginError};

type Factory = Box<dyn Fn() -> Result<Arc<dyn Plugin>, PluginError> + Send + Sync>;

/// Every plugin compiled into the daemon, by the name configuration refers to
/// it with.
#[derive(Default)]
pub struct Catalog {
	factories: HashMap<String, Factory>,
}

impl Catalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Make a plugin available under `name`. Registering the same name twice
	/// replaces the earlier factory.
	pub fn register<S, F>(&mut self, name: S, factory: F)
	where
		S: Into<String>,
		F: Fn() -> Result<Arc<dyn Plugin>, PluginError> + Send + Sync + 'static,
	{
		self.factories.insert(name.into(), Box::new(factory));
	}

	pub fn contains(&self, name: &str) -> bool {
		self.factories.contains_key(name)
	}

	pub fn load(&self, name: &str) -> Result<Arc<dyn Plugin>, PluginError> {
		match self.factories.get(name) {
			Some(factory) => factory(),
			None => Err(PluginError::NotFound(name.into())),
		}
	}

	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
		names.sort_unstable();
		names
	}
}
