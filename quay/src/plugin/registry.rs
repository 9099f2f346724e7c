use std::collections::{HashMap, HashSet};

use tracing::{error, info};

use crate::backend::Backend;

use super::{Catalog, PluginSpec};

pub type Priorities = HashMap<String, i32>;

/// Attribute every directory lookup asks for, whatever the plugins need.
pub const BASELINE_SEARCH_ATTR: &str = "objectClass";

/// Combine the built-in priorities with the configured ones. Configured
/// priorities win.
pub fn merge(builtin: &[(&str, i32)], configured: &Priorities) -> Priorities {
	let mut merged: Priorities = builtin
		.iter()
		.map(|(name, priority)| (name.to_string(), *priority))
		.collect();

	for (name, priority) in configured {
		merged.insert(name.clone(), *priority);
	}

	merged
}

/// Order the enabled plugins by priority, highest first, and then by name.
/// Plugins without a priority get 0, duplicates are dropped.
pub fn order(enabled: &[String], priorities: &Priorities) -> Vec<(String, i32)> {
	let mut seen = HashSet::new();
	let mut ordered: Vec<(String, i32)> = enabled
		.iter()
		.filter(|name| seen.insert(*name))
		.map(|name| (name.clone(), priorities.get(name).copied().unwrap_or(0)))
		.collect();

	ordered.sort_by(|(a_name, a_priority), (b_name, b_priority)| {
		b_priority
			.cmp(a_priority)
			.then_with(|| a_name.cmp(b_name))
	});

	ordered
}

/// The plugins that run for every transaction, in the order they run, and
/// the directory attributes they need between them. Built once at startup.
#[derive(Debug, Default)]
pub struct Registry {
	plugins: Vec<PluginSpec>,
	sender_search_attrs: Vec<String>,
	recipient_search_attrs: Vec<String>,
}

impl Registry {
	/// Resolve the enabled plugins against the catalog. Plugins that don't
	/// exist or fail to load are logged and left out; nothing here stops the
	/// daemon from starting.
	pub fn resolve(
		enabled: &[String],
		builtin: &[(&str, i32)],
		configured: &Priorities,
		catalog: &Catalog,
		backend: Backend,
	) -> Self {
		let priorities = merge(builtin, configured);

		let available: Vec<String> = enabled
			.iter()
			.filter(|name| {
				if catalog.contains(name) {
					true
				} else {
					info!("Plugin {} does not exist.", name);
					false
				}
			})
			.cloned()
			.collect();

		let mut plugins = vec![];
		for (name, priority) in order(&available, &priorities) {
			match catalog.load(&name) {
				Ok(plugin) => {
					info!("Loading plugin: {} (priority: {})", name, priority);
					plugins.push(PluginSpec::new(name, priority, plugin));
				}
				Err(err) => error!("Error while loading plugin ({}): {}", name, err),
			}
		}

		// Only directory lookups care about attribute lists
		let (sender_search_attrs, recipient_search_attrs) = match backend {
			Backend::Ldap => (
				search_attrs(&plugins, Lookup::Sender),
				search_attrs(&plugins, Lookup::Recipient),
			),
			Backend::Mysql | Backend::Pgsql => (vec![], vec![]),
		};

		Self {
			plugins,
			sender_search_attrs,
			recipient_search_attrs,
		}
	}

	pub fn plugins(&self) -> &[PluginSpec] {
		&self.plugins
	}

	pub fn sender_search_attrs(&self) -> &[String] {
		&self.sender_search_attrs
	}

	pub fn recipient_search_attrs(&self) -> &[String] {
		&self.recipient_search_attrs
	}
}

enum Lookup {
	Sender,
	Recipient,
}

fn search_attrs(plugins: &[PluginSpec], lookup: Lookup) -> Vec<String> {
	let mut attrs = vec![BASELINE_SEARCH_ATTR.to_string()];

	for spec in plugins {
		let declared = match lookup {
			Lookup::Sender => spec.plugin().sender_search_attrs(),
			Lookup::Recipient => spec.plugin().recipient_search_attrs(),
		};

		for attr in declared {
			if !attrs.iter().any(|existing| existing == attr) {
				attrs.push(attr.to_string());
			}
		}
	}

	attrs
}
