//! Plugins compiled into the daemon.

use std::sync::Arc;

use quay::plugin::{Catalog, Plugin, PluginContext, PluginError};
use tracing::debug;

/// Priorities of the built-in plugins. `PluginPriorities` in the config file
/// overrides these and adds priorities for anything else.
pub const BUILTIN_PRIORITIES: &[(&str, i32)] = &[(LogSession::NAME, 1000)];

pub fn catalog() -> Catalog {
	let mut catalog = Catalog::new();
	catalog.register(LogSession::NAME, || Ok(Arc::new(LogSession) as Arc<dyn Plugin>));
	catalog
}

/// Dumps every attribute of the transaction at debug level. Never has an
/// opinion.
struct LogSession;

impl LogSession {
	const NAME: &'static str = "log_session";
}

impl Plugin for LogSession {
	fn name(&self) -> &str {
		Self::NAME
	}

	fn restriction(&self, context: &PluginContext<'_>) -> Result<Option<String>, PluginError> {
		for (key, value) in context.record.iter() {
			debug!("{}: {}={}", Self::NAME, key, value);
		}

		Ok(None)
	}
}

#[cfg(test)]
mod test {
	use quay::{
		backend::{Backend, Connections},
		plugin::{Priorities, Registry},
		policy::{Evaluator, PluginChain},
		protocol::SessionRecord,
	};

	use super::*;

	#[test]
	fn log_session_runs_first_and_stays_quiet() {
		let registry = Registry::resolve(
			&["other".to_string(), "log_session".to_string()],
			BUILTIN_PRIORITIES,
			&Priorities::new(),
			&catalog(),
			Backend::Ldap,
		);

		assert_eq!(registry.plugins().len(), 1);
		assert_eq!(registry.plugins()[0].name(), "log_session");
		assert_eq!(registry.plugins()[0].priority(), 1000);

		let mut record = SessionRecord::new();
		record.insert_line("sender=a@b.example").unwrap();

		let chain = PluginChain::new(Backend::Ldap, Connections::default());
		let action = chain
			.evaluate(
				&record,
				registry.plugins(),
				registry.sender_search_attrs(),
				registry.recipient_search_attrs(),
			)
			.unwrap();
		assert_eq!(action, None);
	}
}
