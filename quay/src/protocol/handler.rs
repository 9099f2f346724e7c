use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::{
	config::{Config, Limits},
	plugin::Registry,
	policy::{EvaluateError, Evaluator},
};

use super::{Response, SessionRecord, Transaction};

/// Decides on transactions for every connection. Whatever goes wrong while
/// deciding, a [Response] always comes out.
pub struct Handler {
	config: Arc<dyn Config>,
	registry: Arc<Registry>,
	evaluator: Arc<dyn Evaluator>,
	workers: Arc<Semaphore>,
}

impl Handler {
	pub fn new(
		config: Arc<dyn Config>,
		registry: Arc<Registry>,
		evaluator: Arc<dyn Evaluator>,
	) -> Self {
		let workers = Arc::new(Semaphore::new(config.evaluator_workers().max(1)));

		Self {
			config,
			registry,
			evaluator,
			workers,
		}
	}

	pub fn limits(&self) -> Limits {
		self.config.limits()
	}

	pub async fn respond(&self, transaction: Transaction) -> Response {
		let default = self.config.default_action();

		let record = match transaction {
			Transaction::Empty => {
				debug!("replying: {}", default);
				debug!("Session ended");
				return Response::new(default);
			}
			Transaction::Complete(record) => Arc::new(record),
		};

		let action = match self.evaluate(record.clone()).await {
			Ok(Some(action)) if !action.is_empty() => action,
			Ok(_) => default.to_owned(),
			Err(err) => {
				error!(
					"Unexpected error: {}. Fallback to default action: {}",
					err, default
				);
				default.to_owned()
			}
		};

		debug!("Session ended");
		info!(
			"[{}] {}, {}, {}",
			record.value("client_address"),
			record.value("protocol_state"),
			trace(&record),
			action
		);

		Response::new(action)
	}

	/// Runs the evaluator off the async workers so a slow lookup only holds up
	/// the connection waiting on it.
	async fn evaluate(&self, record: Arc<SessionRecord>) -> Result<Option<String>, EvaluateError> {
		let permit = self
			.workers
			.clone()
			.acquire_owned()
			.await
			.map_err(|_| EvaluateError::Unavailable)?;

		let evaluator = self.evaluator.clone();
		let registry = self.registry.clone();

		let task = tokio::task::spawn_blocking(move || {
			let _permit = permit;
			evaluator.evaluate(
				&record,
				registry.plugins(),
				registry.sender_search_attrs(),
				registry.recipient_search_attrs(),
			)
		});

		match task.await {
			Ok(result) => result,
			Err(_) => Err(EvaluateError::Panicked),
		}
	}
}

/// Who sent to whom, for the log line of a finished transaction.
///
/// `sender -> recipient` for unauthenticated senders, `sasl => recipient`
/// when the login sent as itself, and `sasl => sender -> recipient` when it
/// sent as someone else.
pub fn trace(record: &SessionRecord) -> String {
	let sasl = record.value("sasl_username");
	let sender = record.value("sender");
	let recipient = record.value("recipient");

	if sasl.is_empty() {
		format!("{} -> {}", sender, recipient)
	} else if sasl == sender {
		format!("{} => {}", sasl, recipient)
	} else {
		format!("{} => {} -> {}", sasl, sender, recipient)
	}
}
