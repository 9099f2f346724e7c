use std::{
	fs::OpenOptions,
	io::{self, IsTerminal},
	path::{Path, PathBuf},
	sync::Mutex,
};

use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{
	fmt::{self, writer::BoxMakeWriter},
	EnvFilter,
};

/// Install the global subscriber. `RUST_LOG` overrides the configured level
/// when it is set.
pub fn initialise(level: &str, file: Option<&Path>) -> Result<(), LoggingError> {
	let filter = match EnvFilter::try_from_default_env() {
		Ok(filter) => filter,
		Err(_) => EnvFilter::try_new(level).map_err(|err| LoggingError::Filter(err.to_string()))?,
	};

	let writer = match file {
		Some(path) => {
			let log = OpenOptions::new()
				.create(true)
				.append(true)
				.open(path)
				.map_err(|source| LoggingError::File {
					path: path.to_owned(),
					source,
				})?;
			BoxMakeWriter::new(Mutex::new(log))
		}
		None => BoxMakeWriter::new(io::stderr),
	};

	let subscriber = fmt::Subscriber::builder()
		.with_env_filter(filter)
		.with_writer(writer)
		.with_target(false)
		.with_ansi(file.is_none() && io::stderr().is_terminal())
		.with_timer(fmt::time::UtcTime::rfc_3339())
		.finish();

	tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::Subscriber)
}

#[derive(Debug, Error)]
pub enum LoggingError {
	#[error("invalid log level: {0}")]
	Filter(String),
	#[error("failed to open log file {}: {source}", path.display())]
	File { path: PathBuf, source: io::Error },
	#[error("failed to install log subscriber: {0}")]
	Subscriber(SetGlobalDefaultError),
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn unwritable_log_file() {
		let result = initialise("info", Some(Path::new("/nonexistent/quay/quay.log")));

		assert!(matches!(result, Err(LoggingError::File { .. })));
	}
}
