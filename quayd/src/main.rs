mod config;
mod logging;
mod plugins;

use std::{io, net::SocketAddr, process::ExitCode, sync::Arc};

use config::Config;
use quay::{
	net,
	plugin::Registry,
	policy::PluginChain,
	protocol::Handler,
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
	let config = match Config::get() {
		Ok(Some(config)) => config,
		Ok(None) => return ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("{}", err);
			return ExitCode::FAILURE;
		}
	};

	if let Err(err) = logging::initialise(&config.log_level, config.log_file.as_deref()) {
		eprintln!("{}", err);
		return ExitCode::FAILURE;
	}

	match run(config).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			error!("{}", err);
			ExitCode::FAILURE
		}
	}
}

async fn run(config: Config) -> Result<(), RunError> {
	let address = config.socket_address();
	let listener =
		net::bind(address, config.backlog).map_err(|err| RunError::Bind(address, err))?;

	info!(
		"Starting quay (version: {}, backend: {}), listening on {}.",
		env!("CARGO_PKG_VERSION"),
		config.backend,
		address
	);
	info!("Log rotate type: {}.", config.log_rotation);

	let registry = Registry::resolve(
		&config.plugins,
		plugins::BUILTIN_PRIORITIES,
		&config.plugin_priorities,
		&plugins::catalog(),
		config.backend,
	);

	let loaded: Vec<String> = registry
		.plugins()
		.iter()
		.map(|spec| format!("{} ({})", spec.name(), spec.priority()))
		.collect();
	info!("Plugins in order: [{}]", loaded.join(", "));

	let evaluator = Arc::new(PluginChain::new(
		config.backend,
		config.connections.clone(),
	));
	let handler = Arc::new(Handler::new(Arc::new(config), Arc::new(registry), evaluator));

	let (tx, rx) = watch::channel(false);
	let listen_task = tokio::spawn(net::listen(listener, handler, rx));

	shutdown_signal().await.map_err(RunError::Signal)?;

	info!("Received shutdown signal, beginning graceful shutdown...");
	// Receivers only go away once the listener is already done
	let _ = tx.send(true);

	if let Err(err) = listen_task.await {
		error!("Listener ended abnormally: {}", err);
	}

	Ok(())
}

async fn shutdown_signal() -> io::Result<()> {
	use tokio::signal::unix::{signal, SignalKind};

	let mut hangup = signal(SignalKind::hangup())?;
	let mut interrupt = signal(SignalKind::interrupt())?;
	let mut quit = signal(SignalKind::quit())?;
	let mut terminate = signal(SignalKind::terminate())?;

	tokio::select! {
		_ = hangup.recv() => (),
		_ = interrupt.recv() => (),
		_ = quit.recv() => (),
		_ = terminate.recv() => (),
	};

	Ok(())
}

#[derive(Debug, Error)]
enum RunError {
	#[error("failed to listen on {0}: {1}")]
	Bind(SocketAddr, #[source] io::Error),
	#[error("failed to install signal handlers: {0}")]
	Signal(#[source] io::Error),
}
