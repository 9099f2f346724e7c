use std::{
	fmt::Display,
	net::{IpAddr, SocketAddr},
	path::PathBuf,
	str::FromStr,
	time::Duration,
};

use confindent::Confindent;
use getopts::Options;
use quay::{
	backend::{Backend, Connections, ParseBackendError},
	config::{Limits, DEFAULT_ACTION},
	plugin::Priorities,
};
use thiserror::Error;

const DEFAULT_CONFIG: &str = "/etc/quay/quay.conf";

/// Keys that can also be given on the command line
const CLI_KEYS: &[&str] = &["listen-address", "port", "backend"];

pub struct Config {
	pub address: IpAddr,
	pub port: u16,
	pub backend: Backend,
	pub default_action: String,
	pub plugins: Vec<String>,
	pub plugin_priorities: Priorities,
	pub backlog: u32,
	pub evaluator_workers: usize,
	pub limits: Limits,
	pub log_level: String,
	pub log_file: Option<PathBuf>,
	pub log_rotation: LogRotation,
	pub connections: Connections,
}

impl Config {
	fn print_usage<S: AsRef<str>>(prgm: S, opts: &Options) {
		let brief = format!("Usage: {} [options]", prgm.as_ref());
		println!("{}", opts.usage(&brief));
	}

	pub fn socket_address(&self) -> SocketAddr {
		SocketAddr::new(self.address, self.port)
	}

	/// Read the command line and the config file. `None` means we were only
	/// asked for help.
	pub fn get() -> Result<Option<Self>, ConfigError> {
		let args: Vec<String> = std::env::args().collect();

		let mut opts = Options::new();
		opts.optflag("h", "help", "Print this help message");
		opts.optopt(
			"l",
			"listen-address",
			"The IP address quay will listen for policy requests on\nDefault: 127.0.0.1",
			"IP_ADDR",
		);
		opts.optopt(
			"p",
			"port",
			"The port quay will listen on\nDefault: 7777",
			"PORT",
		);
		opts.optopt(
			"b",
			"backend",
			"The backend holding mail accounts: ldap, mysql or pgsql",
			"BACKEND",
		);
		opts.optopt(
			"c",
			"config",
			"An alternate location to read the config from\nDefault: /etc/quay/quay.conf",
			"PATH",
		);

		let matches = opts.parse(args.get(1..).unwrap_or_default())?;

		if matches.opt_present("help") {
			let prgm = args.first().map(|s| s.as_str()).unwrap_or("quayd");
			Self::print_usage(prgm, &opts);
			return Ok(None);
		}

		let conf_path = matches
			.opt_str("config")
			.unwrap_or_else(|| DEFAULT_CONFIG.into());

		let config = match Confindent::from_file(&conf_path) {
			Ok(c) => c,
			Err(_) => match Confindent::from_file("quay.conf") {
				Ok(c) => c,
				Err(err) => return Err(ConfigError::File(conf_path, err.to_string())),
			},
		};

		// Options specified on the command line take priority. We only take the
		// cli_key and convert to the config key internally so that we can remain
		// consistent.
		let find_value = |cli_key: &str| -> Option<String> {
			let conf_key: String = cli_key
				.split('-')
				.map(|word| {
					let mut c = word.chars();
					match c.next() {
						None => String::new(),
						Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
					}
				})
				.collect();

			let cli = if CLI_KEYS.contains(&cli_key) {
				matches.opt_str(cli_key)
			} else {
				None
			};

			cli.or_else(|| config.child_value(conf_key).map(|s| s.into()))
		};

		Self::from_source(find_value).map(Some)
	}

	/// Build the configuration from a lookup of `kebab-case` keys.
	pub fn from_source<F>(find_value: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let backend = find_value("backend").unwrap_or_default().parse()?;

		let address = parse_or(&find_value, "listen-address", IpAddr::from([127, 0, 0, 1]))?;
		let port = parse_or(&find_value, "port", 7777)?;

		let default_action = find_value("default-action")
			.map(|action| action.trim().to_owned())
			.filter(|action| !action.is_empty())
			.unwrap_or_else(|| DEFAULT_ACTION.into());

		let plugins = find_value("plugins")
			.map(|joined| split_list(&joined))
			.unwrap_or_default();

		let plugin_priorities = match find_value("plugin-priorities") {
			None => Priorities::new(),
			Some(joined) => parse_priorities(&joined)?,
		};

		let idle_timeout = match parse_or(&find_value, "idle-timeout", 300)? {
			0 => None,
			secs => Some(Duration::from_secs(secs)),
		};

		let limits = Limits {
			max_line_length: parse_or(&find_value, "max-line-length", 4096)?,
			max_lines: parse_or(&find_value, "max-lines", 1000)?,
			idle_timeout,
		};

		let copies = parse_or(&find_value, "log-rotate-copies", 12)?;
		let log_rotation = match find_value("log-rotate-type").as_deref().map(str::trim) {
			None | Some("time") => LogRotation::Time {
				interval: find_value("log-rotate-interval").unwrap_or_else(|| "W6".into()),
				copies,
			},
			Some("size") => LogRotation::Size {
				bytes: parse_or(&find_value, "log-rotate-size", 100 * 1024 * 1024)?,
				copies,
			},
			Some(other) => return Err(ConfigError::LogRotateType(other.into())),
		};

		let connections = Connections::new(
			backend,
			find_value("vmail-dsn"),
			find_value("amavisd-dsn"),
			find_value("iredapd-dsn"),
		);

		Ok(Self {
			address,
			port,
			backend,
			default_action,
			plugins,
			plugin_priorities,
			backlog: parse_or(&find_value, "backlog", 5)?,
			evaluator_workers: parse_or(&find_value, "evaluator-workers", 8)?,
			limits,
			log_level: find_value("log-level").unwrap_or_else(|| "info".into()),
			log_file: find_value("log-file").map(PathBuf::from),
			log_rotation,
			connections,
		})
	}
}

impl quay::config::Config for Config {
	fn default_action(&self) -> &str {
		&self.default_action
	}

	fn limits(&self) -> Limits {
		self.limits
	}

	fn evaluator_workers(&self) -> usize {
		self.evaluator_workers
	}
}

fn parse_or<F, T>(find_value: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
	F: Fn(&str) -> Option<String>,
	T: FromStr,
	T::Err: Display,
{
	match find_value(key) {
		None => Ok(default),
		Some(value) => value.trim().parse().map_err(|err: T::Err| ConfigError::Value {
			key,
			value,
			reason: err.to_string(),
		}),
	}
}

fn split_list(joined: &str) -> Vec<String> {
	joined
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(String::from)
		.collect()
}

/// Parses `name:priority` pairs separated by commas
fn parse_priorities(joined: &str) -> Result<Priorities, ConfigError> {
	let mut priorities = Priorities::new();

	for pair in split_list(joined) {
		let (name, priority) = pair
			.split_once(':')
			.ok_or_else(|| ConfigError::Priority(pair.clone()))?;
		let priority = priority
			.trim()
			.parse()
			.map_err(|_| ConfigError::Priority(pair.clone()))?;

		priorities.insert(name.trim().to_owned(), priority);
	}

	Ok(priorities)
}

/// How the log file is meant to be rotated. Only reported at startup, the
/// rotating itself is up to the system.
#[derive(Clone, Debug, PartialEq)]
pub enum LogRotation {
	Size { bytes: u64, copies: u32 },
	Time { interval: String, copies: u32 },
}

impl Display for LogRotation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			LogRotation::Size { bytes, copies } => write!(
				f,
				"size ({} MB), backup copies: {}",
				bytes / 1024 / 1024,
				copies
			),
			LogRotation::Time { interval, copies } => write!(
				f,
				"time, interval: {}, backup copies: {}",
				interval, copies
			),
		}
	}
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("{0}")]
	Options(#[from] getopts::Fail),
	#[error("failed to parse conf file {0}: {1}")]
	File(String, String),
	#[error("{0}")]
	Backend(#[from] ParseBackendError),
	#[error("Failed to parse '{value}' for {key}: {reason}")]
	Value {
		key: &'static str,
		value: String,
		reason: String,
	},
	#[error("'{0}' is not a valid plugin priority, expected name:priority")]
	Priority(String),
	#[error("'{0}' is not a log rotate type, expected size or time")]
	LogRotateType(String),
}

#[cfg(test)]
mod test {
	use std::collections::HashMap;

	use super::*;

	fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
		let source: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();

		Config::from_source(|key| source.get(key).cloned())
	}

	#[test]
	fn defaults() {
		let config = config(&[("backend", "mysql")]).unwrap();

		assert_eq!(config.backend, Backend::Mysql);
		assert_eq!(config.socket_address(), "127.0.0.1:7777".parse::<SocketAddr>().unwrap());
		assert_eq!(config.default_action, "DUNNO");
		assert!(config.plugins.is_empty());
		assert!(config.plugin_priorities.is_empty());
		assert_eq!(config.backlog, 5);
		assert_eq!(config.evaluator_workers, 8);
		assert_eq!(config.limits, Limits::default());
		assert_eq!(config.log_level, "info");
		assert_eq!(config.log_file, None);
		assert_eq!(
			config.log_rotation,
			LogRotation::Time {
				interval: "W6".into(),
				copies: 12
			}
		);
	}

	#[test]
	fn everything_set() {
		let config = config(&[
			("backend", "LDAP"),
			("listen-address", "::1"),
			("port", "10031"),
			("default-action", "DEFER_IF_PERMIT Service unavailable"),
			("plugins", "greylisting, throttle,,log_session"),
			("plugin-priorities", "greylisting:85, custom:-3"),
			("idle-timeout", "0"),
			("max-lines", "64"),
			("log-file", "/var/log/quay.log"),
			("vmail-dsn", "mysql://vmail@localhost/vmail"),
		])
		.unwrap();

		assert_eq!(config.backend, Backend::Ldap);
		assert_eq!(config.socket_address(), "[::1]:10031".parse::<SocketAddr>().unwrap());
		assert_eq!(config.default_action, "DEFER_IF_PERMIT Service unavailable");
		assert_eq!(config.plugins, vec!["greylisting", "throttle", "log_session"]);
		assert_eq!(config.plugin_priorities.get("greylisting"), Some(&85));
		assert_eq!(config.plugin_priorities.get("custom"), Some(&-3));
		assert_eq!(config.limits.idle_timeout, None);
		assert_eq!(config.limits.max_lines, 64);
		assert_eq!(config.log_file, Some(PathBuf::from("/var/log/quay.log")));
		// LDAP doesn't keep a vmail connection around
		assert_eq!(config.connections.vmail, None);
	}

	#[test]
	fn invalid_backend() {
		let cases: [&[(&str, &str)]; 2] = [&[("backend", "sqlite")], &[]];
		for pairs in cases {
			let err = config(pairs).err().unwrap();
			assert_eq!(
				err.to_string(),
				"Invalid backend, it must be ldap, mysql or pgsql."
			);
		}
	}

	#[test]
	fn invalid_values() {
		assert!(matches!(
			config(&[("backend", "pgsql"), ("port", "seventy")]),
			Err(ConfigError::Value { key: "port", .. })
		));
		assert!(matches!(
			config(&[("backend", "pgsql"), ("plugin-priorities", "greylisting")]),
			Err(ConfigError::Priority(_))
		));
		assert!(matches!(
			config(&[("backend", "pgsql"), ("plugin-priorities", "greylisting:high")]),
			Err(ConfigError::Priority(_))
		));
		assert!(matches!(
			config(&[("backend", "pgsql"), ("log-rotate-type", "weekly")]),
			Err(ConfigError::LogRotateType(_))
		));
	}

	#[test]
	fn log_rotation() {
		let config = config(&[
			("backend", "pgsql"),
			("log-rotate-type", "size"),
			("log-rotate-size", "52428800"),
			("log-rotate-copies", "3"),
		])
		.unwrap();

		assert_eq!(
			config.log_rotation.to_string(),
			"size (50 MB), backup copies: 3"
		);
		assert_eq!(
			LogRotation::Time {
				interval: "midnight".into(),
				copies: 7
			}
			.to_string(),
			"time, interval: midnight, backup copies: 7"
		);
	}
}
