use std::fmt::Display;

use thiserror::Error;

/// The directory or database holding mail accounts and policy data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
	Ldap,
	Mysql,
	Pgsql,
}

impl Backend {
	pub fn as_str(&self) -> &'static str {
		match self {
			Backend::Ldap => "ldap",
			Backend::Mysql => "mysql",
			Backend::Pgsql => "pgsql",
		}
	}

	pub fn is_sql(&self) -> bool {
		matches!(self, Backend::Mysql | Backend::Pgsql)
	}
}

impl Display for Backend {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl std::str::FromStr for Backend {
	type Err = ParseBackendError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"ldap" => Ok(Backend::Ldap),
			"mysql" => Ok(Backend::Mysql),
			"pgsql" => Ok(Backend::Pgsql),
			_ => Err(ParseBackendError::Invalid(s.into())),
		}
	}
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseBackendError {
	#[error("Invalid backend, it must be ldap, mysql or pgsql.")]
	Invalid(String),
}

/// Connection handles shared by every session and handed through to the
/// plugins untouched. Pooling and locking belong to whoever consumes them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Connections {
	/// Mail accounts. Always `None` for LDAP, which binds per lookup.
	pub vmail: Option<String>,
	pub amavisd: Option<String>,
	pub iredapd: Option<String>,
}

impl Connections {
	pub fn new(
		backend: Backend,
		vmail: Option<String>,
		amavisd: Option<String>,
		iredapd: Option<String>,
	) -> Self {
		Self {
			vmail: if backend.is_sql() { vmail } else { None },
			amavisd,
			iredapd,
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn backend_parse() {
		assert_eq!("ldap".parse(), Ok(Backend::Ldap));
		assert_eq!("MySQL".parse(), Ok(Backend::Mysql));
		assert_eq!(" pgsql ".parse(), Ok(Backend::Pgsql));
	}

	#[test]
	fn backend_invalid() {
		let err = "sqlite".parse::<Backend>().unwrap_err();
		assert_eq!(err, ParseBackendError::Invalid("sqlite".into()));
		assert_eq!(
			err.to_string(),
			"Invalid backend, it must be ldap, mysql or pgsql."
		);
	}

	#[test]
	fn ldap_has_no_vmail_handle() {
		let conns = Connections::new(
			Backend::Ldap,
			Some("mysql://vmail".into()),
			Some("mysql://amavisd".into()),
			None,
		);

		assert_eq!(conns.vmail, None);
		assert_eq!(conns.amavisd.as_deref(), Some("mysql://amavisd"));

		let conns = Connections::new(Backend::Pgsql, Some("pgsql://vmail".into()), None, None);
		assert_eq!(conns.vmail.as_deref(), Some("pgsql://vmail"));
	}
}
