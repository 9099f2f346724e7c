use std::collections::BTreeMap;

use thiserror::Error;

use super::attribute;

/// The attributes of one SMTP transaction as sent by the MTA.
///
/// Only recognized attributes and the domains derived from the identity
/// attributes ever make it in here; everything else is refused by
/// [SessionRecord::insert].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionRecord {
	attributes: BTreeMap<&'static str, String>,
}

impl SessionRecord {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parse a `key=value` line, splitting on the first `=`.
	pub fn insert_line(&mut self, line: &str) -> Result<(), LineError> {
		let (key, value) = line.split_once('=').ok_or(LineError::MissingSeparator)?;
		self.insert(key, value)
	}

	pub fn insert(&mut self, key: &str, value: &str) -> Result<(), LineError> {
		let name =
			attribute::recognize(key).ok_or_else(|| LineError::UnknownAttribute(key.into()))?;

		match attribute::domain_key(name) {
			Some(domain_key) => {
				let value = value.to_lowercase();
				// No @ means the whole value stands in for the domain
				let domain = match value.split_once('@') {
					Some((_, domain)) => domain.to_owned(),
					None => value.clone(),
				};

				self.attributes.insert(domain_key, domain);
				self.attributes.insert(name, value);
			}
			None => {
				self.attributes.insert(name, value.to_owned());
			}
		}

		Ok(())
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.attributes.get(key).map(|s| s.as_str())
	}

	/// Like [SessionRecord::get], but absent attributes read as empty.
	pub fn value(&self, key: &str) -> &str {
		self.get(key).unwrap_or_default()
	}

	pub fn is_empty(&self) -> bool {
		self.attributes.is_empty()
	}

	pub fn len(&self) -> usize {
		self.attributes.len()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.attributes.iter().map(|(k, v)| (*k, v.as_str()))
	}
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LineError {
	#[error("line has no '=' separating key and value")]
	MissingSeparator,
	#[error("'{0}' is not a recognized attribute")]
	UnknownAttribute(String),
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn identity_is_lowercased_with_domain() {
		let mut record = SessionRecord::new();
		record.insert_line("sender=Alice@EXAMPLE.com").unwrap();

		assert_eq!(record.get("sender"), Some("alice@example.com"));
		assert_eq!(record.get("sender_domain"), Some("example.com"));
		assert_eq!(record.len(), 2);
	}

	#[test]
	fn identity_without_at_is_its_own_domain() {
		let mut record = SessionRecord::new();
		record.insert_line("sender=NoDomain").unwrap();

		assert_eq!(record.get("sender"), Some("nodomain"));
		assert_eq!(record.get("sender_domain"), Some("nodomain"));
	}

	#[test]
	fn domain_is_after_first_at() {
		let mut record = SessionRecord::new();
		record.insert_line("recipient=\"a@b\"@example.org").unwrap();

		assert_eq!(record.get("recipient_domain"), Some("b\"@example.org"));
	}

	#[test]
	fn empty_identity() {
		let mut record = SessionRecord::new();
		record.insert_line("sasl_username=").unwrap();

		assert_eq!(record.get("sasl_username"), Some(""));
		assert_eq!(record.get("sasl_username_domain"), Some(""));
	}

	#[test]
	fn other_attributes_keep_case() {
		let mut record = SessionRecord::new();
		record.insert_line("helo_name=MX.Example.COM").unwrap();

		assert_eq!(record.get("helo_name"), Some("MX.Example.COM"));
		assert_eq!(record.get("helo_name_domain"), None);
	}

	#[test]
	fn value_may_contain_separator() {
		let mut record = SessionRecord::new();
		record.insert_line("ccert_subject=CN=mx,O=example").unwrap();

		assert_eq!(record.get("ccert_subject"), Some("CN=mx,O=example"));
	}

	#[test]
	fn malformed_lines_are_refused() {
		let mut record = SessionRecord::new();

		assert_eq!(
			record.insert_line("protocol_state"),
			Err(LineError::MissingSeparator)
		);
		assert_eq!(
			record.insert_line("x_forwarded=1"),
			Err(LineError::UnknownAttribute("x_forwarded".into()))
		);
		// Derived keys can't be set directly
		assert_eq!(
			record.insert_line("sender_domain=evil.example"),
			Err(LineError::UnknownAttribute("sender_domain".into()))
		);
		assert!(record.is_empty());
	}

	#[test]
	fn later_value_wins() {
		let mut record = SessionRecord::new();
		record.insert_line("recipient=first@a.example").unwrap();
		record.insert_line("recipient=second@b.example").unwrap();

		assert_eq!(record.get("recipient"), Some("second@b.example"));
		assert_eq!(record.get("recipient_domain"), Some("b.example"));
	}

	#[test]
	fn only_known_keys() {
		let mut record = SessionRecord::new();
		for line in [
			"request=smtpd_access_policy",
			"protocol_state=RCPT",
			"sender=a@b.example",
			"bogus=1",
			"no separator",
			"sasl_username=a@b.example",
		] {
			let _ = record.insert_line(line);
		}

		let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
		assert_eq!(
			keys,
			vec![
				"protocol_state",
				"request",
				"sasl_username",
				"sasl_username_domain",
				"sender",
				"sender_domain"
			]
		);
		assert_eq!(record.value("client_address"), "");
	}
}
