//! The attributes a policy delegation request may carry.

pub const ATTRIBUTES: &[&str] = &[
	"request",
	"protocol_state",
	"protocol_name",
	"helo_name",
	"queue_id",
	"sender",
	"recipient",
	"recipient_count",
	"client_address",
	"client_name",
	"client_port",
	"reverse_client_name",
	"instance",
	"sasl_method",
	"sasl_username",
	"sasl_sender",
	"size",
	"ccert_subject",
	"ccert_issuer",
	"ccert_fingerprint",
	"ccert_pubkey_fingerprint",
	"encryption_protocol",
	"encryption_cipher",
	"encryption_keysize",
	"etrn_domain",
	"stress",
	"policy_context",
	"server_address",
	"server_port",
	"compatibility_level",
	"mail_version",
];

/// Attributes holding an address. These are lowercased and get a derived
/// domain attribute alongside them.
const IDENTITIES: &[(&str, &str)] = &[
	("sender", "sender_domain"),
	("recipient", "recipient_domain"),
	("sasl_username", "sasl_username_domain"),
];

/// Returns the canonical name of a recognized attribute.
pub fn recognize(key: &str) -> Option<&'static str> {
	ATTRIBUTES.iter().copied().find(|attr| *attr == key)
}

/// Returns the derived domain attribute for an identity attribute.
pub fn domain_key(attribute: &str) -> Option<&'static str> {
	IDENTITIES
		.iter()
		.find(|(name, _)| *name == attribute)
		.map(|(_, domain)| *domain)
}
