//! The policy delegation protocol: `key=value` lines in, terminated by an
//! empty line, and a single `action=` line back.

pub mod attribute;
mod handler;
mod record;
mod response;
mod session;

pub use handler::{trace, Handler};
pub use record::{LineError, SessionRecord};
pub use response::Response;
pub use session::{Session, SessionError, Transaction};
