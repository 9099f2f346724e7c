use thiserror::Error;
use tracing::debug;

use crate::config::Limits;

use super::SessionRecord;

/// What a connection produced once it sent a terminating empty line.
#[derive(Clone, Debug, PartialEq)]
pub enum Transaction {
	/// The terminator arrived without any attributes before it.
	Empty,
	Complete(SessionRecord),
}

/// Assembles transactions out of the bytes read from one connection. This
/// does no networking; it only turns bytes into [Transaction]s.
pub struct Session {
	limits: Limits,
	pending: Vec<u8>,
	record: SessionRecord,
	lines: usize,
}

impl Session {
	pub fn new(limits: Limits) -> Self {
		Self {
			limits,
			pending: vec![],
			record: SessionRecord::new(),
			lines: 0,
		}
	}

	pub fn push(&mut self, data: &[u8]) {
		self.pending.extend_from_slice(data);
	}

	/// Consume buffered lines until a transaction ends. Anything after that
	/// transaction's terminator stays buffered for the next call.
	pub fn next_transaction(&mut self) -> Result<Option<Transaction>, SessionError> {
		loop {
			let newline = match self.pending.iter().position(|b| *b == b'\n') {
				Some(idx) => idx,
				None => {
					if self.pending.len() > self.limits.max_line_length {
						return Err(SessionError::LineTooLong(self.limits.max_line_length));
					}

					return Ok(None);
				}
			};

			if newline > self.limits.max_line_length {
				return Err(SessionError::LineTooLong(self.limits.max_line_length));
			}

			let raw: Vec<u8> = self.pending.drain(..=newline).collect();
			let line = String::from_utf8_lossy(&raw[..newline]);

			if line.is_empty() {
				self.lines = 0;

				if self.record.is_empty() {
					return Ok(Some(Transaction::Empty));
				}

				return Ok(Some(Transaction::Complete(std::mem::take(
					&mut self.record,
				))));
			}

			self.lines += 1;
			if self.lines > self.limits.max_lines {
				return Err(SessionError::TooManyLines(self.limits.max_lines));
			}

			debug!("smtp session: {}", line);
			if let Err(err) = self.record.insert_line(&line) {
				debug!("Drop invalid smtp session input: {} ({})", line, err);
			}
		}
	}

	/// True if nothing of a transaction has been received yet.
	pub fn is_idle(&self) -> bool {
		self.pending.is_empty() && self.record.is_empty() && self.lines == 0
	}
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SessionError {
	#[error("line exceeded {0} bytes without a newline")]
	LineTooLong(usize),
	#[error("more than {0} attribute lines in one transaction")]
	TooManyLines(usize),
}
