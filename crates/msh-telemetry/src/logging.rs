// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process diagnostics. Every line goes through the redactor's text pass
//! before reaching the terminal.

use std::io::{self, Write};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the configured diagnostics filter.
pub const LOG_ENV: &str = "MSH_LOG";

pub const DEFAULT_LEVEL: &str = "warn";

/// Line-buffering writer that scrubs credentials before forwarding.
pub struct RedactingWriter<W: Write> {
	inner: W,
	buffer: Vec<u8>,
}

impl<W: Write> RedactingWriter<W> {
	pub fn new(inner: W) -> Self {
		Self {
			inner,
			buffer: Vec::new(),
		}
	}

	fn write_redacted(&mut self, end: usize) -> io::Result<()> {
		let line = String::from_utf8_lossy(&self.buffer[..end]);
		let redacted = msh_redact::redact_text(&line);
		self.inner.write_all(redacted.as_bytes())?;
		self.buffer.drain(..end);
		Ok(())
	}
}

impl<W: Write> Drop for RedactingWriter<W> {
	fn drop(&mut self) {
		let _ = self.flush();
	}
}

impl<W: Write> Write for RedactingWriter<W> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.buffer.extend_from_slice(buf);
		while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
			self.write_redacted(pos + 1)?;
		}
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		if !self.buffer.is_empty() {
			self.write_redacted(self.buffer.len())?;
		}
		self.inner.flush()
	}
}

pub struct RedactingMakeWriter<M> {
	inner: M,
}

impl<M> RedactingMakeWriter<M> {
	pub fn new(inner: M) -> Self {
		Self { inner }
	}
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
	M: MakeWriter<'a>,
{
	type Writer = RedactingWriter<M::Writer>;

	fn make_writer(&'a self) -> Self::Writer {
		RedactingWriter::new(self.inner.make_writer())
	}
}

/// Builds the filter: `MSH_LOG` first, then `level`, then [`DEFAULT_LEVEL`].
pub fn env_filter(level: Option<&str>) -> EnvFilter {
	EnvFilter::try_from_env(LOG_ENV)
		.or_else(|_| EnvFilter::try_new(level.unwrap_or(DEFAULT_LEVEL)))
		.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Installs the global subscriber. Returns `false` when the host already
/// installed one; that subscriber is left in place.
pub fn init_diagnostics(level: Option<&str>) -> bool {
	tracing_subscriber::registry()
		.with(env_filter(level))
		.with(
			tracing_subscriber::fmt::layer()
				.with_target(false)
				.with_writer(RedactingMakeWriter::new(io::stderr)),
		)
		.try_init()
		.is_ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn redact_through(chunks: &[&[u8]]) -> String {
		let mut output = Vec::new();
		{
			let mut writer = RedactingWriter::new(&mut output);
			for chunk in chunks {
				writer.write_all(chunk).unwrap();
			}
		}
		String::from_utf8(output).unwrap()
	}

	#[test]
	fn masks_connection_string_in_line() {
		let out = redact_through(&[b"dialing mongodb://root:hunter2@db:27017\n"]);
		assert_eq!(out, "dialing mongodb://<credentials>@db:27017\n");
	}

	#[test]
	fn split_writes_are_joined_before_redaction() {
		let out = redact_through(&[b"uri=mongodb://root:hun", b"ter2@db/admin\nnext\n"]);
		assert!(!out.contains("hunter2"), "{out}");
		assert!(out.ends_with("next\n"));
	}

	#[test]
	fn trailing_partial_line_is_flushed_on_drop() {
		let out = redact_through(&[b"contact ops@example.com"]);
		assert_eq!(out, "contact <email>");
	}

	#[test]
	fn invalid_level_falls_back() {
		let filter = env_filter(Some("not a [valid filter"));
		assert!(!filter.to_string().is_empty());
	}
}
