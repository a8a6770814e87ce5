// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{AuditError, AuditResult};
use crate::record::AuditRecord;
use crate::sink::AuditSink;

type Fallback = Box<dyn Write + Send>;

/// Storage under the audit log: a writer that can report its length and be
/// cut back to an earlier one.
trait LogFile: Write + Send {
	fn len(&self) -> io::Result<u64>;
	fn truncate(&mut self, len: u64) -> io::Result<()>;
	fn sync(&self) -> io::Result<()>;
}

impl LogFile for File {
	fn len(&self) -> io::Result<u64> {
		Ok(self.metadata()?.len())
	}

	fn truncate(&mut self, len: u64) -> io::Result<()> {
		self.set_len(len)
	}

	fn sync(&self) -> io::Result<()> {
		self.sync_data()
	}
}

/// Writes one whole line or nothing: a failed write is cut back to the
/// length the file had before it, so no partial line is left behind.
fn append_line(file: &mut dyn LogFile, line: &[u8]) -> io::Result<()> {
	let start = file.len()?;
	if let Err(e) = file.write_all(line).and_then(|_| file.flush()) {
		if let Err(rollback) = file.truncate(start) {
			tracing::error!(error = %rollback, "audit log rollback failed, last line may be partial");
		}
		return Err(e);
	}
	Ok(())
}

/// JSON-lines audit log backed by a single file handle.
///
/// The handle sits behind a mutex so concurrent appenders are serialized and
/// the file stays a linear history. When a write fails the line is sent to the
/// fallback writer (stderr unless overridden) and a warning is traced.
pub struct FileAuditLog {
	path: PathBuf,
	file: Mutex<Box<dyn LogFile>>,
	fallback: Mutex<Fallback>,
}

impl FileAuditLog {
	/// Opens `path` for appending, creating it if necessary.
	pub fn open(path: impl AsRef<Path>) -> AuditResult<Self> {
		let path = path.as_ref().to_path_buf();
		let file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&path)
			.map_err(|source| AuditError::Open {
				path: path.clone(),
				source,
			})?;

		Ok(Self {
			path,
			file: Mutex::new(Box::new(file)),
			fallback: Mutex::new(Box::new(io::stderr())),
		})
	}

	/// Replaces the diagnostic stream used when the log file cannot be written.
	pub fn with_fallback<W>(self, fallback: W) -> Self
	where
		W: Write + Send + 'static,
	{
		*self.fallback.lock() = Box::new(fallback);
		self
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Appends one record, returning the underlying failure instead of
	/// diverting it. A failed write leaves the file as it was.
	pub fn try_append(&self, record: &AuditRecord) -> AuditResult<()> {
		let line = record.to_json_line()?;
		let mut file = self.file.lock();
		append_line(file.as_mut(), line.as_bytes())?;
		Ok(())
	}

	fn divert(&self, record: &AuditRecord, error: &AuditError) {
		tracing::warn!(
			path = %self.path.display(),
			event_kind = %record.event_kind,
			error = %error,
			"audit log write failed, record diverted to fallback stream"
		);

		let line = match record.to_json_line() {
			Ok(line) => line,
			Err(_) => format!(
				"{{\"sessionId\":{:?},\"eventKind\":{:?},\"unserializable\":true}}\n",
				record.session_id, record.event_kind
			),
		};

		let mut fallback = self.fallback.lock();
		if let Err(e) = fallback.write_all(line.as_bytes()).and_then(|_| fallback.flush()) {
			tracing::error!(error = %e, "audit fallback stream unavailable");
		}
	}
}

impl std::fmt::Debug for FileAuditLog {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FileAuditLog")
			.field("path", &self.path)
			.finish_non_exhaustive()
	}
}

impl AuditSink for FileAuditLog {
	fn name(&self) -> &str {
		"file"
	}

	fn append(&self, record: &AuditRecord) {
		if let Err(e) = self.try_append(record) {
			self.divert(record, &e);
		}
	}

	fn flush(&self) {
		if let Err(e) = self.file.lock().sync() {
			tracing::debug!(path = %self.path.display(), error = %e, "audit log sync failed");
		}
	}
}
