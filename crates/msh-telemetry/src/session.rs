// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::InitError;

/// Twelve-byte, ObjectId-shaped session identifier: a big-endian seconds
/// timestamp followed by eight bytes from the OS random source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId([u8; 12]);

impl SessionId {
	pub fn generate() -> Result<Self, InitError> {
		let seconds = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_secs() as u32)
			.unwrap_or(0);

		let mut bytes = [0u8; 12];
		bytes[..4].copy_from_slice(&seconds.to_be_bytes());
		OsRng
			.try_fill_bytes(&mut bytes[4..])
			.map_err(InitError::SessionId)?;
		Ok(Self(bytes))
	}

	pub fn from_bytes(bytes: [u8; 12]) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 12] {
		&self.0
	}

	/// Seconds since the epoch encoded in the first four bytes.
	pub fn timestamp(&self) -> u32 {
		u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for byte in self.0 {
			write!(f, "{byte:02x}")?;
		}
		Ok(())
	}
}

/// Process-lifetime session: one id, one audit log destination.
#[derive(Debug, Clone)]
pub struct Session {
	id: SessionId,
	id_hex: String,
	log_path: PathBuf,
	started_at: DateTime<Utc>,
}

impl Session {
	/// Generates a fresh id and derives `<log_dir>/<id>_log`, creating
	/// `log_dir` if needed. Every call yields an independent session.
	pub fn create(log_dir: &Path) -> Result<Self, InitError> {
		std::fs::create_dir_all(log_dir).map_err(|source| InitError::LogDir {
			path: log_dir.to_path_buf(),
			source,
		})?;
		let id = SessionId::generate()?;
		Ok(Self::with_id(id, log_dir))
	}

	pub fn with_id(id: SessionId, log_dir: &Path) -> Self {
		let id_hex = id.to_string();
		Self {
			log_path: log_dir.join(format!("{id_hex}_log")),
			id,
			id_hex,
			started_at: Utc::now(),
		}
	}

	pub fn id(&self) -> SessionId {
		self.id
	}

	/// Hex form used in records and file names.
	pub fn id_str(&self) -> &str {
		&self.id_hex
	}

	pub fn log_path(&self) -> &Path {
		&self.log_path
	}

	pub fn started_at(&self) -> DateTime<Utc> {
		self.started_at
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn id_is_24_lowercase_hex() {
		let id = SessionId::generate().unwrap().to_string();
		assert_eq!(id.len(), 24);
		assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
	}

	#[test]
	fn ids_are_unique() {
		let a = SessionId::generate().unwrap();
		let b = SessionId::generate().unwrap();
		assert_ne!(a, b);
	}

	#[test]
	fn timestamp_prefix_is_recent() {
		let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as u32;
		let id = SessionId::generate().unwrap();
		assert!(now.abs_diff(id.timestamp()) <= 2);
	}

	#[test]
	fn log_path_is_derived_from_id() {
		let id = SessionId::from_bytes([0xab; 12]);
		let session = Session::with_id(id, Path::new("/tmp/msh"));
		assert_eq!(
			session.log_path(),
			Path::new("/tmp/msh/abababababababababababab_log")
		);
		assert_eq!(session.id_str(), "abababababababababababab");
	}

	#[test]
	fn create_makes_log_dir() {
		let dir = tempfile::tempdir().unwrap();
		let nested = dir.path().join("a").join("b");
		let session = Session::create(&nested).unwrap();
		assert!(nested.is_dir());
		assert_eq!(session.log_path().parent(), Some(nested.as_path()));
	}
}
