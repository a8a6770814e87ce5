// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
	#[default]
	Info,
	Error,
}

impl fmt::Display for AuditLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AuditLevel::Info => f.write_str("info"),
			AuditLevel::Error => f.write_str("error"),
		}
	}
}

/// One line of the session audit log.
///
/// `payload` is expected to be redacted already; sinks persist it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
	pub session_id: String,
	pub event_kind: String,
	pub timestamp: DateTime<Utc>,
	#[serde(default)]
	pub level: AuditLevel,
	#[serde(default)]
	pub payload: Value,
}

impl AuditRecord {
	pub fn new(session_id: impl Into<String>, event_kind: impl Into<String>, payload: Value) -> Self {
		Self {
			session_id: session_id.into(),
			event_kind: event_kind.into(),
			timestamp: Utc::now(),
			level: AuditLevel::Info,
			payload,
		}
	}

	pub fn with_level(mut self, level: AuditLevel) -> Self {
		self.level = level;
		self
	}

	pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
		self.timestamp = timestamp;
		self
	}

	/// Serializes the record as one newline-terminated JSON line.
	pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
		let json = serde_json::to_string(self)?;
		Ok(format!("{json}\n"))
	}
}
