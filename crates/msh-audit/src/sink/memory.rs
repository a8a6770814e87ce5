// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use parking_lot::Mutex;

use crate::record::AuditRecord;
use crate::sink::AuditSink;

/// Keeps records in memory. Used by embedders that ship records elsewhere
/// and by tests.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
	records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn records(&self) -> Vec<AuditRecord> {
		self.records.lock().clone()
	}

	pub fn len(&self) -> usize {
		self.records.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.lock().is_empty()
	}

	pub fn kinds(&self) -> Vec<String> {
		self.records.lock().iter().map(|r| r.event_kind.clone()).collect()
	}
}

impl AuditSink for MemoryAuditLog {
	fn name(&self) -> &str {
		"memory"
	}

	fn append(&self, record: &AuditRecord) {
		self.records.lock().push(record.clone());
	}
}
