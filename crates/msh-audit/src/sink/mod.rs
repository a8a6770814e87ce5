// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod file;
pub mod memory;

use std::sync::Arc;

use crate::record::AuditRecord;

/// Destination for audit records.
///
/// `append` is infallible from the caller's point of view; implementations
/// absorb their own failures. Records must be persisted in call order.
pub trait AuditSink: Send + Sync {
	fn name(&self) -> &str;

	fn append(&self, record: &AuditRecord);

	fn flush(&self) {}
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
	fn name(&self) -> &str {
		(**self).name()
	}

	fn append(&self, record: &AuditRecord) {
		(**self).append(record)
	}

	fn flush(&self) {
		(**self).flush()
	}
}
