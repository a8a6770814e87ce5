// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use thiserror::Error;

pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Error, Debug)]
pub enum AuditError {
	#[error("failed to open audit log {path}: {source}")]
	Open {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to write audit record: {0}")]
	Write(#[from] std::io::Error),

	#[error("failed to serialize audit record: {0}")]
	Serialize(#[from] serde_json::Error),
}
