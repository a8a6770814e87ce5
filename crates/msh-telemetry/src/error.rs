// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use msh_audit::AuditError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("{var} is set but empty")]
	EmptyEnv { var: String },

	#[error("invalid value for {field}: {message}")]
	InvalidValue { field: String, message: String },

	#[error("could not determine a default log directory; set MSH_LOG_DIR")]
	NoLogDir,
}

impl ConfigError {
	pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			field: field.into(),
			message: message.into(),
		}
	}
}

/// Fatal initialization failures. Nothing after `initialize` returns an
/// error to the host.
#[derive(Debug, Error)]
pub enum InitError {
	#[error("failed to generate session id: {0}")]
	SessionId(#[source] rand::Error),

	#[error("failed to create log directory {path}: {source}")]
	LogDir {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error(transparent)]
	AuditLog(#[from] AuditError),

	#[error(transparent)]
	Config(#[from] ConfigError),
}
