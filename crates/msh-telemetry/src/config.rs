// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration: built-in defaults, an optional TOML file, then the
//! environment. Later layers win field by field.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use zeroize::Zeroizing;

use crate::error::ConfigError;

pub const ENV_LOG_DIR: &str = "MSH_LOG_DIR";
pub const ENV_ANALYTICS_HOST: &str = "MSH_ANALYTICS_HOST";
pub const ENV_WRITE_KEY: &str = "MSH_ANALYTICS_WRITE_KEY";
pub const ENV_LOG: &str = crate::logging::LOG_ENV;

/// Write key baked into release builds.
const BUILD_WRITE_KEY: Option<&str> = option_env!("MSH_ANALYTICS_WRITE_KEY");

/// Resolved configuration handed to [`crate::initialize`].
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
	pub log_dir: PathBuf,
	pub analytics: AnalyticsConfig,
	pub redaction: RedactionConfig,
	/// `tracing` filter directive for process diagnostics.
	pub diagnostics_level: String,
}

impl TelemetryConfig {
	/// Defaults rooted at an explicit log directory, no write key.
	pub fn with_log_dir(log_dir: impl Into<PathBuf>) -> Self {
		Self {
			log_dir: log_dir.into(),
			analytics: AnalyticsConfig::default(),
			redaction: RedactionConfig::default(),
			diagnostics_level: crate::logging::DEFAULT_LEVEL.to_string(),
		}
	}
}

#[derive(Clone)]
pub struct AnalyticsConfig {
	pub host: String,
	pub write_key: Option<Zeroizing<String>>,
	pub flush_interval: Duration,
	pub max_batch_size: usize,
	pub max_queue_size: usize,
	pub request_timeout: Duration,
}

impl Default for AnalyticsConfig {
	fn default() -> Self {
		Self {
			host: msh_analytics::DEFAULT_HOST.to_string(),
			write_key: None,
			flush_interval: Duration::from_secs(10),
			max_batch_size: 20,
			max_queue_size: 1000,
			request_timeout: Duration::from_secs(10),
		}
	}
}

impl std::fmt::Debug for AnalyticsConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AnalyticsConfig")
			.field("host", &self.host)
			.field("write_key", &self.write_key.as_ref().map(|_| "[REDACTED]"))
			.field("flush_interval", &self.flush_interval)
			.field("max_batch_size", &self.max_batch_size)
			.field("max_queue_size", &self.max_queue_size)
			.field("request_timeout", &self.request_timeout)
			.finish()
	}
}

#[derive(Debug, Clone, Default)]
pub struct RedactionConfig {
	pub extra_sensitive_keys: Vec<String>,
}

/// Partial configuration; every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfigLayer {
	#[serde(default)]
	pub log_dir: Option<PathBuf>,
	#[serde(default)]
	pub analytics: Option<AnalyticsLayer>,
	#[serde(default)]
	pub redaction: Option<RedactionLayer>,
	#[serde(default)]
	pub diagnostics: Option<DiagnosticsLayer>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsLayer {
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default, deserialize_with = "deserialize_secret")]
	pub write_key: Option<Zeroizing<String>>,
	#[serde(default)]
	pub flush_interval_secs: Option<u64>,
	#[serde(default)]
	pub max_batch_size: Option<usize>,
	#[serde(default)]
	pub max_queue_size: Option<usize>,
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for AnalyticsLayer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AnalyticsLayer")
			.field("host", &self.host)
			.field("write_key", &self.write_key.as_ref().map(|_| "[REDACTED]"))
			.field("flush_interval_secs", &self.flush_interval_secs)
			.field("max_batch_size", &self.max_batch_size)
			.field("max_queue_size", &self.max_queue_size)
			.field("request_timeout_secs", &self.request_timeout_secs)
			.finish()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedactionLayer {
	#[serde(default)]
	pub extra_sensitive_keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsLayer {
	#[serde(default)]
	pub level: Option<String>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<Zeroizing<String>>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<String>::deserialize(deserializer)?.map(Zeroizing::new))
}

impl TelemetryConfigLayer {
	/// Overlays `other` on top of `self`.
	pub fn merge(&mut self, other: TelemetryConfigLayer) {
		if other.log_dir.is_some() {
			self.log_dir = other.log_dir;
		}
		if let Some(theirs) = other.analytics {
			let ours = self.analytics.get_or_insert_with(AnalyticsLayer::default);
			if theirs.host.is_some() {
				ours.host = theirs.host;
			}
			if theirs.write_key.is_some() {
				ours.write_key = theirs.write_key;
			}
			if theirs.flush_interval_secs.is_some() {
				ours.flush_interval_secs = theirs.flush_interval_secs;
			}
			if theirs.max_batch_size.is_some() {
				ours.max_batch_size = theirs.max_batch_size;
			}
			if theirs.max_queue_size.is_some() {
				ours.max_queue_size = theirs.max_queue_size;
			}
			if theirs.request_timeout_secs.is_some() {
				ours.request_timeout_secs = theirs.request_timeout_secs;
			}
		}
		if let Some(theirs) = other.redaction {
			if theirs.extra_sensitive_keys.is_some() {
				self
					.redaction
					.get_or_insert_with(RedactionLayer::default)
					.extra_sensitive_keys = theirs.extra_sensitive_keys;
			}
		}
		if let Some(theirs) = other.diagnostics {
			if theirs.level.is_some() {
				self
					.diagnostics
					.get_or_insert_with(DiagnosticsLayer::default)
					.level = theirs.level;
			}
		}
	}

	pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
		toml::from_str(content).map_err(|source| ConfigError::TomlParse {
			path: path.to_path_buf(),
			source,
		})
	}

	/// A missing file is an empty layer, not an error.
	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		match fs::read_to_string(path) {
			Ok(content) => {
				tracing::debug!(path = %path.display(), "loaded telemetry config file");
				Self::from_toml_str(&content, path)
			}
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
			Err(source) => Err(ConfigError::Io {
				path: path.to_path_buf(),
				source,
			}),
		}
	}

	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_env_with(|var| std::env::var(var).ok())
	}

	/// Reads the environment through `lookup` so tests need not touch the
	/// process environment.
	pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut layer = Self::default();

		if let Some(dir) = lookup(ENV_LOG_DIR) {
			if dir.is_empty() {
				return Err(ConfigError::EmptyEnv {
					var: ENV_LOG_DIR.to_string(),
				});
			}
			layer.log_dir = Some(PathBuf::from(dir));
		}

		let host = lookup(ENV_ANALYTICS_HOST).filter(|h| !h.is_empty());
		let write_key = secret_from_env(&lookup, ENV_WRITE_KEY)?;
		if host.is_some() || write_key.is_some() {
			layer.analytics = Some(AnalyticsLayer {
				host,
				write_key,
				..AnalyticsLayer::default()
			});
		}

		if let Some(level) = lookup(ENV_LOG).filter(|l| !l.is_empty()) {
			layer.diagnostics = Some(DiagnosticsLayer { level: Some(level) });
		}

		Ok(layer)
	}

	pub fn finalize(self) -> Result<TelemetryConfig, ConfigError> {
		let log_dir = match self.log_dir {
			Some(dir) => dir,
			None => default_log_dir().ok_or(ConfigError::NoLogDir)?,
		};

		let mut config = TelemetryConfig::with_log_dir(log_dir);
		config.analytics.write_key = BUILD_WRITE_KEY
			.filter(|k| !k.is_empty())
			.map(|k| Zeroizing::new(k.to_string()));

		if let Some(analytics) = self.analytics {
			let target = &mut config.analytics;
			if let Some(host) = analytics.host {
				target.host = host;
			}
			if analytics.write_key.is_some() {
				target.write_key = analytics.write_key;
			}
			if let Some(secs) = analytics.flush_interval_secs {
				if secs == 0 {
					return Err(ConfigError::invalid_value(
						"analytics.flush_interval_secs",
						"must be positive",
					));
				}
				target.flush_interval = Duration::from_secs(secs);
			}
			if let Some(size) = analytics.max_batch_size {
				if size == 0 {
					return Err(ConfigError::invalid_value(
						"analytics.max_batch_size",
						"must be positive",
					));
				}
				target.max_batch_size = size;
			}
			if let Some(size) = analytics.max_queue_size {
				if size == 0 {
					return Err(ConfigError::invalid_value(
						"analytics.max_queue_size",
						"must be positive",
					));
				}
				target.max_queue_size = size;
			}
			if let Some(secs) = analytics.request_timeout_secs {
				if secs == 0 {
					return Err(ConfigError::invalid_value(
						"analytics.request_timeout_secs",
						"must be positive",
					));
				}
				target.request_timeout = Duration::from_secs(secs);
			}
		}

		if let Some(keys) = self.redaction.and_then(|r| r.extra_sensitive_keys) {
			config.redaction.extra_sensitive_keys = keys;
		}
		if let Some(level) = self.diagnostics.and_then(|d| d.level) {
			config.diagnostics_level = level;
		}

		Ok(config)
	}
}

fn secret_from_env<F>(lookup: &F, var: &str) -> Result<Option<Zeroizing<String>>, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let file_var = format!("{var}_FILE");
	if let Some(path) = lookup(&file_var) {
		if path.is_empty() {
			return Err(ConfigError::EmptyEnv { var: file_var });
		}
		let path = PathBuf::from(path);
		let content = Zeroizing::new(
			fs::read_to_string(&path).map_err(|source| ConfigError::Io { path, source })?,
		);
		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(Zeroizing::new(secret)));
	}

	Ok(lookup(var).filter(|v| !v.is_empty()).map(Zeroizing::new))
}

pub fn default_log_dir() -> Option<PathBuf> {
	dirs::data_local_dir().map(|d| d.join("msh").join("logs"))
}

pub fn default_config_file() -> Option<PathBuf> {
	dirs::config_dir().map(|d| d.join("msh").join("telemetry.toml"))
}

/// Loads defaults, the user config file, then the environment.
pub fn load_config() -> Result<TelemetryConfig, ConfigError> {
	load_config_from(default_config_file().as_deref())
}

pub fn load_config_from(file: Option<&Path>) -> Result<TelemetryConfig, ConfigError> {
	let mut layer = TelemetryConfigLayer::default();
	if let Some(path) = file {
		layer.merge(TelemetryConfigLayer::from_file(path)?);
	}
	layer.merge(TelemetryConfigLayer::from_env()?);
	layer.finalize()
}
