// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashSet;

/// Key names whose values are always replaced, compared after normalization.
pub const DEFAULT_SENSITIVE_KEYS: &[&str] = &[
	"password",
	"pwd",
	"passwd",
	"pass",
	"secret",
	"token",
	"apikey",
	"accesskey",
	"accesskeyid",
	"secretaccesskey",
	"sessiontoken",
	"accesstoken",
	"refreshtoken",
	"authorization",
	"privatekey",
	"masterkey",
	"keymaterial",
	"clientsecret",
	"credentials",
	"cookie",
];

/// Suffixes that mark a normalized key as sensitive (`sslPassword`, `dbToken`).
const SENSITIVE_SUFFIXES: &[&str] = &["password", "secret", "token"];

/// Case- and separator-insensitive set of sensitive key names.
///
/// `api_key`, `apiKey` and `API-KEY` all normalize to `apikey`.
#[derive(Debug, Clone)]
pub struct SensitiveKeys {
	names: HashSet<String>,
}

impl SensitiveKeys {
	pub fn empty() -> Self {
		Self {
			names: HashSet::new(),
		}
	}

	pub fn insert(&mut self, key: &str) {
		let normalized = normalize(key);
		if !normalized.is_empty() {
			self.names.insert(normalized);
		}
	}

	pub fn extend<I, S>(&mut self, keys: I)
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		for key in keys {
			self.insert(key.as_ref());
		}
	}

	pub fn is_sensitive(&self, key: &str) -> bool {
		let normalized = normalize(key);
		if self.names.contains(&normalized) {
			return true;
		}
		SENSITIVE_SUFFIXES
			.iter()
			.any(|suffix| normalized.len() > suffix.len() && normalized.ends_with(suffix))
	}

	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}
}

impl Default for SensitiveKeys {
	fn default() -> Self {
		let mut keys = Self::empty();
		keys.extend(DEFAULT_SENSITIVE_KEYS);
		keys
	}
}

fn normalize(key: &str) -> String {
	key
		.chars()
		.filter(|c| !matches!(c, '_' | '-' | '.' | ' '))
		.flat_map(char::to_lowercase)
		.collect()
}
