// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;

use serde::{Serialize, Serializer};
use zeroize::Zeroize;

use crate::error::{AnalyticsError, Result};

const REDACTED: &str = "[REDACTED]";

/// Credential for the remote tracking endpoint.
///
/// Redacted in `Debug`, `Display` and `Serialize`; zeroized on drop. Use
/// [`WriteKey::expose`] at the single point where the key goes on the wire.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct WriteKey {
	inner: String,
}

impl WriteKey {
	/// Validates and wraps a write key. Surrounding whitespace is trimmed;
	/// an empty key or one with embedded whitespace is rejected.
	pub fn new(key: impl Into<String>) -> Result<Self> {
		let mut raw = key.into();
		let trimmed = raw.trim();

		if trimmed.is_empty() {
			raw.zeroize();
			return Err(AnalyticsError::InvalidWriteKey("empty"));
		}
		if trimmed.chars().any(char::is_whitespace) {
			raw.zeroize();
			return Err(AnalyticsError::InvalidWriteKey("contains whitespace"));
		}

		let inner = trimmed.to_string();
		raw.zeroize();
		Ok(Self { inner })
	}

	pub fn expose(&self) -> &str {
		&self.inner
	}
}

impl fmt::Debug for WriteKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("WriteKey").field(&REDACTED).finish()
	}
}

impl fmt::Display for WriteKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl Serialize for WriteKey {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl PartialEq for WriteKey {
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl Eq for WriteKey {}
