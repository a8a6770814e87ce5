// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::borrow::Cow;

use serde_json::Value;

use crate::keys::SensitiveKeys;
use crate::text::redact_text;
use crate::REDACTED;

/// Nesting depth past which a subtree is replaced wholesale.
pub const MAX_DEPTH: usize = 128;

/// Structural redactor for JSON payloads.
///
/// Values under sensitive keys are replaced by [`REDACTED`] whatever their
/// type; every other string goes through [`redact_text`]. Numbers, booleans,
/// nulls and the shape of objects and arrays are preserved.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
	keys: SensitiveKeys,
}

impl Redactor {
	pub fn new(keys: SensitiveKeys) -> Self {
		Self { keys }
	}

	/// Default key set plus caller-supplied names.
	pub fn with_extra_keys<I, S>(extra: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut keys = SensitiveKeys::default();
		keys.extend(extra);
		Self { keys }
	}

	pub fn keys(&self) -> &SensitiveKeys {
		&self.keys
	}

	pub fn redact_value(&self, value: &Value) -> Value {
		let mut cloned = value.clone();
		self.redact_in_place(&mut cloned);
		cloned
	}

	pub fn redact_in_place(&self, value: &mut Value) {
		self.walk(value, 0);
	}

	pub fn redact_str<'a>(&self, s: &'a str) -> Cow<'a, str> {
		redact_text(s)
	}

	fn walk(&self, value: &mut Value, depth: usize) {
		if depth > MAX_DEPTH {
			*value = Value::String(REDACTED.to_string());
			return;
		}

		match value {
			Value::String(s) => {
				if let Cow::Owned(redacted) = redact_text(s) {
					*s = redacted;
				}
			}
			Value::Array(items) => {
				for item in items {
					self.walk(item, depth + 1);
				}
			}
			Value::Object(map) => {
				for (key, item) in map.iter_mut() {
					if self.keys.is_sensitive(key) {
						*item = Value::String(REDACTED.to_string());
					} else {
						self.walk(item, depth + 1);
					}
				}
			}
			Value::Null | Value::Bool(_) | Value::Number(_) => {}
		}
	}
}
