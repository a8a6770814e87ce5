// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use parking_lot::Mutex;

/// Who is using the shell and whether they opted into analytics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
	pub user_id: Option<String>,
	pub consent: bool,
}

impl Identity {
	/// The id analytics calls may be attributed to: present only with consent
	/// and a non-empty user id.
	pub fn analytics_user(&self) -> Option<&str> {
		match (&self.user_id, self.consent) {
			(Some(id), true) if !id.is_empty() => Some(id),
			_ => None,
		}
	}
}

/// Holds the current [`Identity`]; user id and consent always change together.
#[derive(Debug, Default)]
pub struct IdentityStore {
	inner: Mutex<Identity>,
}

impl IdentityStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the identity wholesale and returns the new value.
	pub fn set(&self, user_id: impl Into<String>, consent: bool) -> Identity {
		let next = Identity {
			user_id: Some(user_id.into()),
			consent,
		};
		let mut guard = self.inner.lock();
		*guard = next.clone();
		next
	}

	pub fn current(&self) -> Identity {
		self.inner.lock().clone()
	}
}
