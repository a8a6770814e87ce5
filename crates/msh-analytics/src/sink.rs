// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::properties::Properties;

/// One outgoing track call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsCall {
	pub user_id: String,
	pub event_name: String,
	pub properties: Properties,
}

impl AnalyticsCall {
	pub fn new(
		user_id: impl Into<String>,
		event_name: impl Into<String>,
		properties: Properties,
	) -> Self {
		Self {
			user_id: user_id.into(),
			event_name: event_name.into(),
			properties,
		}
	}
}

/// The two-method capability the router depends on.
///
/// Both calls are fire-and-forget: they must return promptly and must not
/// surface failures to the caller.
pub trait AnalyticsSink: Send + Sync {
	fn name(&self) -> &str;

	fn identify(&self, user_id: &str);

	fn track(&self, call: AnalyticsCall);

	/// Waits up to `timeout` for queued calls to be delivered.
	fn flush(&self, _timeout: Duration) -> Result<()> {
		Ok(())
	}

	/// Flushes and stops accepting calls.
	fn shutdown(&self, _timeout: Duration) -> Result<()> {
		Ok(())
	}
}

impl<T: AnalyticsSink + ?Sized> AnalyticsSink for Arc<T> {
	fn name(&self) -> &str {
		(**self).name()
	}

	fn identify(&self, user_id: &str) {
		(**self).identify(user_id)
	}

	fn track(&self, call: AnalyticsCall) {
		(**self).track(call)
	}

	fn flush(&self, timeout: Duration) -> Result<()> {
		(**self).flush(timeout)
	}

	fn shutdown(&self, timeout: Duration) -> Result<()> {
		(**self).shutdown(timeout)
	}
}

/// Used when no valid remote configuration is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAnalytics;

impl AnalyticsSink for DisabledAnalytics {
	fn name(&self) -> &str {
		"disabled"
	}

	fn identify(&self, _user_id: &str) {}

	fn track(&self, _call: AnalyticsCall) {}
}
