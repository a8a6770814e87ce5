// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::sync::Arc;

use msh_analytics::{AnalyticsCall, AnalyticsSink};
use msh_audit::MemoryAuditLog;
use msh_telemetry::{Telemetry, TelemetryBuilder, TelemetryConfig};
use parking_lot::Mutex;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
	Identify(String),
	Track(AnalyticsCall),
}

impl Call {
	pub fn user_id(&self) -> &str {
		match self {
			Call::Identify(user_id) => user_id,
			Call::Track(call) => &call.user_id,
		}
	}
}

/// Records calls; `track` panics for event names listed in `panic_on`.
#[derive(Default)]
pub struct RecordingAnalytics {
	calls: Mutex<Vec<Call>>,
	panic_on: Vec<String>,
}

impl RecordingAnalytics {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn panicking_on(events: &[&str]) -> Self {
		Self {
			calls: Mutex::new(Vec::new()),
			panic_on: events.iter().map(|e| e.to_string()).collect(),
		}
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	pub fn tracked(&self) -> Vec<AnalyticsCall> {
		self
			.calls()
			.into_iter()
			.filter_map(|c| match c {
				Call::Track(call) => Some(call),
				Call::Identify(_) => None,
			})
			.collect()
	}
}

impl AnalyticsSink for RecordingAnalytics {
	fn name(&self) -> &str {
		"recording"
	}

	fn identify(&self, user_id: &str) {
		self.calls.lock().push(Call::Identify(user_id.to_string()));
	}

	fn track(&self, call: AnalyticsCall) {
		if self.panic_on.iter().any(|e| *e == call.event_name) {
			panic!("tracking client blew up on {}", call.event_name);
		}
		self.calls.lock().push(Call::Track(call));
	}
}

pub struct Harness {
	pub telemetry: Telemetry,
	pub audit: Arc<MemoryAuditLog>,
	pub analytics: Arc<RecordingAnalytics>,
	pub dir: TempDir,
}

pub fn harness() -> Harness {
	harness_with(RecordingAnalytics::new())
}

pub fn harness_with(analytics: RecordingAnalytics) -> Harness {
	let dir = tempfile::tempdir().unwrap();
	let audit = Arc::new(MemoryAuditLog::new());
	let analytics = Arc::new(analytics);
	let telemetry = TelemetryBuilder::new(TelemetryConfig::with_log_dir(dir.path()))
		.audit_sink(audit.clone())
		.analytics_sink(analytics.clone())
		.build()
		.unwrap();
	Harness {
		telemetry,
		audit,
		analytics,
		dir,
	}
}
