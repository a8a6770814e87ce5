// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use msh_analytics::{AnalyticsError, AnalyticsSink, DisabledAnalytics, RemoteAnalytics};
use msh_audit::{AuditLevel, AuditRecord, AuditSink, FileAuditLog};
use msh_redact::Redactor;
use serde_json::{json, Value};

use crate::bus::EventBus;
use crate::config::{AnalyticsConfig, TelemetryConfig};
use crate::error::InitError;
use crate::events::{DomainEvent, EventKind};
use crate::identity::{Identity, IdentityStore};
use crate::router::Router;
use crate::session::Session;

/// Audit kind of the record written when the remote analytics sink is not
/// available, either for lack of a write key or because construction failed.
pub const ANALYTICS_DISABLED_KIND: &str = "telemetry:analytics-disabled";

/// Initializes a session from `config`. Each call yields an independent
/// session with its own log file.
pub fn initialize(config: TelemetryConfig) -> Result<Telemetry, InitError> {
	TelemetryBuilder::new(config).build()
}

pub struct TelemetryBuilder {
	config: TelemetryConfig,
	audit: Option<Arc<dyn AuditSink>>,
	analytics: Option<Arc<dyn AnalyticsSink>>,
}

impl TelemetryBuilder {
	pub fn new(config: TelemetryConfig) -> Self {
		Self {
			config,
			audit: None,
			analytics: None,
		}
	}

	/// Replaces the file-backed audit log.
	pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
		self.audit = Some(sink);
		self
	}

	/// Skips analytics selection and uses `sink` as is.
	pub fn analytics_sink(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
		self.analytics = Some(sink);
		self
	}

	pub fn build(self) -> Result<Telemetry, InitError> {
		let session = Arc::new(Session::create(&self.config.log_dir)?);

		let audit: Arc<dyn AuditSink> = match self.audit {
			Some(sink) => sink,
			None => Arc::new(FileAuditLog::open(session.log_path())?),
		};

		let analytics = match self.analytics {
			Some(sink) => sink,
			None => select_analytics(&self.config.analytics, &session, audit.as_ref()),
		};

		let redactor = Redactor::with_extra_keys(&self.config.redaction.extra_sensitive_keys);

		tracing::info!(session_id = %session.id_str(), "Current sessionID: {}", session.id_str());
		tracing::debug!(
			log_path = %session.log_path().display(),
			analytics = analytics.name(),
			"telemetry initialized"
		);

		let router = Router::new(
			session,
			Arc::new(IdentityStore::new()),
			audit,
			analytics,
			redactor,
		);
		Ok(Telemetry {
			router: Arc::new(router),
		})
	}
}

/// Remote when a usable write key is configured, Disabled otherwise. A
/// missing key or a construction failure is written to the audit log and
/// never returned.
fn select_analytics(
	config: &AnalyticsConfig,
	session: &Session,
	audit: &dyn AuditSink,
) -> Arc<dyn AnalyticsSink> {
	let built = match config.write_key.as_ref() {
		Some(write_key) => RemoteAnalytics::builder()
			.write_key(write_key.as_str())
			.host(config.host.as_str())
			.request_timeout(config.request_timeout)
			.flush_interval(config.flush_interval)
			.max_batch_size(config.max_batch_size)
			.max_queue_size(config.max_queue_size)
			.build(),
		None => Err(AnalyticsError::MissingWriteKey),
	};

	match built {
		Ok(remote) => Arc::new(remote),
		Err(e) => {
			tracing::warn!(error = %e, "remote analytics unavailable; analytics disabled");
			let record = AuditRecord::new(
				session.id_str(),
				ANALYTICS_DISABLED_KIND,
				json!({ "error": e.to_string() }),
			)
			.with_level(AuditLevel::Error);
			audit.append(&record);
			Arc::new(DisabledAnalytics)
		}
	}
}

/// Handle to an initialized session. Cloning shares the session.
#[derive(Clone)]
pub struct Telemetry {
	router: Arc<Router>,
}

impl Telemetry {
	pub fn session(&self) -> &Session {
		self.router.session()
	}

	pub fn identity(&self) -> Identity {
		self.router.identity()
	}

	/// Name of the active analytics sink (`"remote"` or `"disabled"`).
	pub fn analytics_name(&self) -> &str {
		self.router.analytics_sink().name()
	}

	pub fn route(&self, event: &DomainEvent) {
		self.router.route(event);
	}

	pub fn route_raw(&self, name: &str, payload: &Value) -> Option<EventKind> {
		self.router.route_raw(name, payload)
	}

	/// Subscribes one handler per event kind on `bus`.
	pub fn register(&self, bus: &mut dyn EventBus) {
		for kind in EventKind::ALL {
			let router = Arc::clone(&self.router);
			bus.on(
				kind.bus_name(),
				Box::new(move |payload: &Value| router.route_payload(kind, payload)),
			);
		}
	}

	/// Flushes the audit log and drains the analytics queue. Failures are
	/// logged, never returned.
	pub fn shutdown(&self, timeout: Duration) {
		self.router.audit_sink().flush();
		if let Err(e) = self.router.analytics_sink().shutdown(timeout) {
			tracing::warn!(error = %e, "analytics shutdown incomplete");
		}
	}
}

impl std::fmt::Debug for Telemetry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Telemetry")
			.field("session_id", &self.session().id_str())
			.field("log_path", &self.session().log_path())
			.field("analytics", &self.analytics_name())
			.finish()
	}
}
