// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fan-out of shell events to the audit log and the analytics sink.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use msh_analytics::{AnalyticsCall, AnalyticsSink, Properties};
use msh_audit::{AuditLevel, AuditRecord, AuditSink};
use msh_redact::{redact_uri, Redactor};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{trace, warn};

use crate::events::{ConnectInfo, DomainEvent, ErrorInfo, ErrorOrigin, EventKind};
use crate::identity::{Identity, IdentityStore};
use crate::session::Session;

enum AnalyticsAction {
	Identify,
	Track(&'static str, Properties),
}

/// Maps each [`DomainEvent`] to one audit record and at most one analytics
/// call.
///
/// Routing is synchronous and never fails: sink panics are caught and logged,
/// malformed payloads are recorded as such.
pub struct Router {
	session: Arc<Session>,
	identity: Arc<IdentityStore>,
	audit: Arc<dyn AuditSink>,
	analytics: Arc<dyn AnalyticsSink>,
	redactor: Redactor,
}

impl Router {
	pub fn new(
		session: Arc<Session>,
		identity: Arc<IdentityStore>,
		audit: Arc<dyn AuditSink>,
		analytics: Arc<dyn AnalyticsSink>,
		redactor: Redactor,
	) -> Self {
		Self {
			session,
			identity,
			audit,
			analytics,
			redactor,
		}
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn identity(&self) -> Identity {
		self.identity.current()
	}

	pub fn analytics_sink(&self) -> &Arc<dyn AnalyticsSink> {
		&self.analytics
	}

	pub fn audit_sink(&self) -> &Arc<dyn AuditSink> {
		&self.audit
	}

	pub fn route(&self, event: &DomainEvent) {
		let identity = match event {
			DomainEvent::NewUser(user) | DomainEvent::UpdateUser(user) => {
				self.identity.set(user.user_id.clone(), user.enable_telemetry)
			}
			_ => self.identity.current(),
		};

		let kind = event.kind();
		let level = match event {
			DomainEvent::Error(_) => AuditLevel::Error,
			_ => AuditLevel::Info,
		};
		let payload = self.audit_payload(event, &identity);
		self.append(AuditRecord::new(self.session.id_str(), kind.bus_name(), payload).with_level(level));

		if kind.is_local_only() {
			trace!(event_kind = %kind, "local-only event kept out of analytics");
			return;
		}
		let Some(action) = self.analytics_action(event) else {
			return;
		};
		match identity.analytics_user() {
			Some(user_id) => self.dispatch(user_id, action),
			None => trace!(event_kind = %kind, "analytics skipped without consent"),
		}
	}

	/// Routes a named bus payload. Unknown names are ignored and yield `None`.
	pub fn route_raw(&self, name: &str, payload: &Value) -> Option<EventKind> {
		let Some(kind) = EventKind::parse(name) else {
			trace!(event = name, "ignoring unknown event kind");
			return None;
		};
		self.route_payload(kind, payload);
		Some(kind)
	}

	pub fn route_payload(&self, kind: EventKind, payload: &Value) {
		match DomainEvent::from_payload(kind, payload) {
			Ok(event) => self.route(&event),
			Err(e) => {
				warn!(event_kind = %kind, category = ?e.classify(), "malformed event payload");
				let record = AuditRecord::new(
					self.session.id_str(),
					kind.bus_name(),
					json!({
						"malformed": true,
						"raw": self.redactor.redact_value(payload),
					}),
				)
				.with_level(AuditLevel::Error);
				self.append(record);
			}
		}
	}

	fn append(&self, record: AuditRecord) {
		let audit = &self.audit;
		if catch_unwind(AssertUnwindSafe(|| audit.append(&record))).is_err() {
			warn!(
				sink = audit.name(),
				event_kind = %record.event_kind,
				"audit sink panicked, record lost"
			);
		}
	}

	fn dispatch(&self, user_id: &str, action: AnalyticsAction) {
		let analytics = &self.analytics;
		let outcome = catch_unwind(AssertUnwindSafe(|| match action {
			AnalyticsAction::Identify => analytics.identify(user_id),
			AnalyticsAction::Track(event_name, properties) => {
				let properties = self.redact_properties(properties);
				analytics.track(AnalyticsCall::new(user_id, event_name, properties));
			}
		}));
		if outcome.is_err() {
			warn!(sink = analytics.name(), "analytics sink panicked, call discarded");
		}
	}

	fn audit_payload(&self, event: &DomainEvent, identity: &Identity) -> Value {
		let mut payload = match event {
			DomainEvent::Connect(info) => self.connection_record(info, identity),
			DomainEvent::NewUser(_) | DomainEvent::Help => json!({}),
			DomainEvent::UpdateUser(user) => json!({ "enableTelemetry": user.enable_telemetry }),
			DomainEvent::Error(info) => {
				let mut map = to_object(info);
				map.insert("origin".to_string(), to_value(&info.origin()));
				Value::Object(map)
			}
			DomainEvent::RewrittenAsyncInput(rewrite) => to_value(rewrite),
			DomainEvent::Use(info) => to_value(info),
			DomainEvent::Show(info) => to_value(info),
			DomainEvent::SetCtx(info) | DomainEvent::ApiCall(info) => to_value(info),
		};
		self.redactor.redact_in_place(&mut payload);
		payload
	}

	fn connection_record(&self, info: &ConnectInfo, identity: &Identity) -> Value {
		let mut map = to_object(info);
		map.remove("uri");
		map.insert(
			"connection_uri".to_string(),
			Value::String(redact_uri(&info.uri).into_owned()),
		);
		map.insert("session_id".to_string(), Value::String(self.session.id_str().to_string()));
		map.insert("user_id".to_string(), json!(identity.user_id));
		Value::Object(map)
	}

	fn analytics_action(&self, event: &DomainEvent) -> Option<AnalyticsAction> {
		match event {
			DomainEvent::Connect(info) => Some(AnalyticsAction::Track(
				"New Connection",
				self.connection_properties(info),
			)),
			DomainEvent::NewUser(_) | DomainEvent::UpdateUser(_) => Some(AnalyticsAction::Identify),
			DomainEvent::Error(info) if info.origin() == ErrorOrigin::Shell => {
				Some(AnalyticsAction::Track("Error", error_properties(info)))
			}
			DomainEvent::Error(_) => None,
			DomainEvent::Help => Some(AnalyticsAction::Track("Help", Properties::new())),
			DomainEvent::Use(_) => Some(AnalyticsAction::Track("Use", Properties::new())),
			DomainEvent::Show(info) => Some(AnalyticsAction::Track(
				"Show",
				Properties::new().insert_opt("method", info.method.clone()),
			)),
			// Local-only kinds stop in `route` before reaching here.
			DomainEvent::RewrittenAsyncInput(_) | DomainEvent::SetCtx(_) | DomainEvent::ApiCall(_) => {
				None
			}
		}
	}

	fn connection_properties(&self, info: &ConnectInfo) -> Properties {
		Properties::new()
			.insert("session_id", self.session.id_str())
			.insert("is_atlas", info.is_atlas)
			.insert("is_localhost", info.is_localhost)
			.insert_opt("server_version", info.server_version.clone())
			.insert_opt("server_os", info.server_os.clone())
			.insert_opt("server_arch", info.server_arch.clone())
			.insert("is_enterprise", info.is_enterprise)
			.insert_opt("auth_type", info.auth_type.clone())
			.insert("is_data_lake", info.is_data_lake)
			.insert_opt("dl_version", info.dl_version.clone())
			.insert("is_genuine", info.is_genuine)
			.insert_opt("non_genuine_server_name", info.non_genuine_server_name.clone())
			.insert_opt("runtime_version", info.runtime_version.clone())
	}

	fn redact_properties(&self, properties: Properties) -> Properties {
		match self.redactor.redact_value(&properties.into_value()) {
			Value::Object(map) => Properties::from(map),
			_ => Properties::new(),
		}
	}
}

fn error_properties(info: &ErrorInfo) -> Properties {
	let mut error = Map::new();
	error.insert("name".to_string(), Value::String(info.name.clone()));
	error.insert("message".to_string(), Value::String(info.message.clone()));
	if let Some(code) = &info.code {
		error.insert("code".to_string(), code.clone());
	}
	Properties::new().insert("error", Value::Object(error))
}

fn to_value<T: Serialize>(value: &T) -> Value {
	serde_json::to_value(value).unwrap_or_else(|e| {
		warn!(error = %e, "event payload could not be serialized");
		Value::Null
	})
}

fn to_object<T: Serialize>(value: &T) -> Map<String, Value> {
	match to_value(value) {
		Value::Object(map) => map,
		_ => Map::new(),
	}
}
