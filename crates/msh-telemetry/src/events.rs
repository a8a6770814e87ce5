// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event taxonomy emitted by the shell.
//!
//! [`EventKind`] names the kinds as they appear on the bus (`mongosh:use`);
//! [`DomainEvent`] carries the typed payload. Payload structs default every
//! field so a partially populated event still deserializes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const BUS_PREFIX: &str = "mongosh:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	Connect,
	NewUser,
	UpdateUser,
	Error,
	Help,
	RewrittenAsyncInput,
	Use,
	Show,
	SetCtx,
	ApiCall,
}

impl EventKind {
	pub const ALL: [EventKind; 10] = [
		EventKind::Connect,
		EventKind::NewUser,
		EventKind::UpdateUser,
		EventKind::Error,
		EventKind::Help,
		EventKind::RewrittenAsyncInput,
		EventKind::Use,
		EventKind::Show,
		EventKind::SetCtx,
		EventKind::ApiCall,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			EventKind::Connect => "connect",
			EventKind::NewUser => "new-user",
			EventKind::UpdateUser => "update-user",
			EventKind::Error => "error",
			EventKind::Help => "help",
			EventKind::RewrittenAsyncInput => "rewritten-async-input",
			EventKind::Use => "use",
			EventKind::Show => "show",
			EventKind::SetCtx => "setCtx",
			EventKind::ApiCall => "api-call",
		}
	}

	pub fn bus_name(self) -> &'static str {
		match self {
			EventKind::Connect => "mongosh:connect",
			EventKind::NewUser => "mongosh:new-user",
			EventKind::UpdateUser => "mongosh:update-user",
			EventKind::Error => "mongosh:error",
			EventKind::Help => "mongosh:help",
			EventKind::RewrittenAsyncInput => "mongosh:rewritten-async-input",
			EventKind::Use => "mongosh:use",
			EventKind::Show => "mongosh:show",
			EventKind::SetCtx => "mongosh:setCtx",
			EventKind::ApiCall => "mongosh:api-call",
		}
	}

	/// Accepts both `mongosh:use` and `use`. Unknown names yield `None`.
	pub fn parse(name: &str) -> Option<Self> {
		let short = name.strip_prefix(BUS_PREFIX).unwrap_or(name);
		EventKind::ALL.into_iter().find(|kind| kind.as_str() == short)
	}

	/// Kinds whose content is kept out of analytics regardless of consent.
	pub fn is_local_only(self) -> bool {
		matches!(
			self,
			EventKind::ApiCall | EventKind::SetCtx | EventKind::RewrittenAsyncInput
		)
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.bus_name())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind '{0}'")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
	type Err = UnknownEventKind;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		EventKind::parse(s).ok_or_else(|| UnknownEventKind(s.to_string()))
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectInfo {
	pub uri: String,
	pub is_atlas: bool,
	pub is_localhost: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_version: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_os: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_arch: Option<String>,
	pub is_enterprise: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub auth_type: Option<String>,
	pub is_data_lake: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dl_version: Option<String>,
	pub is_genuine: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub non_genuine_server_name: Option<String>,
	#[serde(alias = "node_version", skip_serializing_if = "Option::is_none")]
	pub runtime_version: Option<String>,
	/// Fields this version does not know about; kept for the audit trail.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// Payload of `new-user` and `update-user`.
///
/// Accepts `{ "userId": .., "enableTelemetry": .. }` or the positional
/// `[userId, enableTelemetry]` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UserEventRepr")]
pub struct UserEvent {
	pub user_id: String,
	pub enable_telemetry: bool,
}

impl UserEvent {
	pub fn new(user_id: impl Into<String>, enable_telemetry: bool) -> Self {
		Self {
			user_id: user_id.into(),
			enable_telemetry,
		}
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserEventRepr {
	Positional(String, bool),
	Named {
		#[serde(alias = "userId", alias = "id")]
		user_id: String,
		#[serde(default, alias = "enableTelemetry", alias = "telemetry")]
		enable_telemetry: bool,
	},
}

impl From<UserEventRepr> for UserEvent {
	fn from(repr: UserEventRepr) -> Self {
		match repr {
			UserEventRepr::Positional(user_id, enable_telemetry)
			| UserEventRepr::Named {
				user_id,
				enable_telemetry,
			} => Self {
				user_id,
				enable_telemetry,
			},
		}
	}
}

/// Where an error came from. Only [`ErrorOrigin::Shell`] errors are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOrigin {
	Shell,
	Driver,
	Runtime,
	Unknown,
}

impl ErrorOrigin {
	/// Derives the origin from an error class name.
	pub fn classify(name: &str) -> Self {
		if name.contains("Mongosh") {
			ErrorOrigin::Shell
		} else if name.starts_with("Mongo") {
			ErrorOrigin::Driver
		} else {
			ErrorOrigin::Unknown
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorInfo {
	pub name: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub code: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub origin: Option<ErrorOrigin>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl ErrorInfo {
	pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			message: message.into(),
			..Self::default()
		}
	}

	/// Explicit origin if the producer supplied one, otherwise derived from
	/// the name.
	pub fn origin(&self) -> ErrorOrigin {
		self.origin.unwrap_or_else(|| ErrorOrigin::classify(&self.name))
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncRewrite {
	pub original: String,
	pub rewritten: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UseInfo {
	pub db: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowInfo {
	pub method: Option<String>,
}

/// Payload of `api-call` and `setCtx`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiCallInfo {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub class: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub db: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub coll: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub arguments: Option<Value>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
	Connect(ConnectInfo),
	NewUser(UserEvent),
	UpdateUser(UserEvent),
	Error(ErrorInfo),
	Help,
	RewrittenAsyncInput(AsyncRewrite),
	Use(UseInfo),
	Show(ShowInfo),
	SetCtx(ApiCallInfo),
	ApiCall(ApiCallInfo),
}

impl DomainEvent {
	pub fn kind(&self) -> EventKind {
		match self {
			DomainEvent::Connect(_) => EventKind::Connect,
			DomainEvent::NewUser(_) => EventKind::NewUser,
			DomainEvent::UpdateUser(_) => EventKind::UpdateUser,
			DomainEvent::Error(_) => EventKind::Error,
			DomainEvent::Help => EventKind::Help,
			DomainEvent::RewrittenAsyncInput(_) => EventKind::RewrittenAsyncInput,
			DomainEvent::Use(_) => EventKind::Use,
			DomainEvent::Show(_) => EventKind::Show,
			DomainEvent::SetCtx(_) => EventKind::SetCtx,
			DomainEvent::ApiCall(_) => EventKind::ApiCall,
		}
	}

	/// Builds a typed event from a bus payload. `null` is read as an empty
	/// object so payload-less emits still produce an event.
	pub fn from_payload(kind: EventKind, payload: &Value) -> Result<Self, serde_json::Error> {
		let empty = Value::Object(Map::new());
		let payload = if payload.is_null() { &empty } else { payload };

		Ok(match kind {
			EventKind::Connect => DomainEvent::Connect(parse(payload)?),
			EventKind::NewUser => DomainEvent::NewUser(parse(payload)?),
			EventKind::UpdateUser => DomainEvent::UpdateUser(parse(payload)?),
			EventKind::Error => DomainEvent::Error(parse(payload)?),
			EventKind::Help => DomainEvent::Help,
			EventKind::RewrittenAsyncInput => DomainEvent::RewrittenAsyncInput(parse(payload)?),
			EventKind::Use => DomainEvent::Use(parse(payload)?),
			EventKind::Show => DomainEvent::Show(parse(payload)?),
			EventKind::SetCtx => DomainEvent::SetCtx(parse(payload)?),
			EventKind::ApiCall => DomainEvent::ApiCall(parse(payload)?),
		})
	}
}

fn parse<'a, T: Deserialize<'a>>(payload: &'a Value) -> Result<T, serde_json::Error> {
	T::deserialize(payload)
}
