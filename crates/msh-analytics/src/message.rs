// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire shapes for the Segment-compatible batch endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::sink::AnalyticsCall;

const LIBRARY_NAME: &str = "msh-analytics";
const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
	Identify(Identify),
	Track(Track),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
	pub user_id: String,
	pub message_id: Uuid,
	pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
	pub user_id: String,
	pub event: String,
	pub properties: Value,
	pub message_id: Uuid,
	pub timestamp: DateTime<Utc>,
}

impl Message {
	pub fn identify(user_id: impl Into<String>) -> Self {
		Message::Identify(Identify {
			user_id: user_id.into(),
			message_id: Uuid::new_v4(),
			timestamp: Utc::now(),
		})
	}

	pub fn track(call: AnalyticsCall) -> Self {
		Message::Track(Track {
			user_id: call.user_id,
			event: call.event_name,
			properties: call.properties.into_value(),
			message_id: Uuid::new_v4(),
			timestamp: Utc::now(),
		})
	}

	pub fn user_id(&self) -> &str {
		match self {
			Message::Identify(m) => &m.user_id,
			Message::Track(m) => &m.user_id,
		}
	}

	/// `identify` for identify messages, the event name for track messages.
	pub fn label(&self) -> &str {
		match self {
			Message::Identify(_) => "identify",
			Message::Track(m) => &m.event,
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest<'a> {
	pub batch: &'a [Message],
	pub sent_at: DateTime<Utc>,
	pub context: Context,
}

#[derive(Debug, Serialize)]
pub struct Context {
	pub library: Library,
}

#[derive(Debug, Serialize)]
pub struct Library {
	pub name: &'static str,
	pub version: &'static str,
}

impl<'a> BatchRequest<'a> {
	pub fn new(batch: &'a [Message]) -> Self {
		Self {
			batch,
			sent_at: Utc::now(),
			context: Context {
				library: Library {
					name: LIBRARY_NAME,
					version: LIBRARY_VERSION,
				},
			},
		}
	}
}
