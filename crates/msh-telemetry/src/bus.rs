// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Adapter between a string-keyed publish/subscribe bus and the router.

use std::collections::HashMap;

use serde_json::Value;

pub type Handler = Box<dyn Fn(&Value) + Send + Sync>;

/// The subscription half of a host event bus.
pub trait EventBus {
	fn on(&mut self, event: &str, handler: Handler);
}

/// In-process bus: handlers run synchronously on the emitting thread in
/// registration order.
#[derive(Default)]
pub struct SimpleBus {
	handlers: HashMap<String, Vec<Handler>>,
}

impl SimpleBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns how many handlers ran.
	pub fn emit(&self, event: &str, payload: &Value) -> usize {
		let Some(handlers) = self.handlers.get(event) else {
			return 0;
		};
		for handler in handlers {
			handler(payload);
		}
		handlers.len()
	}

	pub fn subscribed(&self, event: &str) -> bool {
		self.handlers.get(event).is_some_and(|h| !h.is_empty())
	}

	pub fn events(&self) -> impl Iterator<Item = &str> {
		self.handlers.keys().map(String::as_str)
	}
}

impl EventBus for SimpleBus {
	fn on(&mut self, event: &str, handler: Handler) {
		self.handlers.entry(event.to_string()).or_default().push(handler);
	}
}

impl std::fmt::Debug for SimpleBus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut events: Vec<_> = self.handlers.keys().collect();
		events.sort();
		f.debug_struct("SimpleBus").field("events", &events).finish()
	}
}
