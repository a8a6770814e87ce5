// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Telemetry and audit pipeline for the interactive MongoDB shell.
//!
//! Every shell event is redacted and appended to the session's audit log.
//! Events from consenting users are additionally forwarded, with a reduced
//! and redacted property set, to the analytics sink.
//!
//! ```no_run
//! use msh_telemetry::{initialize, load_config, DomainEvent, UserEvent};
//!
//! let telemetry = initialize(load_config()?)?;
//! telemetry.route(&DomainEvent::NewUser(UserEvent::new("u1", true)));
//! telemetry.route(&DomainEvent::Help);
//! telemetry.shutdown(std::time::Duration::from_secs(2));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod logging;
pub mod router;
pub mod session;
pub mod telemetry;

pub use bus::{EventBus, Handler, SimpleBus};
pub use config::{load_config, load_config_from, TelemetryConfig, TelemetryConfigLayer};
pub use error::{ConfigError, InitError};
pub use events::{
	ApiCallInfo, AsyncRewrite, ConnectInfo, DomainEvent, ErrorInfo, ErrorOrigin, EventKind,
	ShowInfo, UnknownEventKind, UseInfo, UserEvent,
};
pub use identity::{Identity, IdentityStore};
pub use logging::init_diagnostics;
pub use router::Router;
pub use session::{Session, SessionId};
pub use telemetry::{initialize, Telemetry, TelemetryBuilder, ANALYTICS_DISABLED_KIND};
