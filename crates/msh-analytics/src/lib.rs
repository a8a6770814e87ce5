// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Analytics sink for shell telemetry.
//!
//! The router only ever sees the [`AnalyticsSink`] contract. Two
//! implementations exist:
//!
//! - [`DisabledAnalytics`] performs no I/O.
//! - [`RemoteAnalytics`] queues calls on a bounded channel drained by a
//!   dedicated worker thread, which batches them and posts them to a
//!   Segment-compatible `/v1/batch` endpoint. Calls never block and never
//!   return errors; a full queue drops the call.

pub mod batch;
pub mod error;
pub mod http;
pub mod message;
pub mod properties;
pub mod remote;
pub mod retry;
pub mod sink;
pub mod write_key;

pub use batch::BatchConfig;
pub use error::{AnalyticsError, Result};
pub use message::{BatchRequest, Message};
pub use properties::Properties;
pub use remote::{RemoteAnalytics, RemoteAnalyticsBuilder, DEFAULT_HOST};
pub use retry::{RetryConfig, RetryableError};
pub use sink::{AnalyticsCall, AnalyticsSink, DisabledAnalytics};
pub use write_key::WriteKey;
