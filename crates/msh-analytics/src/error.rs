// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::retry::{is_transient_status, RetryableError};

#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// No write key was configured.
	#[error("analytics write key is missing")]
	MissingWriteKey,

	#[error("invalid analytics write key: {0}")]
	InvalidWriteKey(&'static str),

	#[error("invalid analytics host '{host}': {reason}")]
	InvalidHost { host: String, reason: &'static str },

	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },

	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },

	/// The worker thread or its runtime could not be started.
	#[error("failed to start analytics worker: {0}")]
	Worker(#[source] std::io::Error),

	#[error("analytics queue is full")]
	QueueFull,

	#[error("timed out waiting for the analytics worker")]
	Timeout,

	#[error("analytics sink has been shut down")]
	Shutdown,
}

impl RetryableError for AnalyticsError {
	fn is_retryable(&self) -> bool {
		match self {
			AnalyticsError::RequestFailed(e) => {
				e.is_timeout() || e.is_connect() || e.status().is_some_and(is_transient_status)
			}
			AnalyticsError::ServerError { status, .. } => {
				StatusCode::from_u16(*status).is_ok_and(is_transient_status)
			}
			AnalyticsError::RateLimited { .. } => true,
			_ => false,
		}
	}

	fn retry_after(&self) -> Option<Duration> {
		match self {
			AnalyticsError::RateLimited {
				retry_after_secs: Some(secs),
			} => Some(Duration::from_secs(*secs)),
			_ => None,
		}
	}
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
