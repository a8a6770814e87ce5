// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retry schedule for batch uploads.
//!
//! Transient failures back off exponentially with jitter. A rate-limited
//! response carrying `Retry-After` waits exactly that long; if the server asks
//! for more than `max_delay` the batch is given up instead of stalling the
//! worker.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

impl RetryConfig {
	/// A single attempt, no backoff.
	pub fn none() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;

	/// Wait imposed by the server before the next attempt.
	fn retry_after(&self) -> Option<Duration> {
		None
	}
}

pub(crate) fn is_transient_status(status: StatusCode) -> bool {
	matches!(
		status,
		StatusCode::TOO_MANY_REQUESTS
			| StatusCode::REQUEST_TIMEOUT
			| StatusCode::INTERNAL_SERVER_ERROR
			| StatusCode::BAD_GATEWAY
			| StatusCode::SERVICE_UNAVAILABLE
			| StatusCode::GATEWAY_TIMEOUT
	)
}

pub(crate) fn backoff_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
	let exponential = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
	let capped = exponential.min(cfg.max_delay.as_secs_f64());

	let delay = if cfg.jitter {
		capped * (0.5 + fastrand::f64())
	} else {
		capped
	};

	Duration::from_secs_f64(delay.max(0.0))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Step {
	Wait(Duration),
	GiveUp(&'static str),
}

/// Decides what follows the `failed`-th failed upload.
pub(crate) fn next_step<E: RetryableError>(cfg: &RetryConfig, failed: u32, err: &E) -> Step {
	if !err.is_retryable() {
		return Step::GiveUp("not retryable");
	}
	if failed >= cfg.max_attempts {
		return Step::GiveUp("attempts exhausted");
	}
	match err.retry_after() {
		Some(wait) if wait > cfg.max_delay => Step::GiveUp("retry-after exceeds max delay"),
		Some(wait) => Step::Wait(wait),
		None => Step::Wait(backoff_delay(cfg, failed.saturating_sub(1))),
	}
}

/// Runs `upload` until it succeeds or the schedule gives up.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut upload: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Display,
{
	let mut failed = 0;

	loop {
		let err = match upload().await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};
		failed += 1;

		match next_step(cfg, failed, &err) {
			Step::Wait(delay) => {
				debug!(
					error = %err,
					attempt = failed,
					delay_ms = delay.as_millis() as u64,
					"retrying analytics upload"
				);
				tokio::time::sleep(delay).await;
			}
			Step::GiveUp(reason) if err.is_retryable() => {
				warn!(error = %err, attempt = failed, reason, "giving up analytics upload");
				return Err(err);
			}
			Step::GiveUp(reason) => {
				debug!(error = %err, reason, "analytics upload failed");
				return Err(err);
			}
		}
	}
}
