// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Upload of message batches to the tracking endpoint.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::batch::BatchSender;
use crate::error::{AnalyticsError, Result};
use crate::message::{BatchRequest, Message};
use crate::retry::{retry, RetryConfig};
use crate::write_key::WriteKey;

const USER_AGENT: &str = concat!("msh-telemetry/", env!("CARGO_PKG_VERSION"));

pub struct HttpBatchSender {
	client: Client,
	url: String,
	write_key: WriteKey,
	retry: RetryConfig,
}

impl HttpBatchSender {
	pub fn new(
		host: &str,
		write_key: WriteKey,
		timeout: Duration,
		retry: RetryConfig,
	) -> Result<Self> {
		let client = Client::builder()
			.timeout(timeout)
			.user_agent(USER_AGENT)
			.build()?;

		Ok(Self {
			client,
			url: format!("{}/v1/batch", host.trim_end_matches('/')),
			write_key,
			retry,
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	async fn post_once(&self, body: &BatchRequest<'_>) -> Result<()> {
		let response = self
			.client
			.post(&self.url)
			.basic_auth(self.write_key.expose(), Some(""))
			.json(body)
			.send()
			.await?;

		let status = response.status();
		if status == StatusCode::TOO_MANY_REQUESTS {
			let retry_after_secs = response
				.headers()
				.get(reqwest::header::RETRY_AFTER)
				.and_then(|v| v.to_str().ok())
				.and_then(|s| s.parse().ok());
			return Err(AnalyticsError::RateLimited { retry_after_secs });
		}

		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			return Err(AnalyticsError::ServerError {
				status: status.as_u16(),
				message: message.chars().take(512).collect(),
			});
		}

		Ok(())
	}
}

#[async_trait::async_trait]
impl BatchSender for HttpBatchSender {
	async fn send_batch(&self, batch: &[Message]) -> Result<()> {
		let body = BatchRequest::new(batch);
		debug!(url = %self.url, count = batch.len(), "uploading analytics batch");
		retry(&self.retry, || self.post_once(&body)).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn batch_url_is_normalized() {
		let key = WriteKey::new("k").unwrap();
		let sender = HttpBatchSender::new(
			"https://api.segment.io/",
			key,
			Duration::from_secs(1),
			RetryConfig::none(),
		)
		.unwrap();
		assert_eq!(sender.url(), "https://api.segment.io/v1/batch");
	}
}
