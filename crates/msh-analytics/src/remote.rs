// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Remote analytics sink backed by a dedicated worker thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::batch::{BatchConfig, BatchProcessor, BatchSender, Command};
use crate::error::{AnalyticsError, Result};
use crate::http::HttpBatchSender;
use crate::message::Message;
use crate::retry::RetryConfig;
use crate::sink::{AnalyticsCall, AnalyticsSink};
use crate::write_key::WriteKey;

pub const DEFAULT_HOST: &str = "https://api.segment.io";

const WORKER_THREAD_NAME: &str = "msh-analytics";

pub struct RemoteAnalyticsBuilder {
	write_key: Option<String>,
	host: String,
	request_timeout: Duration,
	batch: BatchConfig,
	retry: RetryConfig,
}

impl RemoteAnalyticsBuilder {
	pub fn new() -> Self {
		Self {
			write_key: None,
			host: DEFAULT_HOST.to_string(),
			request_timeout: Duration::from_secs(10),
			batch: BatchConfig::default(),
			retry: RetryConfig::default(),
		}
	}

	pub fn write_key(mut self, key: impl Into<String>) -> Self {
		self.write_key = Some(key.into());
		self
	}

	/// Base URL of the tracking service; `/v1/batch` is appended.
	pub fn host(mut self, host: impl Into<String>) -> Self {
		self.host = host.into();
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;
		self
	}

	pub fn flush_interval(mut self, interval: Duration) -> Self {
		self.batch.flush_interval = interval;
		self
	}

	pub fn max_batch_size(mut self, size: usize) -> Self {
		self.batch.max_batch_size = size;
		self
	}

	pub fn max_queue_size(mut self, size: usize) -> Self {
		self.batch.max_queue_size = size;
		self
	}

	pub fn retry_config(mut self, retry: RetryConfig) -> Self {
		self.retry = retry;
		self
	}

	/// Validates the configuration and starts the worker thread.
	///
	/// Must not be called from within an async task that would block on the
	/// result; construction itself never awaits.
	pub fn build(self) -> Result<RemoteAnalytics> {
		let write_key = WriteKey::new(self.write_key.ok_or(AnalyticsError::MissingWriteKey)?)?;
		let host = validate_host(&self.host)?;

		let sender = HttpBatchSender::new(&host, write_key, self.request_timeout, self.retry)?;
		RemoteAnalytics::spawn(self.batch, Arc::new(sender), host)
	}
}

impl Default for RemoteAnalyticsBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn validate_host(host: &str) -> Result<String> {
	let trimmed = host.trim().trim_end_matches('/');
	let invalid = |reason| AnalyticsError::InvalidHost {
		host: host.to_string(),
		reason,
	};

	let rest = trimmed
		.strip_prefix("https://")
		.or_else(|| trimmed.strip_prefix("http://"))
		.ok_or_else(|| invalid("scheme must be http or https"))?;

	if rest.is_empty() {
		return Err(invalid("missing host name"));
	}
	if rest.chars().any(char::is_whitespace) {
		return Err(invalid("contains whitespace"));
	}
	if rest.contains('@') {
		return Err(invalid("must not carry credentials"));
	}

	Ok(trimmed.to_string())
}

/// Forwards calls to the worker through a bounded channel.
///
/// `identify` and `track` use `try_send` and never block: when the channel is
/// full the call is dropped and counted.
pub struct RemoteAnalytics {
	tx: mpsc::Sender<Command>,
	worker: Mutex<Option<JoinHandle<()>>>,
	closed: AtomicBool,
	dropped: AtomicU64,
	endpoint: String,
}

impl RemoteAnalytics {
	pub fn builder() -> RemoteAnalyticsBuilder {
		RemoteAnalyticsBuilder::new()
	}

	/// Starts a worker draining into `sender`. Exposed for embedders that
	/// bring their own transport.
	pub fn spawn(
		config: BatchConfig,
		sender: Arc<dyn BatchSender>,
		endpoint: impl Into<String>,
	) -> Result<Self> {
		let config = config.normalized();
		let (tx, rx) = mpsc::channel(config.max_queue_size);

		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.build()
			.map_err(AnalyticsError::Worker)?;

		let processor = BatchProcessor::new(config, sender);
		let worker = thread::Builder::new()
			.name(WORKER_THREAD_NAME.to_string())
			.spawn(move || runtime.block_on(processor.run(rx)))
			.map_err(AnalyticsError::Worker)?;

		let endpoint = endpoint.into();
		info!(endpoint = %endpoint, "remote analytics enabled");

		Ok(Self {
			tx,
			worker: Mutex::new(Some(worker)),
			closed: AtomicBool::new(false),
			dropped: AtomicU64::new(0),
			endpoint,
		})
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// Calls discarded because the queue was full or the sink was closed.
	pub fn dropped(&self) -> u64 {
		self.dropped.load(Ordering::Relaxed)
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	fn enqueue(&self, message: Message) {
		if self.is_closed() {
			self.dropped.fetch_add(1, Ordering::Relaxed);
			debug!(label = message.label(), "analytics sink closed, call dropped");
			return;
		}

		match self.tx.try_send(Command::Enqueue(message)) {
			Ok(()) => {}
			Err(TrySendError::Full(Command::Enqueue(message))) => {
				self.dropped.fetch_add(1, Ordering::Relaxed);
				warn!(label = message.label(), "analytics queue full, call dropped");
			}
			Err(_) => {
				self.dropped.fetch_add(1, Ordering::Relaxed);
				debug!("analytics worker gone, call dropped");
			}
		}
	}

	/// Delivers `command`, retrying while the queue is full until `deadline`.
	fn send_control(&self, mut command: Command, deadline: Instant) -> Result<()> {
		loop {
			match self.tx.try_send(command) {
				Ok(()) => return Ok(()),
				Err(TrySendError::Closed(_)) => return Err(AnalyticsError::Shutdown),
				Err(TrySendError::Full(returned)) => {
					if Instant::now() >= deadline {
						return Err(AnalyticsError::QueueFull);
					}
					command = returned;
					thread::sleep(Duration::from_millis(2));
				}
			}
		}
	}
}

impl AnalyticsSink for RemoteAnalytics {
	fn name(&self) -> &str {
		"remote"
	}

	fn identify(&self, user_id: &str) {
		self.enqueue(Message::identify(user_id));
	}

	fn track(&self, call: AnalyticsCall) {
		self.enqueue(Message::track(call));
	}

	/// Blocks the calling thread for at most `timeout`.
	fn flush(&self, timeout: Duration) -> Result<()> {
		if self.is_closed() {
			return Err(AnalyticsError::Shutdown);
		}
		let deadline = Instant::now() + timeout;
		let (ack_tx, ack_rx) = std::sync::mpsc::sync_channel(1);
		self.send_control(Command::Flush(ack_tx), deadline)?;
		ack_rx
			.recv_timeout(deadline.saturating_duration_since(Instant::now()))
			.map_err(|_| AnalyticsError::Timeout)
	}

	fn shutdown(&self, timeout: Duration) -> Result<()> {
		if self.closed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}

		let deadline = Instant::now() + timeout;
		let (ack_tx, ack_rx) = std::sync::mpsc::sync_channel(1);
		self.send_control(Command::Shutdown(ack_tx), deadline)?;
		ack_rx
			.recv_timeout(deadline.saturating_duration_since(Instant::now()))
			.map_err(|_| AnalyticsError::Timeout)?;

		// The worker exits right after acknowledging.
		if let Some(worker) = self.worker.lock().take() {
			if worker.join().is_err() {
				warn!("analytics worker panicked during shutdown");
			}
		}
		info!(dropped = self.dropped(), "remote analytics shut down");
		Ok(())
	}
}

impl Drop for RemoteAnalytics {
	fn drop(&mut self) {
		if self.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		// Best effort, never joins: the process may be exiting.
		let (ack_tx, _ack_rx) = std::sync::mpsc::sync_channel(1);
		let _ = self.tx.try_send(Command::Shutdown(ack_tx));
	}
}

impl std::fmt::Debug for RemoteAnalytics {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RemoteAnalytics")
			.field("endpoint", &self.endpoint)
			.field("closed", &self.is_closed())
			.field("dropped", &self.dropped())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::properties::Properties;
	use std::sync::Mutex as StdMutex;

	#[derive(Default)]
	struct Collect {
		labels: StdMutex<Vec<String>>,
	}

	#[async_trait::async_trait]
	impl BatchSender for Collect {
		async fn send_batch(&self, batch: &[Message]) -> Result<()> {
			let mut labels = self.labels.lock().unwrap();
			labels.extend(batch.iter().map(|m| m.label().to_string()));
			Ok(())
		}
	}

	struct Stall;

	#[async_trait::async_trait]
	impl BatchSender for Stall {
		async fn send_batch(&self, _batch: &[Message]) -> Result<()> {
			tokio::time::sleep(Duration::from_secs(3600)).await;
			Ok(())
		}
	}

	fn quiet_config(max_queue_size: usize) -> BatchConfig {
		BatchConfig {
			max_batch_size: 1000,
			flush_interval: Duration::from_secs(3600),
			max_queue_size,
		}
	}

	#[test]
	fn builder_requires_write_key() {
		let err = RemoteAnalytics::builder().build().unwrap_err();
		assert!(matches!(err, AnalyticsError::MissingWriteKey));
	}

	#[test]
	fn builder_rejects_blank_write_key() {
		let err = RemoteAnalytics::builder().write_key("  ").build().unwrap_err();
		assert!(matches!(err, AnalyticsError::InvalidWriteKey(_)));
	}

	#[test]
	fn host_validation() {
		assert_eq!(validate_host("https://api.segment.io/").unwrap(), "https://api.segment.io");
		assert_eq!(validate_host("http://127.0.0.1:8080").unwrap(), "http://127.0.0.1:8080");
		assert!(validate_host("api.segment.io").is_err());
		assert!(validate_host("https://").is_err());
		assert!(validate_host("https://user:pw@host").is_err());
		assert!(validate_host("ftp://host").is_err());
	}

	#[test]
	fn calls_reach_sender_in_order() {
		let collect = Arc::new(Collect::default());
		let sink = RemoteAnalytics::spawn(quiet_config(64), collect.clone(), "test").unwrap();

		sink.identify("u1");
		sink.track(AnalyticsCall::new("u1", "Use", Properties::new()));
		sink.track(AnalyticsCall::new("u1", "Show", Properties::new().insert("method", "dbs")));
		sink.flush(Duration::from_secs(5)).unwrap();

		assert_eq!(
			*collect.labels.lock().unwrap(),
			vec!["identify".to_string(), "Use".to_string(), "Show".to_string()]
		);
		sink.shutdown(Duration::from_secs(5)).unwrap();
	}

	#[test]
	fn full_queue_drops_without_blocking() {
		let sink = RemoteAnalytics::spawn(
			BatchConfig {
				max_batch_size: 1,
				flush_interval: Duration::from_secs(3600),
				max_queue_size: 2,
			},
			Arc::new(Stall),
			"stall",
		)
		.unwrap();

		let started = Instant::now();
		for _ in 0..50 {
			sink.track(AnalyticsCall::new("u1", "Help", Properties::new()));
		}
		assert!(started.elapsed() < Duration::from_secs(1));
		assert!(sink.dropped() > 0);
		assert!(matches!(
			sink.flush(Duration::from_millis(50)),
			Err(AnalyticsError::QueueFull | AnalyticsError::Timeout)
		));
	}

	#[test]
	fn calls_after_shutdown_are_dropped() {
		let collect = Arc::new(Collect::default());
		let sink = RemoteAnalytics::spawn(quiet_config(8), collect.clone(), "test").unwrap();
		sink.shutdown(Duration::from_secs(5)).unwrap();
		assert!(sink.shutdown(Duration::from_secs(5)).is_ok());

		sink.identify("late");
		assert_eq!(sink.dropped(), 1);
		assert!(matches!(sink.flush(Duration::from_millis(10)), Err(AnalyticsError::Shutdown)));
		assert!(collect.labels.lock().unwrap().is_empty());
	}
}
