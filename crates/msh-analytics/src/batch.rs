// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batching loop run by the analytics worker.

use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::message::Message;

#[derive(Debug, Clone)]
pub struct BatchConfig {
	/// Messages per upload; reaching it triggers an immediate flush.
	pub max_batch_size: usize,
	pub flush_interval: Duration,
	/// Capacity of the hand-off channel. Calls beyond it are dropped.
	pub max_queue_size: usize,
}

impl Default for BatchConfig {
	fn default() -> Self {
		Self {
			max_batch_size: 20,
			flush_interval: Duration::from_secs(10),
			max_queue_size: 1000,
		}
	}
}

impl BatchConfig {
	/// Clamps zero values that would stall or panic the worker.
	pub(crate) fn normalized(mut self) -> Self {
		self.max_batch_size = self.max_batch_size.max(1);
		self.max_queue_size = self.max_queue_size.max(1);
		if self.flush_interval.is_zero() {
			self.flush_interval = Duration::from_millis(1);
		}
		self
	}
}

/// Work item handed from the caller's thread to the worker.
#[derive(Debug)]
pub enum Command {
	Enqueue(Message),
	/// Flush now and acknowledge.
	Flush(SyncSender<()>),
	/// Flush, acknowledge and stop.
	Shutdown(SyncSender<()>),
}

#[async_trait::async_trait]
pub trait BatchSender: Send + Sync {
	async fn send_batch(&self, batch: &[Message]) -> Result<()>;
}

pub struct BatchProcessor {
	config: BatchConfig,
	sender: Arc<dyn BatchSender>,
	pending: Vec<Message>,
}

impl BatchProcessor {
	pub fn new(config: BatchConfig, sender: Arc<dyn BatchSender>) -> Self {
		let config = config.normalized();
		Self {
			pending: Vec::with_capacity(config.max_batch_size),
			config,
			sender,
		}
	}

	pub fn pending_len(&self) -> usize {
		self.pending.len()
	}

	/// Buffers a message, returning `true` once a full batch is pending.
	pub fn push(&mut self, message: Message) -> bool {
		self.pending.push(message);
		self.pending.len() >= self.config.max_batch_size
	}

	/// Uploads everything pending. A failed upload is logged and the batch
	/// discarded; delivery is at most once.
	pub async fn flush(&mut self) {
		if self.pending.is_empty() {
			return;
		}

		let batch = std::mem::take(&mut self.pending);
		let count = batch.len();
		match self.sender.send_batch(&batch).await {
			Ok(()) => debug!(count, "analytics batch delivered"),
			Err(e) => warn!(count, error = %e, "discarding analytics batch after failed upload"),
		}
	}

	pub async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
		info!(
			flush_interval_ms = self.config.flush_interval.as_millis() as u64,
			max_batch_size = self.config.max_batch_size,
			"analytics worker started"
		);

		let mut ticker = tokio::time::interval(self.config.flush_interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		ticker.tick().await;

		loop {
			tokio::select! {
				command = rx.recv() => match command {
					Some(Command::Enqueue(message)) => {
						if self.push(message) {
							self.flush().await;
						}
					}
					Some(Command::Flush(ack)) => {
						self.flush().await;
						let _ = ack.try_send(());
					}
					Some(Command::Shutdown(ack)) => {
						self.flush().await;
						let _ = ack.try_send(());
						break;
					}
					None => {
						self.flush().await;
						break;
					}
				},
				_ = ticker.tick() => self.flush().await,
			}
		}

		info!("analytics worker stopped");
	}
}
