// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use msh_analytics::{
	AnalyticsCall, AnalyticsSink, Properties, RemoteAnalytics, RetryConfig,
};
use serde_json::Value;
use tokio::runtime::Runtime;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WRITE_KEY: &str = "wk_test_123";
const TIMEOUT: Duration = Duration::from_secs(10);

fn runtime() -> Runtime {
	tokio::runtime::Builder::new_multi_thread()
		.worker_threads(2)
		.enable_all()
		.build()
		.unwrap()
}

fn fast_retry(max_attempts: u32) -> RetryConfig {
	RetryConfig {
		max_attempts,
		base_delay: Duration::from_millis(1),
		max_delay: Duration::from_millis(5),
		backoff_factor: 2.0,
		jitter: false,
	}
}

fn sink_for(server: &MockServer, retry: RetryConfig) -> RemoteAnalytics {
	RemoteAnalytics::builder()
		.write_key(WRITE_KEY)
		.host(server.uri())
		.flush_interval(Duration::from_secs(3600))
		.request_timeout(Duration::from_secs(5))
		.retry_config(retry)
		.build()
		.unwrap()
}

fn request_bodies(rt: &Runtime, server: &MockServer) -> Vec<Value> {
	rt.block_on(server.received_requests())
		.unwrap_or_default()
		.iter()
		.map(|r| serde_json::from_slice(&r.body).unwrap())
		.collect()
}

#[test]
fn posts_batch_with_basic_auth() {
	let rt = runtime();
	let server = rt.block_on(async {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/batch"))
			.and(header("authorization", "Basic d2tfdGVzdF8xMjM6"))
			.and(header_exists("user-agent"))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;
		server
	});

	let sink = sink_for(&server, fast_retry(1));
	sink.identify("u1");
	sink.track(AnalyticsCall::new(
		"u1",
		"Show",
		Properties::new().insert("method", "dbs"),
	));
	sink.flush(TIMEOUT).unwrap();
	sink.shutdown(TIMEOUT).unwrap();

	let bodies = request_bodies(&rt, &server);
	assert_eq!(bodies.len(), 1);
	let batch = bodies[0]["batch"].as_array().unwrap();
	assert_eq!(batch.len(), 2);
	assert_eq!(batch[0]["type"], "identify");
	assert_eq!(batch[0]["userId"], "u1");
	assert_eq!(batch[1]["type"], "track");
	assert_eq!(batch[1]["event"], "Show");
	assert_eq!(batch[1]["properties"], serde_json::json!({ "method": "dbs" }));
	assert!(bodies[0]["sentAt"].is_string());

	rt.block_on(server.verify());
}

#[test]
fn transient_failure_is_retried() {
	let rt = runtime();
	let server = rt.block_on(async {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/batch"))
			.respond_with(ResponseTemplate::new(503))
			.up_to_n_times(1)
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/v1/batch"))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;
		server
	});

	let sink = sink_for(&server, fast_retry(3));
	sink.track(AnalyticsCall::new("u1", "Help", Properties::new()));
	sink.flush(TIMEOUT).unwrap();
	sink.shutdown(TIMEOUT).unwrap();

	rt.block_on(server.verify());
}

#[test]
fn rate_limit_waits_for_retry_after() {
	let rt = runtime();
	let server = rt.block_on(async {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/batch"))
			.respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
			.up_to_n_times(1)
			.expect(1)
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/v1/batch"))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;
		server
	});

	let sink = sink_for(&server, fast_retry(3));
	sink.track(AnalyticsCall::new("u1", "Show", Properties::new()));
	sink.flush(TIMEOUT).unwrap();
	sink.shutdown(TIMEOUT).unwrap();

	rt.block_on(server.verify());
}

#[test]
fn rate_limit_beyond_max_delay_drops_batch() {
	let rt = runtime();
	let server = rt.block_on(async {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/batch"))
			.respond_with(ResponseTemplate::new(429).insert_header("retry-after", "120"))
			.expect(1)
			.mount(&server)
			.await;
		server
	});

	let sink = sink_for(&server, fast_retry(5));
	sink.track(AnalyticsCall::new("u1", "Show", Properties::new()));
	sink.flush(TIMEOUT).unwrap();
	sink.shutdown(TIMEOUT).unwrap();

	rt.block_on(server.verify());
}

#[test]
fn client_error_is_not_retried() {
	let rt = runtime();
	let server = rt.block_on(async {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/batch"))
			.respond_with(ResponseTemplate::new(400).set_body_string("bad write key"))
			.expect(1)
			.mount(&server)
			.await;
		server
	});

	let sink = sink_for(&server, fast_retry(5));
	sink.track(AnalyticsCall::new("u1", "Use", Properties::new()));
	// Upload failures are swallowed by the worker; flush still acknowledges.
	sink.flush(TIMEOUT).unwrap();
	sink.track(AnalyticsCall::new("u1", "Use", Properties::new()));
	sink.shutdown(TIMEOUT).unwrap();

	rt.block_on(server.verify());
	assert_eq!(request_bodies(&rt, &server).len(), 2);
}

#[test]
fn unreachable_endpoint_never_blocks_callers() {
	let rt = runtime();
	let uri = rt.block_on(async {
		let server = MockServer::start().await;
		server.uri()
	});
	// The server has been released; whatever answers now (a refusal or a
	// bare 404) must stay invisible to the caller.

	let sink = RemoteAnalytics::builder()
		.write_key(WRITE_KEY)
		.host(uri)
		.flush_interval(Duration::from_secs(3600))
		.request_timeout(Duration::from_secs(2))
		.retry_config(RetryConfig::none())
		.build()
		.unwrap();

	let started = std::time::Instant::now();
	for _ in 0..100 {
		sink.track(AnalyticsCall::new("u1", "Help", Properties::new()));
	}
	assert!(started.elapsed() < Duration::from_secs(1));
	sink.shutdown(TIMEOUT).unwrap();
}

#[test]
fn size_threshold_triggers_upload() {
	let rt = runtime();
	let server = rt.block_on(async {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/batch"))
			.respond_with(ResponseTemplate::new(200))
			.mount(&server)
			.await;
		server
	});

	let sink = RemoteAnalytics::builder()
		.write_key(WRITE_KEY)
		.host(server.uri())
		.flush_interval(Duration::from_secs(3600))
		.max_batch_size(3)
		.retry_config(fast_retry(1))
		.build()
		.unwrap();

	for i in 0..7 {
		sink.track(AnalyticsCall::new("u1", format!("e{i}"), Properties::new()));
	}
	sink.shutdown(TIMEOUT).unwrap();

	let sizes: Vec<usize> = request_bodies(&rt, &server)
		.iter()
		.map(|b| b["batch"].as_array().unwrap().len())
		.collect();
	assert_eq!(sizes, vec![3, 3, 1]);
}
