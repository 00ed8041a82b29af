// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ingestion sinks.
//!
//! A sink delivers one sanitized event to the analytics provider. Delivery
//! is fire-and-forget from the caller's point of view: the service spawns
//! the send and never awaits it, and a failed send is a lost event.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Mutex;

use crate::error::{AnalyticsError, Result};

/// Delivers sanitized events to the ingestion provider.
#[async_trait]
pub trait EventSink: Send + Sync {
	/// Sends one event. The payload is already sanitized to the provider's
	/// limits.
	async fn send(&self, event_name: &str, payload: Map<String, Value>) -> Result<()>;
}

/// HTTP sink posting events to the provider's capture endpoint.
pub struct HttpSink {
	endpoint: String,
	api_key: String,
	client: reqwest::Client,
}

impl HttpSink {
	pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
		let endpoint = endpoint.into();
		if reqwest::Url::parse(&endpoint).is_err() {
			return Err(AnalyticsError::InvalidEndpoint(endpoint));
		}
		Ok(Self {
			endpoint,
			api_key: api_key.into(),
			client: reqwest::Client::new(),
		})
	}
}

#[async_trait]
impl EventSink for HttpSink {
	async fn send(&self, event_name: &str, payload: Map<String, Value>) -> Result<()> {
		let body = serde_json::json!({
			"api_key": self.api_key,
			"event": event_name,
			"properties": payload,
			"timestamp": Utc::now().to_rfc3339(),
		});

		let response = self.client.post(&self.endpoint).json(&body).send().await?;
		let status = response.status();
		if !status.is_success() {
			return Err(AnalyticsError::ServerError {
				status: status.as_u16(),
			});
		}
		Ok(())
	}
}

/// One event captured by [`MemorySink`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
	pub name: String,
	pub payload: Map<String, Value>,
}

/// Sink capturing events in memory, for tests and local inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
	events: Mutex<Vec<CapturedEvent>>,
}

impl MemorySink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Everything captured so far, in send order.
	pub fn events(&self) -> Vec<CapturedEvent> {
		self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}

	pub fn len(&self) -> usize {
		self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[async_trait]
impl EventSink for MemorySink {
	async fn send(&self, event_name: &str, payload: Map<String, Value>) -> Result<()> {
		self.events
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.push(CapturedEvent {
				name: event_name.to_string(),
				payload,
			});
		Ok(())
	}
}

/// Sink that discards everything. Useful when analytics is disabled.
#[derive(Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
	async fn send(&self, _event_name: &str, _payload: Map<String, Value>) -> Result<()> {
		Ok(())
	}
}
