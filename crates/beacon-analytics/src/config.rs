// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Analytics configuration.
//!
//! The one tunable that matters is the provider's key budget: the paid
//! plan caps custom event properties, and production runs a tighter limit
//! than development. An environment override exists for plan changes;
//! anything unparseable falls back to the built-in default.

use beacon_analytics_core::sanitize::PayloadLimits;
use tracing::warn;

/// Environment variable overriding the provider key budget.
pub const MAX_EVENT_KEYS_ENV: &str = "BEACON_ANALYTICS_MAX_EVENT_KEYS";

/// Default provider key budget for this build mode.
pub const DEFAULT_MAX_EVENT_KEYS: usize = if cfg!(debug_assertions) { 50 } else { 25 };

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
	/// Maximum top-level keys per dispatched event.
	pub max_custom_event_keys: usize,
	/// Hosts classified as internal referrers (own-site navigation).
	pub internal_hosts: Vec<String>,
}

impl AnalyticsConfig {
	pub fn new() -> Self {
		Self {
			max_custom_event_keys: DEFAULT_MAX_EVENT_KEYS,
			internal_hosts: Vec::new(),
		}
	}

	/// Builds a config from the process environment.
	pub fn from_env() -> Self {
		let raw = std::env::var(MAX_EVENT_KEYS_ENV).ok();
		Self {
			max_custom_event_keys: parse_max_keys(raw.as_deref()),
			internal_hosts: Vec::new(),
		}
	}

	/// Sets the hosts treated as internal referrers (builder pattern).
	pub fn with_internal_hosts(mut self, hosts: Vec<String>) -> Self {
		self.internal_hosts = hosts;
		self
	}

	/// Overrides the provider key budget (builder pattern).
	pub fn with_max_custom_event_keys(mut self, max_keys: usize) -> Self {
		self.max_custom_event_keys = max_keys;
		self
	}

	/// The sanitizer limits implied by this config.
	#[must_use]
	pub fn payload_limits(&self) -> PayloadLimits {
		PayloadLimits::with_max_keys(self.max_custom_event_keys)
	}
}

impl Default for AnalyticsConfig {
	fn default() -> Self {
		Self::new()
	}
}

/// Parses the key-budget override, falling back to the default on
/// anything invalid (absent, non-numeric, or zero).
fn parse_max_keys(raw: Option<&str>) -> usize {
	match raw {
		None => DEFAULT_MAX_EVENT_KEYS,
		Some(raw) => match raw.trim().parse::<usize>() {
			Ok(n) if n > 0 => n,
			_ => {
				warn!(value = raw, "invalid event key budget override, using default");
				DEFAULT_MAX_EVENT_KEYS
			}
		},
	}
}
