// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The analytics service facade.
//!
//! [`AnalyticsService`] is the single integration point for the rest of
//! the application: it enriches each event with identity, attribution,
//! and page context, sanitizes the payload for the provider, dispatches
//! fire-and-forget, and feeds the pre-sanitized payload to the funnel
//! layer. Failures anywhere inside are logged and swallowed at this
//! boundary; tracking never breaks the hosting page.

use std::sync::{Arc, Mutex};

use beacon_analytics_core::attribution::TouchpointSnapshot;
use beacon_analytics_core::event::{enrich, names};
use beacon_analytics_core::funnel::{FunnelDefinition, StageProgression};
use beacon_analytics_core::identity::AnonymousIdentity;
use beacon_analytics_core::page::PageSnapshot;
use beacon_analytics_core::sanitize::sanitize;
use beacon_common_store::Stores;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::attribution::AttributionTracker;
use crate::config::AnalyticsConfig;
use crate::funnel::FunnelManager;
use crate::identity::IdentityStore;
use crate::sink::EventSink;

/// Supplies the current page context (URL, referrer, user agent,
/// viewport). Injected so the engine never reads browser globals.
pub trait PageContextSource: Send + Sync {
	fn snapshot(&self) -> PageSnapshot;
}

/// A [`PageContextSource`] holding an explicit snapshot.
///
/// Hosts with their own navigation handling update it on route changes;
/// tests use [`navigate`](StaticPageContext::navigate) to simulate them.
pub struct StaticPageContext {
	snapshot: Mutex<PageSnapshot>,
}

impl StaticPageContext {
	pub fn new(snapshot: PageSnapshot) -> Self {
		Self {
			snapshot: Mutex::new(snapshot),
		}
	}

	/// Replaces the current snapshot.
	pub fn navigate(&self, snapshot: PageSnapshot) {
		*self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
	}
}

impl PageContextSource for StaticPageContext {
	fn snapshot(&self) -> PageSnapshot {
		self.snapshot.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}
}

/// Extracts an object map from a JSON value, for ergonomic call sites.
///
/// Non-object values yield an empty map: event data is always a flat bag
/// of fields.
#[must_use]
pub fn event_data(value: Value) -> Map<String, Value> {
	match value {
		Value::Object(map) => map,
		_ => Map::new(),
	}
}

/// The client analytics engine.
pub struct AnalyticsService {
	config: AnalyticsConfig,
	identity: IdentityStore,
	attribution: AttributionTracker,
	funnels: FunnelManager,
	sink: Arc<dyn EventSink>,
	page: Arc<dyn PageContextSource>,
}

impl AnalyticsService {
	/// Wires the engine from explicit collaborators. Nothing global:
	/// construct once at application start-up and pass by reference.
	pub fn new(
		config: AnalyticsConfig,
		stores: Stores,
		funnels: Vec<FunnelDefinition>,
		sink: Arc<dyn EventSink>,
		page: Arc<dyn PageContextSource>,
	) -> Self {
		let identity = IdentityStore::new(stores.clone());
		let attribution = AttributionTracker::new(stores.clone(), config.internal_hosts.clone());
		let funnels = FunnelManager::new(funnels, &stores);
		Self {
			config,
			identity,
			attribution,
			funnels,
			sink,
			page,
		}
	}

	/// Resolves the visitor's identity, creating missing pieces.
	pub fn identity(&self) -> AnonymousIdentity {
		self.identity.identity()
	}

	/// Call once per page load: resolves identity and records a
	/// touchpoint unless this session already has one.
	pub fn initialize_attribution(&self) -> TouchpointSnapshot {
		let identity = self.identity.identity();
		self.attribution
			.record_touchpoint_if_new(&self.page.snapshot(), &identity.session_id)
	}

	/// Tracks one event: enrich, sanitize, dispatch, feed funnels.
	///
	/// Funnel logic sees the full enriched payload; only the provider
	/// dispatch is subject to the key budget. Each funnel progression
	/// dispatches its own separately sanitized
	/// [`names::FUNNEL_STAGE_PROGRESSED`] event.
	pub fn track_event(&self, event_name: &str, data: Map<String, Value>) {
		let identity = self.identity.identity();
		let summary = self.attribution.attribution_summary();
		let page = self.page.snapshot();
		let enriched = enrich(&identity, summary.as_ref(), &page, data, Utc::now());

		self.dispatch(event_name, &enriched);

		let progressions =
			self.funnels
				.track_event(event_name, &Value::Object(enriched.clone()), &self.attribution);
		for progression in progressions {
			debug!(
				funnel = %progression.funnel_key,
				stage = progression.new_stage,
				"funnel stage progressed"
			);
			let mut payload = enriched.clone();
			for (key, value) in progression_fields(&progression) {
				payload.insert(key, value);
			}
			self.dispatch(names::FUNNEL_STAGE_PROGRESSED, &payload);
		}

		self.identity.increment_event_count();
	}

	/// Tracks a page view, also recording the page in the session's page
	/// list.
	pub fn track_page_view(&self, data: Map<String, Value>) {
		let page = self.page.snapshot();
		self.identity.record_page(&page.path());
		self.track_event(names::PAGE_VIEW, data);
	}

	/// Tracks a named conversion event.
	pub fn track_conversion(&self, conversion_name: &str, mut data: Map<String, Value>) {
		data.insert("is_conversion".to_string(), Value::Bool(true));
		data.insert(
			"conversion_name".to_string(),
			Value::String(conversion_name.to_string()),
		);
		self.track_event(conversion_name, data);
	}

	/// Records a drop-off on the named funnel and tracks it as an event.
	/// Only the first drop-off per journey dispatches anything.
	pub fn track_funnel_drop_off(&self, funnel_key: &str, reason: &str) {
		let Some(record) = self.funnels.track_drop_off(funnel_key, reason) else {
			return;
		};

		let mut data = Map::new();
		data.insert("funnel_key".to_string(), Value::String(record.funnel_key));
		data.insert("drop_off_stage".to_string(), Value::from(record.stage_number));
		if let Some(stage_name) = record.stage_name {
			data.insert("drop_off_stage_name".to_string(), Value::String(stage_name));
		}
		data.insert("drop_off_reason".to_string(), Value::String(record.reason));
		self.track_event(names::FUNNEL_DROP_OFF, data);
	}

	/// Tracks a scroll-depth milestone.
	pub fn track_scroll_depth(&self, percentage: u32, mut data: Map<String, Value>) {
		data.insert("scroll_percentage".to_string(), Value::from(percentage));
		self.track_event(names::SCROLL_DEPTH, data);
	}

	/// Tracks time spent on the current page.
	pub fn track_time_on_page(&self, seconds: u64, mut data: Map<String, Value>) {
		data.insert("seconds_on_page".to_string(), Value::from(seconds));
		self.track_event(names::TIME_ON_PAGE, data);
	}

	pub fn attribution(&self) -> &AttributionTracker {
		&self.attribution
	}

	pub fn funnels(&self) -> &FunnelManager {
		&self.funnels
	}

	pub fn identity_store(&self) -> &IdentityStore {
		&self.identity
	}

	/// Clears all persisted analytics state: identity, touchpoints, and
	/// every funnel journey. For tests and privacy requests.
	pub fn reset(&self) {
		self.identity.reset();
		self.attribution.reset();
		self.funnels.reset();
	}

	/// Sanitizes and dispatches one payload, fire-and-forget.
	fn dispatch(&self, event_name: &str, payload: &Map<String, Value>) {
		let (clean, report) = sanitize(payload, &self.config.payload_limits());
		if !report.dropped_keys.is_empty() {
			debug!(event = event_name, dropped = ?report.dropped_keys, "sanitizer dropped payload keys");
		}
		if !report.truncated_keys.is_empty() {
			debug!(event = event_name, truncated = ?report.truncated_keys, "sanitizer truncated payload values");
		}

		let sink = Arc::clone(&self.sink);
		let event_name = event_name.to_string();
		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				handle.spawn(async move {
					if let Err(e) = sink.send(&event_name, clean).await {
						warn!(event = %event_name, error = %e, "analytics dispatch failed");
					}
				});
			}
			// No runtime means no delivery path; the event is lost, which
			// is the accepted trade-off for telemetry.
			Err(_) => debug!(event = %event_name, "no async runtime, event not dispatched"),
		}
	}
}

fn progression_fields(progression: &StageProgression) -> Map<String, Value> {
	match serde_json::to_value(progression) {
		Ok(Value::Object(map)) => map,
		Ok(_) | Err(_) => Map::new(),
	}
}
