// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Funnel tracking over injected stores.
//!
//! One [`FunnelTracker`] per funnel definition, each persisting its own
//! journey under its own durable key. The [`FunnelManager`] fans every
//! event out to all trackers: an event may legitimately progress several
//! funnels at once, and an event matching none is a normal no-op.

use beacon_analytics_core::funnel::{
	DropOffRecord, FunnelDefinition, FunnelJourney, FunnelStage, StageProgression,
};
use beacon_common_store::{read_json, write_json, Stores};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::attribution::AttributionTracker;
use crate::keys;

/// Tracks one visitor journey through one funnel.
pub struct FunnelTracker {
	definition: FunnelDefinition,
	stores: Stores,
}

impl FunnelTracker {
	pub fn new(definition: FunnelDefinition, stores: Stores) -> Self {
		Self { definition, stores }
	}

	pub fn definition(&self) -> &FunnelDefinition {
		&self.definition
	}

	fn storage_key(&self) -> String {
		keys::funnel_key(&self.definition.key)
	}

	/// Loads the persisted journey, creating an unstarted one when absent.
	/// A malformed persisted journey reads as not started.
	pub fn journey(&self) -> FunnelJourney {
		let read = read_json::<Option<FunnelJourney>>(self.stores.durable.as_ref(), &self.storage_key());
		if read.recovered {
			debug!(funnel = %self.definition.key, "journey was unreadable and has been reset");
		}
		read.into_value()
			.unwrap_or_else(|| FunnelJourney::new(&self.definition.key, Utc::now()))
	}

	fn persist(&self, journey: &FunnelJourney) {
		if let Err(e) = write_json(self.stores.durable.as_ref(), &self.storage_key(), journey) {
			warn!(funnel = %self.definition.key, error = %e, "failed to persist journey");
		}
	}

	/// Feeds one event to this funnel.
	///
	/// Events not triggering any stage return `None` without touching
	/// state. Qualifying events are always recorded in stage history; a
	/// transition happens only for stages ahead of the current one. The
	/// attribution snapshot is taken at conversion time.
	pub fn track_event(
		&self,
		event_name: &str,
		data: &Value,
		attribution: &AttributionTracker,
	) -> Option<StageProgression> {
		let stage = self.definition.stage_for_event(event_name)?;
		let now = Utc::now();
		let mut journey = self.journey();

		journey.record_event(stage.number, event_name, data, now);

		let progression = if stage.number > journey.current_stage {
			let snapshot = if stage.is_conversion {
				attribution.attribution_summary()
			} else {
				None
			};
			journey.advance_to(&self.definition, stage.number, event_name, snapshot, now)
		} else {
			None
		};

		self.persist(&journey);
		progression
	}

	/// Marks the journey as stalled at its current stage. Only the first
	/// call per journey records anything.
	pub fn track_drop_off(&self, reason: &str) -> Option<DropOffRecord> {
		let mut journey = self.journey();
		let record = journey.record_drop_off(&self.definition, reason, Utc::now())?;
		self.persist(&journey);
		Some(record)
	}

	pub fn current_stage(&self) -> u32 {
		self.journey().current_stage
	}

	/// The next stage ahead of the journey, if any remain.
	pub fn next_stage(&self) -> Option<FunnelStage> {
		self.definition.stage_after(self.journey().current_stage).cloned()
	}

	pub fn has_converted(&self) -> bool {
		self.journey().has_converted()
	}

	pub fn completion_percentage(&self) -> f64 {
		self.journey().completion_percentage(&self.definition)
	}

	/// Deletes the persisted journey.
	pub fn reset(&self) {
		if let Err(e) = self.stores.durable.remove(&self.storage_key()) {
			warn!(funnel = %self.definition.key, error = %e, "failed to clear journey");
		}
	}
}

/// Fans events out to every configured funnel.
pub struct FunnelManager {
	trackers: Vec<FunnelTracker>,
}

impl FunnelManager {
	/// Wires one tracker per valid definition. Invalid definitions are
	/// skipped with a diagnostic rather than failing the page; ambiguous
	/// trigger events are reported and resolved first-declared-wins.
	pub fn new(definitions: Vec<FunnelDefinition>, stores: &Stores) -> Self {
		let mut trackers = Vec::new();
		for definition in definitions {
			if let Err(e) = definition.validate() {
				warn!(error = %e, "skipping invalid funnel definition");
				continue;
			}
			let duplicates = definition.duplicate_trigger_events();
			if !duplicates.is_empty() {
				warn!(
					funnel = %definition.key,
					?duplicates,
					"trigger events appear in multiple stages; first declared stage wins"
				);
			}
			trackers.push(FunnelTracker::new(definition, stores.clone()));
		}
		Self { trackers }
	}

	/// Feeds one event to every funnel; returns the progressions it
	/// caused, in funnel declaration order.
	pub fn track_event(
		&self,
		event_name: &str,
		data: &Value,
		attribution: &AttributionTracker,
	) -> Vec<StageProgression> {
		self.trackers
			.iter()
			.filter_map(|t| t.track_event(event_name, data, attribution))
			.collect()
	}

	/// Records a drop-off on the named funnel.
	pub fn track_drop_off(&self, funnel_key: &str, reason: &str) -> Option<DropOffRecord> {
		self.tracker(funnel_key)?.track_drop_off(reason)
	}

	pub fn tracker(&self, funnel_key: &str) -> Option<&FunnelTracker> {
		self.trackers.iter().find(|t| t.definition().key == funnel_key)
	}

	pub fn trackers(&self) -> &[FunnelTracker] {
		&self.trackers
	}

	/// Deletes every persisted journey.
	pub fn reset(&self) {
		for tracker in &self.trackers {
			tracker.reset();
		}
	}
}

/// The marketing site's standing funnels.
///
/// Two conversion processes run side by side: a request-for-information
/// funnel converting on the RFI form, and an application funnel converting
/// on a submitted application. Early stages overlap on purpose; the same
/// page-view event enters both.
pub fn default_funnels() -> Vec<FunnelDefinition> {
	vec![
		FunnelDefinition::new(
			"rfi",
			"Request for Information",
			vec![
				FunnelStage {
					number: 1,
					name: "Visited Site".to_string(),
					trigger_events: vec!["page_view".to_string()],
					is_conversion: false,
					conversion_value: None,
					is_final_goal: false,
				},
				FunnelStage {
					number: 2,
					name: "Viewed Program".to_string(),
					trigger_events: vec!["program_page_viewed".to_string()],
					is_conversion: false,
					conversion_value: None,
					is_final_goal: false,
				},
				FunnelStage {
					number: 3,
					name: "Started RFI Form".to_string(),
					trigger_events: vec!["rfi_form_started".to_string()],
					is_conversion: false,
					conversion_value: None,
					is_final_goal: false,
				},
				FunnelStage {
					number: 4,
					name: "Submitted RFI Form".to_string(),
					trigger_events: vec!["rfi_form_submitted".to_string()],
					is_conversion: true,
					conversion_value: Some(50.0),
					is_final_goal: true,
				},
			],
		),
		FunnelDefinition::new(
			"application",
			"Application",
			vec![
				FunnelStage {
					number: 1,
					name: "Viewed Program".to_string(),
					trigger_events: vec!["program_page_viewed".to_string()],
					is_conversion: false,
					conversion_value: None,
					is_final_goal: false,
				},
				FunnelStage {
					number: 2,
					name: "Started Application".to_string(),
					trigger_events: vec!["application_started".to_string()],
					is_conversion: true,
					conversion_value: Some(25.0),
					is_final_goal: false,
				},
				FunnelStage {
					number: 3,
					name: "Submitted Application".to_string(),
					trigger_events: vec!["application_submitted".to_string()],
					is_conversion: true,
					conversion_value: Some(250.0),
					is_final_goal: true,
				},
			],
		),
	]
}
