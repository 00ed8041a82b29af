// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Funnel definitions and the journey stage machine.
//!
//! A funnel is an ordered list of stages, each reached by specific trigger
//! events. A [`FunnelJourney`] is one visitor's progress through one funnel:
//! the current stage only ever moves forward, every qualifying event is kept
//! in per-stage history, and conversions record an attribution snapshot at
//! the moment they happen.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribution::AttributionSummary;
use crate::error::{CoreError, Result};

/// One ordered step in a conversion funnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelStage {
	/// 1-based stage number, strictly increasing in declaration order.
	pub number: u32,
	pub name: String,
	/// Event names that advance a journey into this stage.
	pub trigger_events: Vec<String>,
	/// Whether reaching this stage is a conversion.
	pub is_conversion: bool,
	/// Monetary value attached to the conversion, if any.
	pub conversion_value: Option<f64>,
	/// Whether this conversion completes the funnel.
	pub is_final_goal: bool,
}

impl FunnelStage {
	/// Returns true if `event_name` triggers this stage.
	#[must_use]
	pub fn triggers(&self, event_name: &str) -> bool {
		self.trigger_events.iter().any(|e| e == event_name)
	}
}

/// A named funnel: static configuration, validated once at wiring time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelDefinition {
	/// Stable key used for persistence and event payloads.
	pub key: String,
	/// Human-readable funnel name.
	pub name: String,
	pub stages: Vec<FunnelStage>,
}

impl FunnelDefinition {
	pub fn new(key: impl Into<String>, name: impl Into<String>, stages: Vec<FunnelStage>) -> Self {
		Self {
			key: key.into(),
			name: name.into(),
			stages,
		}
	}

	/// Validates structural invariants: a non-empty key, at least one
	/// stage, and 1-based strictly increasing stage numbers.
	pub fn validate(&self) -> Result<()> {
		if self.key.is_empty() {
			return Err(CoreError::InvalidFunnel {
				funnel: self.name.clone(),
				reason: "empty funnel key".to_string(),
			});
		}
		if self.stages.is_empty() {
			return Err(CoreError::InvalidFunnel {
				funnel: self.key.clone(),
				reason: "no stages defined".to_string(),
			});
		}

		let mut previous = 0u32;
		for stage in &self.stages {
			if stage.number == 0 {
				return Err(CoreError::InvalidFunnel {
					funnel: self.key.clone(),
					reason: format!("stage '{}' has number 0; stages are 1-based", stage.name),
				});
			}
			if stage.number <= previous {
				return Err(CoreError::InvalidFunnel {
					funnel: self.key.clone(),
					reason: format!(
						"stage '{}' number {} does not increase (previous {})",
						stage.name, stage.number, previous
					),
				});
			}
			previous = stage.number;
		}
		Ok(())
	}

	/// Returns trigger events that appear in more than one stage.
	///
	/// Ambiguous triggers are resolved at runtime by first declared stage,
	/// but configurations should not rely on that: surface these at wiring
	/// time and fix the definition.
	#[must_use]
	pub fn duplicate_trigger_events(&self) -> Vec<String> {
		let mut seen = BTreeSet::new();
		let mut duplicates = BTreeSet::new();
		for stage in &self.stages {
			for event in &stage.trigger_events {
				if !seen.insert(event.clone()) {
					duplicates.insert(event.clone());
				}
			}
		}
		duplicates.into_iter().collect()
	}

	/// Finds the stage triggered by `event_name`. First declared wins.
	#[must_use]
	pub fn stage_for_event(&self, event_name: &str) -> Option<&FunnelStage> {
		self.stages.iter().find(|s| s.triggers(event_name))
	}

	/// Finds a stage by number.
	#[must_use]
	pub fn stage(&self, number: u32) -> Option<&FunnelStage> {
		self.stages.iter().find(|s| s.number == number)
	}

	/// The first stage after `number`, if any.
	#[must_use]
	pub fn stage_after(&self, number: u32) -> Option<&FunnelStage> {
		self.stages.iter().find(|s| s.number > number)
	}

	#[must_use]
	pub fn total_stages(&self) -> usize {
		self.stages.len()
	}
}

/// A raw event kept in a journey's per-stage history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent {
	pub event_name: String,
	pub timestamp: DateTime<Utc>,
	pub data: Value,
}

/// One conversion, kept as append-only history on the journey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRecord {
	pub stage_number: u32,
	pub stage_name: String,
	pub trigger_event: String,
	pub value: Option<f64>,
	/// Seconds from funnel start to this conversion.
	pub seconds_to_convert: i64,
	pub timestamp: DateTime<Utc>,
	/// Attribution at the moment of conversion.
	pub attribution: Option<AttributionSummary>,
}

/// Result of a stage transition, returned to the dispatch layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageProgression {
	pub funnel_key: String,
	pub funnel_name: String,
	pub previous_stage: u32,
	pub previous_stage_name: Option<String>,
	pub new_stage: u32,
	pub new_stage_name: String,
	pub trigger_event: String,
	/// Seconds since the previous stage was reached, or since funnel
	/// start when entering from stage 0.
	pub seconds_from_previous: i64,
	pub completion_percentage: f64,
	pub is_conversion: bool,
	pub is_final_goal: bool,
	pub conversion_value: Option<f64>,
}

/// A recorded drop-off: the journey stalled at its current stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropOffRecord {
	pub funnel_key: String,
	pub stage_number: u32,
	pub stage_name: Option<String>,
	pub reason: String,
	pub timestamp: DateTime<Utc>,
}

/// One visitor's persisted progress through one funnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelJourney {
	pub funnel_key: String,
	/// 0 until the visitor enters the funnel. Only ever increases.
	pub current_stage: u32,
	pub highest_stage_reached: u32,
	pub stages_completed: BTreeSet<u32>,
	/// Stage number to first-time-reached timestamp.
	pub stage_timestamps: BTreeMap<u32, DateTime<Utc>>,
	/// Stage number to every raw event observed for that stage.
	pub stage_events: BTreeMap<u32, Vec<RecordedEvent>>,
	pub start_timestamp: DateTime<Utc>,
	pub last_activity_timestamp: DateTime<Utc>,
	pub total_time_in_funnel_seconds: i64,
	/// Set at most once, on the first drop-off call.
	pub drop_off_point: Option<u32>,
	pub drop_off_reason: Option<String>,
	pub is_converted: bool,
	/// Write-once: stamped by the first final-goal conversion.
	pub conversion_timestamp: Option<DateTime<Utc>>,
	pub conversion_value: Option<f64>,
	/// Append-only conversion history; a funnel may convert at several
	/// stages before reaching its final goal.
	pub conversions: Vec<ConversionRecord>,
}

impl FunnelJourney {
	/// Creates an unstarted journey (stage 0).
	#[must_use]
	pub fn new(funnel_key: impl Into<String>, now: DateTime<Utc>) -> Self {
		Self {
			funnel_key: funnel_key.into(),
			current_stage: 0,
			highest_stage_reached: 0,
			stages_completed: BTreeSet::new(),
			stage_timestamps: BTreeMap::new(),
			stage_events: BTreeMap::new(),
			start_timestamp: now,
			last_activity_timestamp: now,
			total_time_in_funnel_seconds: 0,
			drop_off_point: None,
			drop_off_reason: None,
			is_converted: false,
			conversion_timestamp: None,
			conversion_value: None,
			conversions: Vec::new(),
		}
	}

	/// Appends a raw event to the history of `stage_number`.
	///
	/// Recording happens for every qualifying event, including repeats of
	/// stages already passed; it never moves `current_stage`.
	pub fn record_event(&mut self, stage_number: u32, event_name: &str, data: &Value, now: DateTime<Utc>) {
		self.stage_events
			.entry(stage_number)
			.or_default()
			.push(RecordedEvent {
				event_name: event_name.to_string(),
				timestamp: now,
				data: data.clone(),
			});
		self.last_activity_timestamp = now;
	}

	/// Attempts a stage transition.
	///
	/// Returns `None` unless `stage_number` is a defined stage strictly
	/// greater than the current one; `current_stage` is monotone by
	/// construction. On a conversion stage a [`ConversionRecord`] is
	/// appended, and the journey-level conversion fields are stamped only
	/// by the first final-goal conversion.
	pub fn advance_to(
		&mut self,
		definition: &FunnelDefinition,
		stage_number: u32,
		trigger_event: &str,
		attribution: Option<AttributionSummary>,
		now: DateTime<Utc>,
	) -> Option<StageProgression> {
		if stage_number <= self.current_stage {
			return None;
		}
		let stage = definition.stage(stage_number)?;

		let previous_stage = self.current_stage;
		let previous_reached = if previous_stage == 0 {
			self.start_timestamp
		} else {
			self.stage_timestamps
				.get(&previous_stage)
				.copied()
				.unwrap_or(self.start_timestamp)
		};

		self.current_stage = stage.number;
		self.highest_stage_reached = self.highest_stage_reached.max(stage.number);
		self.stages_completed.insert(stage.number);
		self.stage_timestamps.entry(stage.number).or_insert(now);
		self.last_activity_timestamp = now;
		self.total_time_in_funnel_seconds = (now - self.start_timestamp).num_seconds();

		if stage.is_conversion {
			self.conversions.push(ConversionRecord {
				stage_number: stage.number,
				stage_name: stage.name.clone(),
				trigger_event: trigger_event.to_string(),
				value: stage.conversion_value,
				seconds_to_convert: (now - self.start_timestamp).num_seconds(),
				timestamp: now,
				attribution,
			});

			if stage.is_final_goal && !self.is_converted {
				self.is_converted = true;
				self.conversion_timestamp = Some(now);
				self.conversion_value = stage.conversion_value;
			}
		}

		Some(StageProgression {
			funnel_key: definition.key.clone(),
			funnel_name: definition.name.clone(),
			previous_stage,
			previous_stage_name: definition.stage(previous_stage).map(|s| s.name.clone()),
			new_stage: stage.number,
			new_stage_name: stage.name.clone(),
			trigger_event: trigger_event.to_string(),
			seconds_from_previous: (now - previous_reached).num_seconds(),
			completion_percentage: completion_percentage(stage.number, definition.total_stages()),
			is_conversion: stage.is_conversion,
			is_final_goal: stage.is_final_goal,
			conversion_value: stage.conversion_value,
		})
	}

	/// Records a drop-off at the current stage. Set-once: only the first
	/// call per journey records anything; later calls return `None`.
	pub fn record_drop_off(
		&mut self,
		definition: &FunnelDefinition,
		reason: &str,
		now: DateTime<Utc>,
	) -> Option<DropOffRecord> {
		if self.drop_off_point.is_some() {
			return None;
		}

		self.drop_off_point = Some(self.current_stage);
		self.drop_off_reason = Some(reason.to_string());
		self.last_activity_timestamp = now;

		Some(DropOffRecord {
			funnel_key: self.funnel_key.clone(),
			stage_number: self.current_stage,
			stage_name: definition.stage(self.current_stage).map(|s| s.name.clone()),
			reason: reason.to_string(),
			timestamp: now,
		})
	}

	#[must_use]
	pub fn has_converted(&self) -> bool {
		self.is_converted
	}

	#[must_use]
	pub fn completion_percentage(&self, definition: &FunnelDefinition) -> f64 {
		completion_percentage(self.current_stage, definition.total_stages())
	}
}

fn completion_percentage(stage_number: u32, total_stages: usize) -> f64 {
	if total_stages == 0 {
		return 0.0;
	}
	f64::from(stage_number) / total_stages as f64 * 100.0
}
