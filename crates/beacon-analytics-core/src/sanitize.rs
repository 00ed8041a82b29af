// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Payload sanitization against the ingestion provider's schema limits.
//!
//! The provider accepts a flat map of at most N keys, with values
//! restricted to strings (255 chars max), numbers, and booleans. The key
//! budget is filled greedily: the fixed [`PRIORITY_FIELDS`] table first,
//! then remaining fields in map order until the budget runs out. Keys that
//! do not fit are dropped and reported, never silently lost.

use serde_json::{Map, Value};

/// Hard provider limit on string value length.
pub const MAX_STRING_LEN: usize = 255;

/// Business-critical fields admitted to the payload before anything else.
///
/// Order matters: earlier entries claim budget first. Program and form
/// identifiers outrank identity, which outranks attribution and page
/// context.
pub const PRIORITY_FIELDS: &[&str] = &[
	"program_code",
	"form_name",
	"conversion_name",
	"cta_label",
	"funnel_key",
	"anonymous_user_id",
	"session_id",
	"page_type",
	"page_path",
	"last_touch_source",
	"last_touch_campaign",
	"first_touch_source",
	"device_type",
	"is_conversion",
];

/// Provider payload constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLimits {
	/// Maximum number of top-level keys.
	pub max_keys: usize,
	/// Maximum string value length in characters.
	pub max_string_len: usize,
}

impl PayloadLimits {
	#[must_use]
	pub fn with_max_keys(max_keys: usize) -> Self {
		Self {
			max_keys,
			max_string_len: MAX_STRING_LEN,
		}
	}
}

/// What the sanitizer did to a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
	/// Keys dropped: over budget, or carrying a non-primitive value.
	pub dropped_keys: Vec<String>,
	/// Keys whose string values were truncated.
	pub truncated_keys: Vec<String>,
}

impl SanitizeReport {
	#[must_use]
	pub fn is_clean(&self) -> bool {
		self.dropped_keys.is_empty() && self.truncated_keys.is_empty()
	}
}

/// Sanitizes `payload` to satisfy `limits`.
///
/// Key selection is priority order, first fit, hard cutoff by count: no
/// attempt is made to optimize for value sizes. Objects, arrays, and nulls
/// are dropped entirely rather than serialized into strings.
#[must_use]
pub fn sanitize(payload: &Map<String, Value>, limits: &PayloadLimits) -> (Map<String, Value>, SanitizeReport) {
	let mut accepted = Map::new();
	let mut report = SanitizeReport::default();

	for key in PRIORITY_FIELDS {
		if let Some(value) = payload.get(*key) {
			admit(&mut accepted, &mut report, key, value, limits);
		}
	}

	for (key, value) in payload {
		if PRIORITY_FIELDS.contains(&key.as_str()) {
			continue;
		}
		admit(&mut accepted, &mut report, key, value, limits);
	}

	(accepted, report)
}

fn admit(
	accepted: &mut Map<String, Value>,
	report: &mut SanitizeReport,
	key: &str,
	value: &Value,
	limits: &PayloadLimits,
) {
	// Non-primitive values violate the wire contract outright and never
	// consume budget.
	if matches!(value, Value::Null | Value::Array(_) | Value::Object(_)) {
		report.dropped_keys.push(key.to_string());
		return;
	}

	if accepted.len() >= limits.max_keys {
		report.dropped_keys.push(key.to_string());
		return;
	}

	let clean = match value {
		Value::String(s) if s.chars().count() > limits.max_string_len => {
			report.truncated_keys.push(key.to_string());
			Value::String(s.chars().take(limits.max_string_len).collect())
		}
		_ => value.clone(),
	};
	accepted.insert(key.to_string(), clean);
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	fn as_map(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(map) => map,
			_ => panic!("expected object"),
		}
	}

	#[test]
	fn test_key_budget_prefers_priority_fields() {
		let payload = as_map(json!({
			"extra1": "a",
			"extra2": "b",
			"program_code": "mba",
			"form_name": "rfi",
		}));
		let (clean, report) = sanitize(&payload, &PayloadLimits::with_max_keys(2));

		assert_eq!(clean.len(), 2);
		assert_eq!(clean["program_code"], "mba");
		assert_eq!(clean["form_name"], "rfi");
		assert_eq!(report.dropped_keys, vec!["extra1".to_string(), "extra2".to_string()]);
	}

	#[test]
	fn test_remaining_budget_fills_in_map_order() {
		let payload = as_map(json!({
			"alpha": 1,
			"beta": 2,
			"gamma": 3,
		}));
		let (clean, report) = sanitize(&payload, &PayloadLimits::with_max_keys(2));

		// serde_json maps iterate in key order; alpha and beta fit.
		assert_eq!(clean.len(), 2);
		assert!(clean.contains_key("alpha"));
		assert!(clean.contains_key("beta"));
		assert_eq!(report.dropped_keys, vec!["gamma".to_string()]);
	}

	#[test]
	fn test_long_string_truncates_to_limit() {
		let long = "x".repeat(300);
		let payload = as_map(json!({ "note": long }));
		let (clean, report) = sanitize(&payload, &PayloadLimits::with_max_keys(10));

		assert_eq!(clean["note"].as_str().unwrap().chars().count(), 255);
		assert_eq!(report.truncated_keys, vec!["note".to_string()]);
	}

	#[test]
	fn test_truncation_respects_char_boundaries() {
		let long: String = "é".repeat(300);
		let payload = as_map(json!({ "note": long }));
		let (clean, _) = sanitize(&payload, &PayloadLimits::with_max_keys(10));

		let s = clean["note"].as_str().unwrap();
		assert_eq!(s.chars().count(), 255);
		assert!(s.chars().all(|c| c == 'é'));
	}

	#[test]
	fn test_exact_limit_string_is_untouched() {
		let exact = "x".repeat(255);
		let payload = as_map(json!({ "note": exact.clone() }));
		let (clean, report) = sanitize(&payload, &PayloadLimits::with_max_keys(10));

		assert_eq!(clean["note"].as_str().unwrap(), exact);
		assert!(report.is_clean());
	}

	#[test]
	fn test_non_primitive_values_are_dropped() {
		let payload = as_map(json!({
			"nested": {"a": 1},
			"list": [1, 2, 3],
			"nothing": null,
			"kept": "value",
		}));
		let (clean, report) = sanitize(&payload, &PayloadLimits::with_max_keys(10));

		assert_eq!(clean.len(), 1);
		assert_eq!(clean["kept"], "value");
		assert_eq!(report.dropped_keys.len(), 3);
	}

	#[test]
	fn test_numbers_and_bools_pass_through() {
		let payload = as_map(json!({
			"count": 42,
			"ratio": 0.5,
			"active": true,
		}));
		let (clean, report) = sanitize(&payload, &PayloadLimits::with_max_keys(10));

		assert_eq!(clean["count"], 42);
		assert_eq!(clean["ratio"], 0.5);
		assert_eq!(clean["active"], true);
		assert!(report.is_clean());
	}

	#[test]
	fn test_dropped_non_primitive_frees_no_budget_for_itself() {
		// A priority field with a non-primitive value is dropped, and a
		// later plain field takes the slot instead.
		let payload = as_map(json!({
			"program_code": {"nested": true},
			"zeta": "fits",
		}));
		let (clean, report) = sanitize(&payload, &PayloadLimits::with_max_keys(1));

		assert_eq!(clean.len(), 1);
		assert_eq!(clean["zeta"], "fits");
		assert_eq!(report.dropped_keys, vec!["program_code".to_string()]);
	}

	proptest! {
		#[test]
		fn output_never_exceeds_key_budget(
			keys in proptest::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,20}", 0..30),
			max_keys in 0usize..10,
		) {
			let payload: Map<String, Value> = keys
				.into_iter()
				.map(|(k, v)| (k, Value::String(v)))
				.collect();
			let (clean, _) = sanitize(&payload, &PayloadLimits::with_max_keys(max_keys));
			prop_assert!(clean.len() <= max_keys);
		}

		#[test]
		fn every_input_key_is_accepted_or_reported(
			keys in proptest::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,20}", 0..30),
			max_keys in 0usize..10,
		) {
			let payload: Map<String, Value> = keys
				.into_iter()
				.map(|(k, v)| (k, Value::String(v)))
				.collect();
			let total = payload.len();
			let (clean, report) = sanitize(&payload, &PayloadLimits::with_max_keys(max_keys));
			prop_assert_eq!(clean.len() + report.dropped_keys.len(), total);
		}

		#[test]
		fn strings_never_exceed_length_limit(value in ".{0,400}") {
			let mut payload = Map::new();
			payload.insert("field".to_string(), Value::String(value));
			let (clean, _) = sanitize(&payload, &PayloadLimits::with_max_keys(5));
			if let Some(Value::String(s)) = clean.get("field") {
				prop_assert!(s.chars().count() <= MAX_STRING_LEN);
			}
		}
	}
}
