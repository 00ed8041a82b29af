// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Canonical event names and payload enrichment.
//!
//! Calling code uses the constants in [`names`] instead of ad hoc strings,
//! so event taxonomies stay greppable. [`enrich`] builds the full event
//! payload: identity, attribution, page and device context, timestamp, and
//! the caller's fields merged last so callers always win on key collisions.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::attribution::AttributionSummary;
use crate::identity::AnonymousIdentity;
use crate::page::{DeviceContext, PageSnapshot, PageType};

/// Canonical event names.
pub mod names {
	pub const PAGE_VIEW: &str = "page_view";
	pub const CTA_CLICK: &str = "cta_click";
	pub const FORM_STARTED: &str = "form_started";
	pub const FORM_SUBMITTED: &str = "form_submitted";
	pub const FORM_ERROR: &str = "form_error";
	pub const MODAL_OPENED: &str = "modal_opened";
	pub const MODAL_CLOSED: &str = "modal_closed";
	pub const PROGRAM_PAGE_VIEWED: &str = "program_page_viewed";
	pub const RFI_FORM_STARTED: &str = "rfi_form_started";
	pub const RFI_FORM_SUBMITTED: &str = "rfi_form_submitted";
	pub const APPLICATION_STARTED: &str = "application_started";
	pub const APPLICATION_SUBMITTED: &str = "application_submitted";
	pub const CONTENT_ENGAGEMENT: &str = "content_engagement";
	pub const SCROLL_DEPTH: &str = "scroll_depth";
	pub const TIME_ON_PAGE: &str = "time_on_page";
	pub const SESSION_STARTED: &str = "session_started";
	pub const FUNNEL_STAGE_PROGRESSED: &str = "funnel_stage_progressed";
	pub const FUNNEL_DROP_OFF: &str = "funnel_drop_off";
}

/// Builds the enriched payload for one dispatch call.
///
/// The payload is ephemeral: it is sanitized for the provider and handed
/// to the funnel layer, but never persisted as a whole.
#[must_use]
pub fn enrich(
	identity: &AnonymousIdentity,
	attribution: Option<&AttributionSummary>,
	page: &PageSnapshot,
	caller_data: Map<String, Value>,
	now: DateTime<Utc>,
) -> Map<String, Value> {
	let mut payload = Map::new();

	payload.insert(
		"anonymous_user_id".to_string(),
		Value::String(identity.anonymous_user_id.to_string()),
	);
	payload.insert("session_id".to_string(), Value::String(identity.session_id.to_string()));
	payload.insert("is_new_session".to_string(), Value::Bool(identity.is_new_session));
	payload.insert("session_count".to_string(), Value::from(identity.session_count));
	payload.insert(
		"days_since_first_visit".to_string(),
		Value::from(identity.days_since_first_visit(now)),
	);

	if let Some(summary) = attribution {
		payload.insert(
			"first_touch_source".to_string(),
			Value::String(summary.first_touch_source.clone()),
		);
		payload.insert(
			"first_touch_medium".to_string(),
			Value::String(summary.first_touch_medium.clone()),
		);
		payload.insert(
			"first_touch_campaign".to_string(),
			Value::String(summary.first_touch_campaign.clone()),
		);
		payload.insert(
			"last_touch_source".to_string(),
			Value::String(summary.last_touch_source.clone()),
		);
		payload.insert(
			"last_touch_medium".to_string(),
			Value::String(summary.last_touch_medium.clone()),
		);
		payload.insert(
			"last_touch_campaign".to_string(),
			Value::String(summary.last_touch_campaign.clone()),
		);
		payload.insert(
			"source_journey".to_string(),
			Value::String(summary.source_journey.clone()),
		);
		payload.insert(
			"campaign_journey".to_string(),
			Value::String(summary.campaign_journey.clone()),
		);
		payload.insert("touchpoint_count".to_string(), Value::from(summary.touchpoint_count));
		payload.insert("days_in_journey".to_string(), Value::from(summary.days_in_journey));
		payload.insert(
			"primary_source".to_string(),
			Value::String(summary.primary_source.clone()),
		);
	}

	let path = page.path();
	let device = DeviceContext::sniff(&page.user_agent, page.viewport_width);
	payload.insert(
		"page_type".to_string(),
		Value::String(PageType::classify(&path).as_str().to_string()),
	);
	payload.insert("page_path".to_string(), Value::String(path));
	if let Some(referrer) = &page.referrer {
		payload.insert("referrer".to_string(), Value::String(referrer.clone()));
	}
	payload.insert("device_type".to_string(), Value::String(device.device.to_string()));
	payload.insert("browser".to_string(), Value::String(device.browser));
	payload.insert("os".to_string(), Value::String(device.os));
	payload.insert("viewport_width".to_string(), Value::from(page.viewport_width));
	payload.insert("viewport_height".to_string(), Value::from(page.viewport_height));

	payload.insert("timestamp".to_string(), Value::String(now.to_rfc3339()));

	// Caller fields merge last: on collision the caller wins.
	for (key, value) in caller_data {
		payload.insert(key, value);
	}

	payload
}
