// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persisted storage key layout.
//!
//! These names are a stable contract with previously-written browser
//! state: renaming one silently resets that piece of state for every
//! returning visitor.

/// Durable store: the anonymous user id. Mirrored to a cookie of the same
/// name for cross-subdomain durability.
pub const ANONYMOUS_USER_ID: &str = "beacon_anonymous_user_id";
/// Durable store: RFC 3339 timestamp of the first ever visit.
pub const FIRST_VISIT_DATE: &str = "beacon_first_visit_date";
/// Durable store: RFC 3339 timestamp of the most recent visit.
pub const LAST_VISIT_DATE: &str = "beacon_last_visit_date";
/// Durable store: total browsing sessions seen.
pub const SESSION_COUNT: &str = "beacon_session_count";
/// Durable store: ordered JSON list of touchpoints.
pub const TOUCHPOINTS: &str = "beacon_touchpoints";
/// Durable store: per-funnel journey, suffixed with the funnel key.
pub const FUNNEL_PREFIX: &str = "beacon_funnel_";

/// Session store: the current session id.
pub const SESSION_ID: &str = "beacon_session_id";
/// Session store: RFC 3339 timestamp of session start.
pub const SESSION_START: &str = "beacon_session_start";
/// Session store: ordered JSON list of page paths viewed this session.
pub const SESSION_PAGES: &str = "beacon_session_pages";
/// Session store: count of events dispatched this session.
pub const SESSION_EVENT_COUNT: &str = "beacon_session_event_count";

/// Cookie expiry for the anonymous user id.
pub const IDENTITY_COOKIE_DAYS: u32 = 365;

/// Storage key for a funnel's journey.
pub fn funnel_key(funnel: &str) -> String {
	format!("{FUNNEL_PREFIX}{funnel}")
}
