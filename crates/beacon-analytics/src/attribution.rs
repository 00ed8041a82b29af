// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Touchpoint recording over injected stores.
//!
//! One touchpoint per session, not one per page view: the candidate built
//! for a page load is appended only when the current session id differs
//! from the last recorded touchpoint's session id.

use beacon_analytics_core::attribution::{summarize, AttributionSummary, Touchpoint, TouchpointSnapshot};
use beacon_analytics_core::identity::SessionId;
use beacon_analytics_core::page::PageSnapshot;
use beacon_common_store::{read_json, write_json, Stores};
use chrono::Utc;
use tracing::{debug, warn};

use crate::keys;

/// Records touchpoints and derives attribution summaries.
pub struct AttributionTracker {
	stores: Stores,
	internal_hosts: Vec<String>,
}

impl AttributionTracker {
	pub fn new(stores: Stores, internal_hosts: Vec<String>) -> Self {
		Self {
			stores,
			internal_hosts,
		}
	}

	/// Call once per page load. Appends a touchpoint for the current
	/// session unless one already exists, and returns the touchpoint the
	/// session is attributed to either way.
	pub fn record_touchpoint_if_new(&self, page: &PageSnapshot, session_id: &SessionId) -> TouchpointSnapshot {
		let mut touchpoints = self.touchpoints();

		if let Some(last) = touchpoints.last() {
			if &last.session_id == session_id {
				let touchpoint_index = touchpoints.len() - 1;
				return TouchpointSnapshot {
					touchpoint: last.clone(),
					is_first_touch: touchpoint_index == 0,
					touchpoint_index,
				};
			}
		}

		let touchpoint = Touchpoint::from_page(page, session_id, &self.internal_hosts, Utc::now());
		debug!(
			source = %touchpoint.source,
			medium = %touchpoint.medium,
			campaign = %touchpoint.campaign,
			"recording touchpoint"
		);
		touchpoints.push(touchpoint.clone());
		if let Err(e) = write_json(self.stores.durable.as_ref(), keys::TOUCHPOINTS, &touchpoints) {
			warn!(error = %e, "failed to persist touchpoints");
		}

		TouchpointSnapshot {
			touchpoint,
			is_first_touch: touchpoints.len() == 1,
			touchpoint_index: touchpoints.len() - 1,
		}
	}

	/// The full recorded journey, oldest first. A corrupt stored list
	/// reads as empty.
	pub fn touchpoints(&self) -> Vec<Touchpoint> {
		let read = read_json::<Vec<Touchpoint>>(self.stores.durable.as_ref(), keys::TOUCHPOINTS);
		if read.recovered {
			debug!("touchpoint history was unreadable and has been reset");
		}
		read.into_value()
	}

	/// Derives the attribution summary, or `None` with no touchpoints.
	pub fn attribution_summary(&self) -> Option<AttributionSummary> {
		summarize(&self.touchpoints())
	}

	/// Clears the recorded journey.
	pub fn reset(&self) {
		if let Err(e) = self.stores.durable.remove(keys::TOUCHPOINTS) {
			warn!(error = %e, "failed to clear touchpoints");
		}
	}
}
