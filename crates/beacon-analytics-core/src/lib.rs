// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types and engines for Beacon marketing analytics.
//!
//! This crate holds the pure logic of the analytics engine: identity
//! types, touchpoints and attribution derivation, the funnel stage
//! machine, payload enrichment and sanitization, and page/device
//! classification. Nothing here touches storage or the network; the
//! `beacon-analytics` SDK wires these engines to injected stores and an
//! ingestion sink.
//!
//! # Overview
//!
//! - [`identity`]: durable anonymous user id + per-session id
//! - [`attribution`]: touchpoints, referrer taxonomy, first/last-touch
//!   summary derivation
//! - [`funnel`]: funnel definitions, journeys, the forward-only stage
//!   machine, conversions and drop-offs
//! - [`sanitize`]: greedy priority-first key budgeting and value
//!   truncation for the provider's payload limits
//! - [`event`]: canonical event names and payload enrichment
//! - [`page`]: page classification and device sniffing
//!
//! # Example
//!
//! ```
//! use beacon_analytics_core::funnel::{FunnelDefinition, FunnelJourney, FunnelStage};
//!
//! let def = FunnelDefinition::new(
//!     "rfi",
//!     "Request for Information",
//!     vec![FunnelStage {
//!         number: 1,
//!         name: "Submitted".to_string(),
//!         trigger_events: vec!["rfi_form_submitted".to_string()],
//!         is_conversion: true,
//!         conversion_value: Some(50.0),
//!         is_final_goal: true,
//!     }],
//! );
//! def.validate().unwrap();
//!
//! let now = chrono::Utc::now();
//! let mut journey = FunnelJourney::new("rfi", now);
//! let progression = journey
//!     .advance_to(&def, 1, "rfi_form_submitted", None, now)
//!     .unwrap();
//! assert!(progression.is_conversion);
//! assert!(journey.has_converted());
//! ```

pub mod attribution;
pub mod error;
pub mod event;
pub mod funnel;
pub mod identity;
pub mod page;
pub mod sanitize;

pub use attribution::{
	classify_referrer, summarize, AttributionSummary, ReferrerClass, ReferrerInfo, Touchpoint,
	TouchpointSnapshot, UtmParams, CAMPAIGN_NOT_SET, MEDIUM_NONE, SOURCE_DIRECT,
};
pub use error::{CoreError, Result};
pub use event::enrich;
pub use funnel::{
	ConversionRecord, DropOffRecord, FunnelDefinition, FunnelJourney, FunnelStage, RecordedEvent,
	StageProgression,
};
pub use identity::{AnonymousIdentity, AnonymousUserId, SessionId};
pub use page::{DeviceClass, DeviceContext, PageSnapshot, PageType};
pub use sanitize::{sanitize, PayloadLimits, SanitizeReport, MAX_STRING_LEN, PRIORITY_FIELDS};
