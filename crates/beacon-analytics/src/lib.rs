// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client analytics, attribution, and funnel tracking SDK.
//!
//! This crate wires the pure engines from `beacon-analytics-core` to
//! injected storage (`beacon-common-store`) and an ingestion sink, and
//! exposes the one facade the rest of the application talks to:
//! [`AnalyticsService`].
//!
//! # Overview
//!
//! - [`IdentityStore`]: durable anonymous id + per-session id resolution
//! - [`AttributionTracker`]: one touchpoint per session, summary on demand
//! - [`FunnelManager`] / [`FunnelTracker`]: persisted journey per funnel
//! - [`AnalyticsService`]: enrich, sanitize, dispatch, feed funnels
//! - [`EventSink`]: delivery boundary, with HTTP, memory, and noop
//!   implementations
//!
//! Every failure inside the service boundary is logged and swallowed:
//! telemetry is best-effort auxiliary infrastructure and must never
//! affect page behavior.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use beacon_analytics::{
//!     default_funnels, event_data, AnalyticsConfig, AnalyticsService, MemorySink,
//!     StaticPageContext,
//! };
//! use beacon_analytics_core::page::PageSnapshot;
//! use beacon_common_store::Stores;
//!
//! let page = StaticPageContext::new(PageSnapshot {
//!     url: "https://online.example.edu/?utm_source=google".to_string(),
//!     referrer: None,
//!     user_agent: "Mozilla/5.0".to_string(),
//!     viewport_width: 1280,
//!     viewport_height: 800,
//! });
//! let service = AnalyticsService::new(
//!     AnalyticsConfig::new(),
//!     Stores::in_memory(),
//!     default_funnels(),
//!     Arc::new(MemorySink::new()),
//!     Arc::new(page),
//! );
//!
//! let snapshot = service.initialize_attribution();
//! assert!(snapshot.is_first_touch);
//! service.track_event(
//!     "rfi_form_submitted",
//!     event_data(serde_json::json!({"program_code": "mba"})),
//! );
//! ```

pub mod attribution;
pub mod config;
pub mod error;
pub mod funnel;
pub mod identity;
pub mod keys;
pub mod service;
pub mod sink;

pub use attribution::AttributionTracker;
pub use config::{AnalyticsConfig, DEFAULT_MAX_EVENT_KEYS, MAX_EVENT_KEYS_ENV};
pub use error::{AnalyticsError, Result};
pub use funnel::{default_funnels, FunnelManager, FunnelTracker};
pub use identity::IdentityStore;
pub use service::{event_data, AnalyticsService, PageContextSource, StaticPageContext};
pub use sink::{CapturedEvent, EventSink, HttpSink, MemorySink, NoopSink};

// Canonical event names, re-exported so callers need only this crate.
pub use beacon_analytics_core::event::names;
