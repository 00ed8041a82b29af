// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics SDK.
//!
//! These errors stay inside the SDK: the [`crate::AnalyticsService`]
//! boundary logs and swallows them, because telemetry must never break the
//! hosting page.

use thiserror::Error;

/// Analytics SDK errors.
#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// The ingestion endpoint URL is missing or unparseable.
	#[error("invalid ingestion endpoint URL: {0}")]
	InvalidEndpoint(String),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// The ingestion server rejected the event.
	#[error("ingestion server error ({status})")]
	ServerError { status: u16 },
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
