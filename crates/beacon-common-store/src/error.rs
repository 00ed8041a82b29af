// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for storage operations.

use thiserror::Error;

/// Storage backend errors.
///
/// Callers in the analytics engine treat every variant as recoverable:
/// a failed read degrades to the default value, a failed write is logged
/// and skipped. Nothing here is allowed to surface to page code.
#[derive(Debug, Error)]
pub enum StoreError {
	/// The backing store is unavailable (quota exceeded, disabled, evicted).
	#[error("store unavailable: {0}")]
	Unavailable(String),

	/// A value could not be serialized for storage.
	#[error("serialization failed: {0}")]
	Serialize(String),
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
