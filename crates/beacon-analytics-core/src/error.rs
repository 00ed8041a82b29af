// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics core.

use thiserror::Error;

/// Analytics core errors.
///
/// These only arise at configuration time (bad funnel definitions). The
/// runtime tracking paths never error: bad input degrades to a no-op.
#[derive(Debug, Error)]
pub enum CoreError {
	/// A funnel definition violates a structural invariant.
	#[error("invalid funnel '{funnel}': {reason}")]
	InvalidFunnel { funnel: String, reason: String },
}

/// Result type alias for analytics core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
