// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Anonymous identity types.
//!
//! Visitors are never authenticated on the marketing site, so identity is a
//! pair of opaque ids: a durable anonymous user id that survives browsing
//! sessions, and a session id that lives for exactly one of them. Both are
//! prefixed UUIDv7 strings (time-ordered with random entropy, collision
//! probability negligible).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable anonymous visitor identifier.
///
/// Generated once per browser profile and persisted to both the durable
/// store and a fallback cookie. Stable across sessions; only an explicit
/// reset or storage eviction replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnonymousUserId(String);

impl AnonymousUserId {
	pub const PREFIX: &'static str = "anon_";

	/// Generates a fresh id.
	#[must_use]
	pub fn generate() -> Self {
		Self(format!("{}{}", Self::PREFIX, Uuid::now_v7()))
	}

	/// Wraps an id read back from storage.
	pub fn from_raw(raw: impl Into<String>) -> Self {
		Self(raw.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for AnonymousUserId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Per-browsing-session identifier.
///
/// Regenerated whenever no active session marker exists. A new session id
/// never affects the anonymous user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
	pub const PREFIX: &'static str = "sess_";

	/// Generates a fresh id.
	#[must_use]
	pub fn generate() -> Self {
		Self(format!("{}{}", Self::PREFIX, Uuid::now_v7()))
	}

	/// Wraps an id read back from storage.
	pub fn from_raw(raw: impl Into<String>) -> Self {
		Self(raw.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for SessionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A snapshot of the visitor's resolved identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymousIdentity {
	pub anonymous_user_id: AnonymousUserId,
	pub session_id: SessionId,
	/// True when the session id was generated by this resolution.
	pub is_new_session: bool,
	pub first_visit_date: DateTime<Utc>,
	pub last_visit_date: DateTime<Utc>,
	/// Total browsing sessions seen for this browser profile, including
	/// the current one.
	pub session_count: u64,
}

impl AnonymousIdentity {
	/// Whole days elapsed between the first visit and `now`.
	#[must_use]
	pub fn days_since_first_visit(&self, now: DateTime<Utc>) -> i64 {
		(now - self.first_visit_date).num_days().max(0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_generated_ids_carry_prefix() {
		assert!(AnonymousUserId::generate().as_str().starts_with("anon_"));
		assert!(SessionId::generate().as_str().starts_with("sess_"));
	}

	#[test]
	fn test_from_raw_preserves_value() {
		let id = AnonymousUserId::from_raw("anon_stored");
		assert_eq!(id.as_str(), "anon_stored");
		assert_eq!(id.to_string(), "anon_stored");
	}

	#[test]
	fn test_serde_is_transparent() {
		let id = AnonymousUserId::from_raw("anon_x");
		let json = serde_json::to_string(&id).unwrap();
		assert_eq!(json, "\"anon_x\"");
		let back: AnonymousUserId = serde_json::from_str(&json).unwrap();
		assert_eq!(back, id);
	}

	#[test]
	fn test_days_since_first_visit() {
		let first = Utc::now() - chrono::Duration::days(10) - chrono::Duration::hours(3);
		let identity = AnonymousIdentity {
			anonymous_user_id: AnonymousUserId::generate(),
			session_id: SessionId::generate(),
			is_new_session: false,
			first_visit_date: first,
			last_visit_date: Utc::now(),
			session_count: 4,
		};
		assert_eq!(identity.days_since_first_visit(Utc::now()), 10);
	}

	#[test]
	fn test_days_since_first_visit_never_negative() {
		let identity = AnonymousIdentity {
			anonymous_user_id: AnonymousUserId::generate(),
			session_id: SessionId::generate(),
			is_new_session: true,
			first_visit_date: Utc::now() + chrono::Duration::hours(1),
			last_visit_date: Utc::now(),
			session_count: 1,
		};
		assert_eq!(identity.days_since_first_visit(Utc::now()), 0);
	}

	proptest! {
		#[test]
		fn anonymous_user_ids_are_unique(_seed: u64) {
			let a = AnonymousUserId::generate();
			let b = AnonymousUserId::generate();
			prop_assert_ne!(a, b);
		}

		#[test]
		fn session_ids_are_unique(_seed: u64) {
			let a = SessionId::generate();
			let b = SessionId::generate();
			prop_assert_ne!(a, b);
		}
	}
}
