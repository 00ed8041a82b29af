// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity resolution over injected stores.
//!
//! The anonymous user id resolves durable store first, then the fallback
//! cookie, then generates fresh and persists to both. The session id lives
//! in the session store alone; its absence means a new session. Storage
//! failures degrade to an in-memory identity for the call: telemetry must
//! never break the page.

use beacon_analytics_core::identity::{AnonymousIdentity, AnonymousUserId, SessionId};
use beacon_common_store::{read_json, write_json, Stores, StringStore};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::keys;

/// Resolves and maintains the visitor's anonymous identity.
pub struct IdentityStore {
	stores: Stores,
}

impl IdentityStore {
	pub fn new(stores: Stores) -> Self {
		Self { stores }
	}

	/// Resolves the current identity, creating and persisting any missing
	/// pieces as a side effect.
	pub fn identity(&self) -> AnonymousIdentity {
		self.resolve(Utc::now())
	}

	fn resolve(&self, now: DateTime<Utc>) -> AnonymousIdentity {
		let anonymous_user_id = self.resolve_anonymous_id();
		let (session_id, is_new_session) = self.resolve_session(now);

		let mut session_count = self
			.get(self.stores.durable.as_ref(), keys::SESSION_COUNT)
			.and_then(|raw| raw.parse::<u64>().ok())
			.unwrap_or(0);
		if is_new_session {
			session_count += 1;
			self.set(
				self.stores.durable.as_ref(),
				keys::SESSION_COUNT,
				&session_count.to_string(),
			);
		}
		// A live session with no counter means the counter was evicted;
		// the current session still counts.
		let session_count = session_count.max(1);

		let first_visit_date = self.first_visit_date(now);
		self.set(
			self.stores.durable.as_ref(),
			keys::LAST_VISIT_DATE,
			&now.to_rfc3339(),
		);

		AnonymousIdentity {
			anonymous_user_id,
			session_id,
			is_new_session,
			first_visit_date,
			last_visit_date: now,
			session_count,
		}
	}

	/// Durable store, then cookie, then generate and persist to both.
	fn resolve_anonymous_id(&self) -> AnonymousUserId {
		if let Some(raw) = self.get(self.stores.durable.as_ref(), keys::ANONYMOUS_USER_ID) {
			// Refresh the cookie's expiry window on every resolution.
			self.set_cookie(keys::ANONYMOUS_USER_ID, &raw);
			return AnonymousUserId::from_raw(raw);
		}

		if let Some(raw) = self.get_cookie(keys::ANONYMOUS_USER_ID) {
			self.set(self.stores.durable.as_ref(), keys::ANONYMOUS_USER_ID, &raw);
			return AnonymousUserId::from_raw(raw);
		}

		let id = AnonymousUserId::generate();
		self.set(
			self.stores.durable.as_ref(),
			keys::ANONYMOUS_USER_ID,
			id.as_str(),
		);
		self.set_cookie(keys::ANONYMOUS_USER_ID, id.as_str());
		id
	}

	fn resolve_session(&self, now: DateTime<Utc>) -> (SessionId, bool) {
		if let Some(raw) = self.get(self.stores.session.as_ref(), keys::SESSION_ID) {
			return (SessionId::from_raw(raw), false);
		}

		let id = SessionId::generate();
		self.set(self.stores.session.as_ref(), keys::SESSION_ID, id.as_str());
		self.set(
			self.stores.session.as_ref(),
			keys::SESSION_START,
			&now.to_rfc3339(),
		);
		(id, true)
	}

	fn first_visit_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
		let stored = self
			.get(self.stores.durable.as_ref(), keys::FIRST_VISIT_DATE)
			.and_then(|raw| parse_rfc3339(&raw));
		match stored {
			Some(date) => date,
			None => {
				self.set(
					self.stores.durable.as_ref(),
					keys::FIRST_VISIT_DATE,
					&now.to_rfc3339(),
				);
				now
			}
		}
	}

	/// Whole days elapsed since the first visit. The first ever call
	/// stamps the date and returns 0.
	pub fn days_since_first_visit(&self) -> i64 {
		let now = Utc::now();
		(now - self.first_visit_date(now)).num_days().max(0)
	}

	/// Appends a page path to the session's ordered page list.
	pub fn record_page(&self, path: &str) {
		let mut pages: Vec<String> = read_json(self.stores.session.as_ref(), keys::SESSION_PAGES).into_value();
		pages.push(path.to_string());
		if let Err(e) = write_json(self.stores.session.as_ref(), keys::SESSION_PAGES, &pages) {
			warn!(error = %e, "failed to persist session page list");
		}
	}

	/// Page paths viewed this session, in order.
	pub fn pages_this_session(&self) -> Vec<String> {
		read_json(self.stores.session.as_ref(), keys::SESSION_PAGES).into_value()
	}

	/// Increments and returns the session's dispatched-event counter.
	pub fn increment_event_count(&self) -> u64 {
		let count = self.events_this_session() + 1;
		self.set(
			self.stores.session.as_ref(),
			keys::SESSION_EVENT_COUNT,
			&count.to_string(),
		);
		count
	}

	pub fn events_this_session(&self) -> u64 {
		self.get(self.stores.session.as_ref(), keys::SESSION_EVENT_COUNT)
			.and_then(|raw| raw.parse::<u64>().ok())
			.unwrap_or(0)
	}

	/// Clears all identity state, durable and session-scoped. The next
	/// resolution generates a fresh identity.
	pub fn reset(&self) {
		for key in [
			keys::ANONYMOUS_USER_ID,
			keys::FIRST_VISIT_DATE,
			keys::LAST_VISIT_DATE,
			keys::SESSION_COUNT,
		] {
			self.remove(self.stores.durable.as_ref(), key);
		}
		for key in [
			keys::SESSION_ID,
			keys::SESSION_START,
			keys::SESSION_PAGES,
			keys::SESSION_EVENT_COUNT,
		] {
			self.remove(self.stores.session.as_ref(), key);
		}
		if let Err(e) = self.stores.cookies.remove(keys::ANONYMOUS_USER_ID) {
			warn!(error = %e, "failed to clear identity cookie");
		}
	}

	fn get(&self, store: &dyn StringStore, key: &str) -> Option<String> {
		match store.get(key) {
			Ok(value) => value,
			Err(e) => {
				warn!(key, error = %e, "store read failed");
				None
			}
		}
	}

	fn set(&self, store: &dyn StringStore, key: &str, value: &str) {
		if let Err(e) = store.set(key, value) {
			warn!(key, error = %e, "store write failed");
		}
	}

	fn remove(&self, store: &dyn StringStore, key: &str) {
		if let Err(e) = store.remove(key) {
			warn!(key, error = %e, "store remove failed");
		}
	}

	fn get_cookie(&self, name: &str) -> Option<String> {
		match self.stores.cookies.get(name) {
			Ok(value) => value,
			Err(e) => {
				warn!(name, error = %e, "cookie read failed");
				None
			}
		}
	}

	fn set_cookie(&self, name: &str, value: &str) {
		if let Err(e) = self.stores.cookies.set(name, value, keys::IDENTITY_COOKIE_DAYS) {
			warn!(name, error = %e, "cookie write failed");
		}
	}
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(raw)
		.ok()
		.map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
	use super::*;
	use beacon_common_store::{CookieStore, StoreError};
	use std::sync::Arc;

	fn identity_store() -> (IdentityStore, Stores) {
		let stores = Stores::in_memory();
		(IdentityStore::new(stores.clone()), stores)
	}

	#[test]
	fn test_anonymous_id_is_stable_across_calls() {
		let (store, _) = identity_store();
		let first = store.identity();
		let second = store.identity();
		assert_eq!(first.anonymous_user_id, second.anonymous_user_id);
	}

	#[test]
	fn test_first_resolution_is_new_session() {
		let (store, _) = identity_store();
		let identity = store.identity();
		assert!(identity.is_new_session);
		assert_eq!(identity.session_count, 1);

		let identity = store.identity();
		assert!(!identity.is_new_session);
		assert_eq!(identity.session_count, 1);
	}

	#[test]
	fn test_new_session_after_session_store_cleared() {
		let (store, stores) = identity_store();
		let first = store.identity();

		// Simulate closing the tab: session store evaporates.
		stores.session.remove(keys::SESSION_ID).unwrap();
		stores.session.remove(keys::SESSION_START).unwrap();

		let second = store.identity();
		assert!(second.is_new_session);
		assert_ne!(first.session_id, second.session_id);
		assert_eq!(first.anonymous_user_id, second.anonymous_user_id);
		assert_eq!(second.session_count, 2);
	}

	#[test]
	fn test_cookie_fallback_restores_durable_store() {
		let (store, stores) = identity_store();
		let original = store.identity();

		// Durable store evicted; cookie survives.
		stores.durable.remove(keys::ANONYMOUS_USER_ID).unwrap();

		let restored = store.identity();
		assert_eq!(restored.anonymous_user_id, original.anonymous_user_id);
		assert_eq!(
			stores.durable.get(keys::ANONYMOUS_USER_ID).unwrap(),
			Some(original.anonymous_user_id.as_str().to_string())
		);
	}

	#[test]
	fn test_reset_yields_fresh_identity() {
		let (store, _) = identity_store();
		let before = store.identity();
		store.reset();
		let after = store.identity();

		assert_ne!(before.anonymous_user_id, after.anonymous_user_id);
		assert_ne!(before.session_id, after.session_id);
		assert!(after.is_new_session);
		assert_eq!(after.session_count, 1);
	}

	#[test]
	fn test_days_since_first_visit_starts_at_zero() {
		let (store, _) = identity_store();
		assert_eq!(store.days_since_first_visit(), 0);
		// Second call reads the stamped date rather than re-stamping.
		assert_eq!(store.days_since_first_visit(), 0);
	}

	#[test]
	fn test_days_since_first_visit_counts_whole_days() {
		let (store, stores) = identity_store();
		let ten_days_ago = Utc::now() - chrono::Duration::days(10) - chrono::Duration::hours(2);
		stores
			.durable
			.set(keys::FIRST_VISIT_DATE, &ten_days_ago.to_rfc3339())
			.unwrap();
		assert_eq!(store.days_since_first_visit(), 10);
	}

	#[test]
	fn test_corrupt_first_visit_date_restamps() {
		let (store, stores) = identity_store();
		stores.durable.set(keys::FIRST_VISIT_DATE, "yesterday-ish").unwrap();
		assert_eq!(store.days_since_first_visit(), 0);
	}

	#[test]
	fn test_session_page_list_and_event_count() {
		let (store, _) = identity_store();
		store.record_page("/");
		store.record_page("/programs/mba/");
		assert_eq!(store.pages_this_session(), vec!["/", "/programs/mba/"]);

		assert_eq!(store.increment_event_count(), 1);
		assert_eq!(store.increment_event_count(), 2);
		assert_eq!(store.events_this_session(), 2);
	}

	#[test]
	fn test_unavailable_storage_degrades_in_memory() {
		struct DeadStore;
		impl StringStore for DeadStore {
			fn get(&self, _key: &str) -> beacon_common_store::Result<Option<String>> {
				Err(StoreError::Unavailable("disabled".into()))
			}
			fn set(&self, _key: &str, _value: &str) -> beacon_common_store::Result<()> {
				Err(StoreError::Unavailable("disabled".into()))
			}
			fn remove(&self, _key: &str) -> beacon_common_store::Result<()> {
				Err(StoreError::Unavailable("disabled".into()))
			}
		}
		struct DeadJar;
		impl CookieStore for DeadJar {
			fn get(&self, _name: &str) -> beacon_common_store::Result<Option<String>> {
				Err(StoreError::Unavailable("disabled".into()))
			}
			fn set(&self, _name: &str, _value: &str, _max_age_days: u32) -> beacon_common_store::Result<()> {
				Err(StoreError::Unavailable("disabled".into()))
			}
			fn remove(&self, _name: &str) -> beacon_common_store::Result<()> {
				Err(StoreError::Unavailable("disabled".into()))
			}
		}

		let stores = Stores {
			durable: Arc::new(DeadStore),
			session: Arc::new(DeadStore),
			cookies: Arc::new(DeadJar),
		};
		let store = IdentityStore::new(stores);

		// Every resolution still yields a usable identity.
		let identity = store.identity();
		assert!(identity.anonymous_user_id.as_str().starts_with("anon_"));
		assert!(identity.is_new_session);
		assert_eq!(identity.session_count, 1);
	}

	#[test]
	fn test_resolution_persists_all_durable_keys() {
		let (store, stores) = identity_store();
		store.identity();
		let durable = stores.durable.as_ref();
		assert!(durable.get(keys::ANONYMOUS_USER_ID).unwrap().is_some());
		assert!(durable.get(keys::FIRST_VISIT_DATE).unwrap().is_some());
		assert!(durable.get(keys::LAST_VISIT_DATE).unwrap().is_some());
		assert!(durable.get(keys::SESSION_COUNT).unwrap().is_some());
	}
}
