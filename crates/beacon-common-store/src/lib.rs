// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage capability traits for the Beacon analytics engine.
//!
//! The engine owns three shared mutable resources: a durable store (survives
//! sessions), a session-scoped store (one browsing session), and a cookie jar
//! (durable, cross-subdomain). This crate abstracts all three behind small
//! object-safe traits so the engine is a pure function of injected state and
//! is testable without a browser.
//!
//! Every layer reads-before-write on the keys it owns and writes back the
//! full updated structure. Concurrent writers from other tabs sharing the
//! same durable store are not coordinated: last write wins. That is a known
//! limitation of the storage model, not something this crate papers over
//! with locking.
//!
//! # Example
//!
//! ```
//! use beacon_common_store::{Stores, StringStore};
//!
//! let stores = Stores::in_memory();
//! stores.durable.set("visits", "3").unwrap();
//! assert_eq!(stores.durable.get("visits").unwrap().as_deref(), Some("3"));
//! ```

pub mod error;
pub mod json;
pub mod memory;

use std::sync::Arc;

pub use error::{Result, StoreError};
pub use json::{read_json, write_json, Recovered};
pub use memory::{MemoryCookieJar, MemoryStore};

/// A string key/value store.
///
/// Implementations back onto whatever the host environment provides:
/// localStorage, sessionStorage, a file, or a plain in-memory map.
pub trait StringStore: Send + Sync {
	/// Reads the value for `key`, or `None` if absent.
	fn get(&self, key: &str) -> Result<Option<String>>;

	/// Writes `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: &str) -> Result<()>;

	/// Removes `key` if present.
	fn remove(&self, key: &str) -> Result<()>;
}

/// A cookie jar with per-cookie expiry.
///
/// Kept separate from [`StringStore`] because cookies carry an expiry and
/// are the engine's cross-subdomain fallback for the anonymous user id.
pub trait CookieStore: Send + Sync {
	/// Reads the cookie `name`, or `None` if absent or expired.
	fn get(&self, name: &str) -> Result<Option<String>>;

	/// Sets the cookie `name` with the given expiry in days.
	fn set(&self, name: &str, value: &str, max_age_days: u32) -> Result<()>;

	/// Removes the cookie `name` if present.
	fn remove(&self, name: &str) -> Result<()>;
}

/// The bundle of stores the analytics engine operates over.
#[derive(Clone)]
pub struct Stores {
	/// Durable store, survives browsing sessions.
	pub durable: Arc<dyn StringStore>,
	/// Session-scoped store, cleared when the browsing session ends.
	pub session: Arc<dyn StringStore>,
	/// Cookie jar, durable fallback for cross-subdomain identity.
	pub cookies: Arc<dyn CookieStore>,
}

impl Stores {
	/// Creates a bundle backed entirely by in-memory maps.
	///
	/// This is the degraded-mode backing when real storage is unavailable,
	/// and the standard backing for tests.
	pub fn in_memory() -> Self {
		Self {
			durable: Arc::new(MemoryStore::new()),
			session: Arc::new(MemoryStore::new()),
			cookies: Arc::new(MemoryCookieJar::new()),
		}
	}
}

impl std::fmt::Debug for Stores {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Stores").finish_non_exhaustive()
	}
}
