// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory store implementations.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::{CookieStore, StringStore};

/// A [`StringStore`] backed by a plain in-memory map.
#[derive(Debug, Default)]
pub struct MemoryStore {
	map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
		// A poisoned map still holds valid string data; recover it.
		self.map.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Returns the number of stored keys.
	pub fn len(&self) -> usize {
		self.lock().len()
	}

	/// Returns true if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}
}

impl StringStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>> {
		Ok(self.lock().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		self.lock().insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<()> {
		self.lock().remove(key);
		Ok(())
	}
}

/// A [`CookieStore`] backed by an in-memory map.
///
/// Expiry is accepted and discarded: an in-memory jar lives at most as long
/// as the process, which is always shorter than any cookie expiry the
/// engine sets.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
	map: Mutex<HashMap<String, String>>,
}

impl MemoryCookieJar {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
		self.map.lock().unwrap_or_else(|e| e.into_inner())
	}
}

impl CookieStore for MemoryCookieJar {
	fn get(&self, name: &str) -> Result<Option<String>> {
		Ok(self.lock().get(name).cloned())
	}

	fn set(&self, name: &str, value: &str, _max_age_days: u32) -> Result<()> {
		self.lock().insert(name.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, name: &str) -> Result<()> {
		self.lock().remove(name);
		Ok(())
	}
}
