// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! JSON read/write helpers with documented reset-on-failure recovery.
//!
//! Persisted analytics state can always be corrupt: a different build wrote
//! it, the user edited it, or the store truncated it. The recovery policy is
//! to fall back to the default value and carry on, and [`Recovered`] makes
//! that observable so tests can assert recovery happened instead of the
//! failure being silently swallowed.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::StringStore;

/// A value read from storage, annotated with whether it was reset.
///
/// `recovered` is true when the stored value was unreadable (store error or
/// parse failure) and the default was substituted. An absent key is not a
/// recovery: no prior state is the normal first-visit condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered<T> {
	pub value: T,
	pub recovered: bool,
}

impl<T> Recovered<T> {
	/// A value read (or defaulted) cleanly.
	pub fn clean(value: T) -> Self {
		Self {
			value,
			recovered: false,
		}
	}

	/// A default substituted after a failed read.
	pub fn recovered(value: T) -> Self {
		Self {
			value,
			recovered: true,
		}
	}

	/// Unwraps the inner value, discarding the recovery flag.
	pub fn into_value(self) -> T {
		self.value
	}
}

/// Reads and deserializes the JSON value stored under `key`.
///
/// Absent keys yield the default. Unreadable or unparseable values yield
/// the default with `recovered = true` and a diagnostic.
pub fn read_json<T>(store: &dyn StringStore, key: &str) -> Recovered<T>
where
	T: DeserializeOwned + Default,
{
	let raw = match store.get(key) {
		Ok(raw) => raw,
		Err(e) => {
			debug!(key, error = %e, "store read failed, using default");
			return Recovered::recovered(T::default());
		}
	};

	match raw {
		None => Recovered::clean(T::default()),
		Some(raw) => match serde_json::from_str(&raw) {
			Ok(value) => Recovered::clean(value),
			Err(e) => {
				debug!(key, error = %e, "stored JSON unparseable, resetting to default");
				Recovered::recovered(T::default())
			}
		},
	}
}

/// Serializes `value` as JSON and writes it under `key`.
pub fn write_json<T>(store: &dyn StringStore, key: &str, value: &T) -> Result<()>
where
	T: Serialize,
{
	let raw = serde_json::to_string(value).map_err(|e| StoreError::Serialize(e.to_string()))?;
	store.set(key, &raw)
}
