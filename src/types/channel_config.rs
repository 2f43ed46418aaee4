// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel-scoped configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Handler-supplied configuration for one channel.
///
/// The configuration is pushed to the module once at enable time (e.g. an
/// averaging window for a sensor channel) and is immutable for the attached
/// session. Entries are free-form key/value pairs; their meaning is defined
/// by the backend, not by this library.
///
/// # Examples
///
/// ```
/// use modbridge::types::ChannelConfig;
///
/// let config = ChannelConfig::new()
///     .with("averaging", 25)
///     .with("unit", "hPa");
///
/// assert_eq!(config.get_u64("averaging"), Some(25));
/// assert_eq!(config.get_str("unit"), Some("hPa"));
/// assert!(config.get("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelConfig {
    entries: BTreeMap<String, Value>,
}

impl ChannelConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any existing value for the key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Returns the raw value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the value for a key as an unsigned integer.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.entries.get(key).and_then(Value::as_u64)
    }

    /// Returns the value for a key as a float.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.entries.get(key).and_then(Value::as_f64)
    }

    /// Returns the value for a key as a string slice.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    /// Returns `true` if the configuration has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config() {
        let config = ChannelConfig::new();
        assert!(config.is_empty());
        assert_eq!(config.len(), 0);
        assert!(config.get("anything").is_none());
    }

    #[test]
    fn typed_accessors() {
        let config = ChannelConfig::new()
            .with("window", 100)
            .with("threshold", 0.5)
            .with("mode", "average");

        assert_eq!(config.get_u64("window"), Some(100));
        assert_eq!(config.get_f64("threshold"), Some(0.5));
        assert_eq!(config.get_str("mode"), Some("average"));
        assert_eq!(config.get_str("window"), None);
    }

    #[test]
    fn with_replaces_existing_key() {
        let config = ChannelConfig::new().with("window", 100).with("window", 50);
        assert_eq!(config.len(), 1);
        assert_eq!(config.get_u64("window"), Some(50));
    }

    #[test]
    fn serde_round_trip() {
        let config = ChannelConfig::new().with("averaging", 25);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"averaging":25}"#);
        let back: ChannelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
