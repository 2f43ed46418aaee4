// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire-level value representation.
//!
//! [`TypedValue`] is the tagged union carried by value-change notifications
//! and returned by on-demand reads. Conversion into the consumer's
//! representation happens per channel via
//! [`Conversion`](crate::descriptor::Conversion); this module only models
//! the raw values themselves.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a digital input or output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelState {
    /// The line is at high level.
    High,
    /// The line is at low level.
    Low,
}

impl LevelState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for LevelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LevelState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HIGH" | "1" | "TRUE" => Ok(Self::High),
            "LOW" | "0" | "FALSE" => Ok(Self::Low),
            _ => Err(format!("invalid level state: {s}")),
        }
    }
}

impl From<bool> for LevelState {
    fn from(value: bool) -> Self {
        if value { Self::High } else { Self::Low }
    }
}

/// On/off state of a switchable channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnOff {
    /// The channel is switched on.
    On,
    /// The channel is switched off.
    Off,
}

impl OnOff {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    /// Returns `true` for [`OnOff::On`].
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for OnOff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OnOff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ON" | "1" | "TRUE" => Ok(Self::On),
            "OFF" | "0" | "FALSE" => Ok(Self::Off),
            _ => Err(format!("invalid on/off state: {s}")),
        }
    }
}

impl From<bool> for OnOff {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// A raw channel value as reported by a module.
///
/// # Examples
///
/// ```
/// use modbridge::types::TypedValue;
///
/// let pressure = TypedValue::Decimal(101_325.0);
/// assert_eq!(pressure.as_decimal(), Some(101_325.0));
/// assert!(pressure.as_text().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    /// A decimal measurement.
    Decimal(f64),
    /// A digital high/low level.
    Level(LevelState),
    /// A free-form text value.
    Text(String),
    /// A point in time.
    Timestamp(DateTime<Utc>),
    /// An on/off switch state.
    Switch(OnOff),
}

impl TypedValue {
    /// Returns the decimal value, if this is a [`TypedValue::Decimal`].
    #[must_use]
    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Self::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the level state, if this is a [`TypedValue::Level`].
    #[must_use]
    pub fn as_level(&self) -> Option<LevelState> {
        match self {
            Self::Level(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text, if this is a [`TypedValue::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the timestamp, if this is a [`TypedValue::Timestamp`].
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the switch state, if this is a [`TypedValue::Switch`].
    #[must_use]
    pub fn as_switch(&self) -> Option<OnOff> {
        match self {
            Self::Switch(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a short tag naming the variant, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Decimal(_) => "decimal",
            Self::Level(_) => "level",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Switch(_) => "switch",
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Level(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Switch(v) => write!(f, "{v}"),
        }
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        Self::Switch(OnOff::from(value))
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
