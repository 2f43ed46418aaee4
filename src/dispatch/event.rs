// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge event types.

use serde::{Deserialize, Serialize};

use crate::registry::ModuleInfo;
use crate::types::{ChannelId, ModuleId, TypedValue};

/// Direction of a module lifecycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleChange {
    /// The module attached to the bridge.
    Attached,
    /// The module detached from the bridge.
    Detached,
}

impl ModuleChange {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
        }
    }
}

impl std::fmt::Display for ModuleChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One event on the ordered stream from the daemon connection.
///
/// The producer (the wire-protocol integration, outside this library) feeds
/// these into the [`NotificationDispatcher`](super::NotificationDispatcher)
/// in the order the daemon reported them. Events for a single module keep
/// that order all the way to each listener; no ordering is guaranteed across
/// different modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// A channel on a module reported a new value.
    ValueChanged {
        /// The reporting module.
        module: ModuleId,
        /// The channel whose value changed.
        channel: ChannelId,
        /// The previous value, absent on first observation.
        old: Option<TypedValue>,
        /// The new value.
        new: TypedValue,
    },

    /// A module attached to the bridge.
    ModuleAttached {
        /// The attached module.
        module: ModuleId,
        /// Static information about the module.
        info: ModuleInfo,
    },

    /// A module detached from the bridge.
    ModuleDetached {
        /// The detached module.
        module: ModuleId,
        /// The module's information as of detach time.
        info: ModuleInfo,
    },

    /// The daemon connection's reachability changed.
    ReachabilityChanged {
        /// Whether the bridge is now reachable.
        reachable: bool,
    },
}

impl BridgeEvent {
    /// Creates a value-changed event.
    #[must_use]
    pub fn value_changed(
        module: impl Into<ModuleId>,
        channel: impl Into<ChannelId>,
        old: Option<TypedValue>,
        new: TypedValue,
    ) -> Self {
        Self::ValueChanged {
            module: module.into(),
            channel: channel.into(),
            old,
            new,
        }
    }

    /// Creates a module-attached event.
    #[must_use]
    pub fn attached(module: impl Into<ModuleId>, info: ModuleInfo) -> Self {
        Self::ModuleAttached {
            module: module.into(),
            info,
        }
    }

    /// Creates a module-detached event.
    #[must_use]
    pub fn detached(module: impl Into<ModuleId>, info: ModuleInfo) -> Self {
        Self::ModuleDetached {
            module: module.into(),
            info,
        }
    }

    /// Creates a reachability event.
    #[must_use]
    pub fn reachable(reachable: bool) -> Self {
        Self::ReachabilityChanged { reachable }
    }

    /// Returns the module id this event concerns, if any.
    #[must_use]
    pub fn module_id(&self) -> Option<&ModuleId> {
        match self {
            Self::ValueChanged { module, .. }
            | Self::ModuleAttached { module, .. }
            | Self::ModuleDetached { module, .. } => Some(module),
            Self::ReachabilityChanged { .. } => None,
        }
    }

    /// Returns `true` if this is a value-change event.
    #[must_use]
    pub fn is_value_change(&self) -> bool {
        matches!(self, Self::ValueChanged { .. })
    }

    /// Returns `true` if this is a module attach or detach event.
    #[must_use]
    pub fn is_module_change(&self) -> bool {
        matches!(self, Self::ModuleAttached { .. } | Self::ModuleDetached { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_id_extraction() {
        let info = ModuleInfo::new("barometer");

        let attached = BridgeEvent::attached("abc", info.clone());
        assert_eq!(attached.module_id(), Some(&ModuleId::new("abc")));

        let value = BridgeEvent::value_changed("abc", "airpressure", None, TypedValue::Decimal(1.0));
        assert_eq!(value.module_id(), Some(&ModuleId::new("abc")));

        assert_eq!(BridgeEvent::reachable(true).module_id(), None);
    }

    #[test]
    fn event_kind_predicates() {
        let info = ModuleInfo::new("barometer");

        assert!(BridgeEvent::attached("abc", info.clone()).is_module_change());
        assert!(BridgeEvent::detached("abc", info).is_module_change());
        assert!(
            BridgeEvent::value_changed("abc", "airpressure", None, TypedValue::Decimal(1.0))
                .is_value_change()
        );
        assert!(!BridgeEvent::reachable(false).is_value_change());
    }

    #[test]
    fn module_change_display() {
        assert_eq!(ModuleChange::Attached.to_string(), "attached");
        assert_eq!(ModuleChange::Detached.to_string(), "detached");
    }
}
