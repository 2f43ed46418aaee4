// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener identity and callback seam.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatch::ModuleChange;
use crate::error::Result;
use crate::registry::ModuleInfo;
use crate::types::{ChannelId, ModuleId, TypedValue};

/// Unique identifier for a listener.
///
/// This is a wrapper around UUID v4 that provides a distinct type for
/// listener identification. Registration and unregistration in the
/// [`SubscriptionTable`](crate::subscription::SubscriptionTable) are keyed
/// by this id, which is what makes both operations idempotent.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Creates a new unique listener identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show only first 8 characters for readability
        let short = &self.0.to_string()[..8];
        write!(f, "ListenerId({short}...)")
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback interface for bridge notifications.
///
/// A listener registers with the
/// [`SubscriptionTable`](crate::subscription::SubscriptionTable) under a
/// [`ModuleId`]; value-change notifications are delivered only for that
/// module, while module attach/detach and reachability notifications reach
/// every registered listener, which filters by its own configured id.
///
/// Callbacks for one listener run on a dedicated worker task, so they are
/// invoked strictly in arrival order and a slow listener never delays
/// others. A returned error is logged and does not affect delivery to other
/// listeners or future events.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Returns this listener's identity.
    fn id(&self) -> ListenerId;

    /// A channel on a subscribed module reported a new value.
    ///
    /// `old` is absent on the first observation of the channel.
    ///
    /// # Errors
    ///
    /// Errors are logged by the delivery worker and otherwise ignored.
    async fn on_value_changed(
        &self,
        module: &ModuleId,
        channel: &ChannelId,
        old: Option<&TypedValue>,
        new: &TypedValue,
    ) -> Result<()>;

    /// A module attached to or detached from the bridge.
    ///
    /// Delivered for every module, not just the subscribed one.
    ///
    /// # Errors
    ///
    /// Errors are logged by the delivery worker and otherwise ignored.
    async fn on_module_changed(
        &self,
        module: &ModuleId,
        change: ModuleChange,
        info: &ModuleInfo,
    ) -> Result<()>;

    /// The bridge connection's reachability changed.
    ///
    /// # Errors
    ///
    /// Errors are logged by the delivery worker and otherwise ignored.
    async fn on_reachability_changed(&self, reachable: bool) -> Result<()>;
}
