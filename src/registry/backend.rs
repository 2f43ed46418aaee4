// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Backend seam towards the module daemon.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{ChannelConfig, ChannelId, ModuleId, TypedValue};

/// Operations the bridge performs against the physical daemon.
///
/// Implementations own the wire protocol; this library treats the daemon as
/// an external collaborator. The asynchronous side of the daemon (attach,
/// detach, value-change and reachability notifications) arrives separately
/// as a [`BridgeEvent`](crate::dispatch::BridgeEvent) stream fed into the
/// [`NotificationDispatcher`](crate::dispatch::NotificationDispatcher).
///
/// Calls may fail or time out; the lifecycle controller folds such failures
/// into an offline state instead of propagating them.
#[async_trait]
pub trait ModuleBackend: Send + Sync {
    /// Pushes the channel-scoped configuration to the module.
    ///
    /// Called once per channel during the enable sequence, before the module
    /// is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon rejects the configuration or cannot be
    /// reached.
    async fn configure_channel(
        &self,
        module: &ModuleId,
        channel: &ChannelId,
        config: &ChannelConfig,
    ) -> Result<(), BackendError>;

    /// Enables the module, activating its push notifications upstream.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon rejects the operation or cannot be
    /// reached.
    async fn enable(&self, module: &ModuleId) -> Result<(), BackendError>;

    /// Disables the module, deactivating its push notifications.
    ///
    /// Invoked on handler teardown; implementations must tolerate a second
    /// disable for an already-disabled or already-detached module.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon cannot be reached.
    async fn disable(&self, module: &ModuleId) -> Result<(), BackendError>;

    /// Reads the current value of a channel on demand.
    ///
    /// Used for the catch-up read at enable time and for poll-only channels.
    ///
    /// # Errors
    ///
    /// Returns an error if the module or channel is unknown to the daemon or
    /// the read fails.
    async fn read_value(
        &self,
        module: &ModuleId,
        channel: &ChannelId,
    ) -> Result<TypedValue, BackendError>;

    /// Writes a value to an actuator channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the module or channel is unknown to the daemon or
    /// the write is rejected.
    async fn write_value(
        &self,
        module: &ModuleId,
        channel: &ChannelId,
        value: &TypedValue,
    ) -> Result<(), BackendError>;
}
