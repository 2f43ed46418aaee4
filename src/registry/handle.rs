// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Module and channel handles.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, DeviceType, ModuleId};

/// Static information about a module, carried by attach events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// The module's device type tag.
    pub device_type: DeviceType,
    /// The channels the module exposes.
    pub channels: Vec<ChannelId>,
}

impl ModuleInfo {
    /// Creates module info with no channels.
    #[must_use]
    pub fn new(device_type: impl Into<DeviceType>) -> Self {
        Self {
            device_type: device_type.into(),
            channels: Vec::new(),
        }
    }

    /// Adds a channel to the info.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<ChannelId>) -> Self {
        self.channels.push(channel.into());
        self
    }

    /// Returns `true` if the module exposes the given channel.
    #[must_use]
    pub fn has_channel(&self, channel: &ChannelId) -> bool {
        self.channels.contains(channel)
    }
}

/// A currently-attached module.
///
/// Handles are owned exclusively by the
/// [`ConnectionRegistry`](crate::registry::ConnectionRegistry); callers look
/// them up by [`ModuleId`] on every use and must not retain them across
/// uses, because the registry replaces or drops the handle when the module
/// detaches or reattaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    id: ModuleId,
    info: ModuleInfo,
}

impl ModuleHandle {
    pub(crate) fn new(id: ModuleId, info: ModuleInfo) -> Self {
        Self { id, info }
    }

    /// Returns the module id.
    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Returns the module's device type tag.
    #[must_use]
    pub fn device_type(&self) -> &DeviceType {
        &self.info.device_type
    }

    /// Returns the channels the module exposes.
    #[must_use]
    pub fn channels(&self) -> &[ChannelId] {
        &self.info.channels
    }

    /// Returns `true` if the module exposes the given channel.
    #[must_use]
    pub fn has_channel(&self, channel: &ChannelId) -> bool {
        self.info.has_channel(channel)
    }

    /// Returns the full module info.
    #[must_use]
    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }
}

/// Address of one channel on a currently-attached module.
///
/// Like [`ModuleHandle`], valid only for the current use; look it up again
/// before each read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    module: ModuleId,
    channel: ChannelId,
}

impl ChannelHandle {
    pub(crate) fn new(module: ModuleId, channel: ChannelId) -> Self {
        Self { module, channel }
    }

    /// Returns the owning module's id.
    #[must_use]
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Returns the channel id.
    #[must_use]
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_info_channels() {
        let info = ModuleInfo::new("barometer")
            .with_channel("airpressure")
            .with_channel("temperature");

        assert!(info.has_channel(&"airpressure".into()));
        assert!(!info.has_channel(&"humidity".into()));
    }

    #[test]
    fn module_handle_accessors() {
        let info = ModuleInfo::new("barometer").with_channel("airpressure");
        let handle = ModuleHandle::new(ModuleId::new("abc"), info.clone());

        assert_eq!(handle.id().as_str(), "abc");
        assert_eq!(handle.device_type().as_str(), "barometer");
        assert_eq!(handle.channels().len(), 1);
        assert_eq!(handle.info(), &info);
    }
}
