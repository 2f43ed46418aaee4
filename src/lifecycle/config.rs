// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handler configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{ChannelConfig, ChannelId, ModuleId};

/// Configuration of one handler: which module it owns and what per-channel
/// configuration to push at enable time.
///
/// # Examples
///
/// ```
/// use modbridge::lifecycle::HandlerConfig;
/// use modbridge::types::ChannelConfig;
///
/// let config = HandlerConfig::new("abc")
///     .with_channel_config("airpressure", ChannelConfig::new().with("averaging", 25));
///
/// assert_eq!(config.module_id().as_str(), "abc");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Uid of the module this handler owns.
    pub module_uid: String,
    /// Channel-scoped configuration, applied once at enable time.
    #[serde(default)]
    pub channel_configs: Vec<(ChannelId, ChannelConfig)>,
}

impl HandlerConfig {
    /// Creates a configuration for the given module uid.
    #[must_use]
    pub fn new(module_uid: impl Into<String>) -> Self {
        Self {
            module_uid: module_uid.into(),
            channel_configs: Vec::new(),
        }
    }

    /// Adds configuration for one channel.
    #[must_use]
    pub fn with_channel_config(
        mut self,
        channel: impl Into<ChannelId>,
        config: ChannelConfig,
    ) -> Self {
        self.channel_configs.push((channel.into(), config));
        self
    }

    /// Returns the configured module id.
    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        ModuleId::new(self.module_uid.clone())
    }

    /// Returns the configuration for one channel, if any.
    #[must_use]
    pub fn channel_config(&self, channel: &ChannelId) -> Option<&ChannelConfig> {
        self.channel_configs
            .iter()
            .find(|(id, _)| id == channel)
            .map(|(_, config)| config)
    }

    /// Checks the configuration for structural validity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingModuleUid`] if the uid is empty or
    /// whitespace-only.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.module_uid.trim().is_empty() {
            return Err(ConfigError::MissingModuleUid);
        }
        Ok(())
    }
}
