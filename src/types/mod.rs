// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value and channel model types.
//!
//! This module provides the identifiers and wire-level value representation
//! shared by all bridge components: [`ModuleId`], [`ChannelId`] and
//! [`DeviceType`] for addressing, [`TypedValue`] for raw channel values, and
//! [`ChannelConfig`] for the channel-scoped configuration a handler pushes
//! at enable time.

mod channel_config;
mod ids;
mod value;

pub use channel_config::ChannelConfig;
pub use ids::{ChannelId, DeviceType, ModuleId};
pub use value::{LevelState, OnOff, TypedValue};
