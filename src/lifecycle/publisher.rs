// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Consumer-facing publish seam.

use crate::types::{ChannelId, TypedValue};

/// The consumer-side collaborator a handler publishes state to.
///
/// Implementations own the consumer's state/command model; this library only
/// pushes converted values into it and asks which channels currently matter.
/// All methods operate on in-memory consumer state and must not block.
pub trait StatePublisher: Send + Sync {
    /// Publishes a converted channel value to the consumer.
    fn publish(&self, channel: &ChannelId, value: TypedValue);

    /// Returns `true` if the consumer currently cares about the channel.
    ///
    /// Handlers skip conversion and publication for channels that are not
    /// of interest, and do not schedule polls for them.
    fn is_channel_of_interest(&self, channel: &ChannelId) -> bool;

    /// Returns a pending command for an actuator channel, if any.
    ///
    /// Drained once during the enable sequence so a command issued while
    /// the module was away is applied as soon as it is back.
    fn read_command(&self, channel: &ChannelId) -> Option<TypedValue>;
}
