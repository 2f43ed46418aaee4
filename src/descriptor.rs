// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device-type descriptors.
//!
//! A [`DeviceDescriptor`] tells the generic
//! [`LifecycleController`](crate::lifecycle::LifecycleController) everything
//! it needs to know about one module type: the expected device type tag, the
//! channels the type exposes, and how each channel's raw value maps to the
//! consumer's representation. One descriptor replaces one hand-written
//! handler class; the controller itself stays device-agnostic.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use modbridge::descriptor::{ChannelDescriptor, Conversion, DeviceDescriptor};
//!
//! let barometer = DeviceDescriptor::new("barometer")
//!     .with_channel(
//!         ChannelDescriptor::new("airpressure")
//!             .with_conversion(Conversion::Scaled { factor: 0.01 }),
//!     )
//!     .with_channel(
//!         ChannelDescriptor::new("temperature")
//!             .with_conversion(Conversion::Scaled { factor: 0.01 })
//!             .with_poll_interval(Duration::from_secs(30)),
//!     );
//!
//! assert!(barometer.channel(&"airpressure".into()).is_some());
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{ChannelId, DeviceType, TypedValue};

/// Function mapping a raw value to the consumer representation.
pub type ConvertFn = Arc<dyn Fn(&TypedValue) -> TypedValue + Send + Sync>;

/// Conversion rule from a raw channel value to the consumer representation.
///
/// Looked up once per channel and applied uniformly, instead of branching on
/// channel ids at every notification.
#[derive(Clone)]
pub enum Conversion {
    /// Pass the raw value through unchanged.
    Identity,
    /// Multiply decimal values by a factor (e.g. Pa to hPa with `0.01`).
    /// Non-decimal values pass through unchanged.
    Scaled {
        /// The factor applied to decimal values.
        factor: f64,
    },
    /// Arbitrary caller-supplied conversion.
    Custom(ConvertFn),
}

impl Conversion {
    /// Applies the conversion to a raw value.
    #[must_use]
    pub fn apply(&self, raw: &TypedValue) -> TypedValue {
        match self {
            Self::Identity => raw.clone(),
            Self::Scaled { factor } => match raw {
                TypedValue::Decimal(v) => TypedValue::Decimal(v * factor),
                other => other.clone(),
            },
            Self::Custom(f) => f(raw),
        }
    }
}

impl Default for Conversion {
    fn default() -> Self {
        Self::Identity
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "Identity"),
            Self::Scaled { factor } => write!(f, "Scaled({factor})"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Description of one channel of a module type.
#[derive(Debug, Clone)]
pub struct ChannelDescriptor {
    id: ChannelId,
    conversion: Conversion,
    poll_interval: Option<Duration>,
}

impl ChannelDescriptor {
    /// Creates a descriptor with identity conversion and no polling.
    #[must_use]
    pub fn new(id: impl Into<ChannelId>) -> Self {
        Self {
            id: id.into(),
            conversion: Conversion::Identity,
            poll_interval: None,
        }
    }

    /// Sets the conversion rule for this channel.
    #[must_use]
    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = conversion;
        self
    }

    /// Marks this channel as poll-only with the given refresh interval.
    ///
    /// Channels without a poll interval rely on push notifications.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Returns the channel id.
    #[must_use]
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    /// Returns the conversion rule.
    #[must_use]
    pub fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    /// Returns the poll interval, if this channel is poll-only.
    #[must_use]
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }
}

/// Static description of one module type.
///
/// Holds the expected device type tag and the ordered channel table. The
/// concrete descriptors for real module types live with the caller; this
/// library only defines the shape.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    device_type: DeviceType,
    channels: Vec<ChannelDescriptor>,
}

impl DeviceDescriptor {
    /// Creates a descriptor for the given device type with no channels.
    #[must_use]
    pub fn new(device_type: impl Into<DeviceType>) -> Self {
        Self {
            device_type: device_type.into(),
            channels: Vec::new(),
        }
    }

    /// Adds a channel to the descriptor.
    #[must_use]
    pub fn with_channel(mut self, channel: ChannelDescriptor) -> Self {
        self.channels.push(channel);
        self
    }

    /// Returns the expected device type tag.
    #[must_use]
    pub fn device_type(&self) -> &DeviceType {
        &self.device_type
    }

    /// Returns the channels in declaration order.
    #[must_use]
    pub fn channels(&self) -> &[ChannelDescriptor] {
        &self.channels
    }

    /// Looks up a channel by id.
    #[must_use]
    pub fn channel(&self, id: &ChannelId) -> Option<&ChannelDescriptor> {
        self.channels.iter().find(|c| c.id() == id)
    }
}
