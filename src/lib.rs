// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `modbridge` - bridge sensor/actuator modules to logical channel handlers.
//!
//! A population of physical modules is reachable only through one shared
//! connection to a daemon process. This library bridges those modules to a
//! set of independently-managed logical handlers, each of which locates its
//! backing module by identifier, tracks its availability, subscribes to its
//! value-change notifications, converts raw values into the consumer's
//! representation and publishes state for the channels the consumer cares
//! about.
//!
//! # Architecture
//!
//! - [`registry::ConnectionRegistry`] - in-memory snapshot of the modules
//!   currently attached behind the bridge, plus reachability status
//! - [`subscription::SubscriptionTable`] - maps module ids to interested
//!   listeners; idempotent register/unregister
//! - [`dispatch::NotificationDispatcher`] - fans the single ordered daemon
//!   event stream out to subscribed listeners, preserving per-listener order
//! - [`lifecycle::LifecycleController`] - per-handler state machine driving
//!   OFFLINE → ONLINE transitions; one generic controller parameterized by a
//!   [`descriptor::DeviceDescriptor`] serves every module type
//! - [`poll::PollScheduler`] - periodic fallback reads for channels without
//!   push notifications
//!
//! The wire protocol to the daemon and the consumer's state model stay
//! outside the library, behind the [`registry::ModuleBackend`] and
//! [`lifecycle::StatePublisher`] seams.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use modbridge::descriptor::{ChannelDescriptor, Conversion, DeviceDescriptor};
//! use modbridge::dispatch::{BridgeEvent, NotificationDispatcher};
//! use modbridge::lifecycle::{HandlerConfig, LifecycleController, StatePublisher};
//! use modbridge::poll::PollScheduler;
//! use modbridge::registry::{ConnectionRegistry, ModuleBackend};
//! use modbridge::subscription::SubscriptionTable;
//!
//! # async fn example(backend: Arc<dyn ModuleBackend>, publisher: Arc<dyn StatePublisher>) {
//! // Shared infrastructure: one registry, one table, one dispatcher.
//! let registry = Arc::new(ConnectionRegistry::new());
//! let table = Arc::new(SubscriptionTable::new());
//! let (events_tx, events_rx) = tokio::sync::mpsc::channel(256);
//! NotificationDispatcher::new(Arc::clone(&registry), Arc::clone(&table)).spawn(events_rx);
//!
//! // One descriptor per module type, one controller per handler.
//! let barometer = DeviceDescriptor::new("barometer").with_channel(
//!     ChannelDescriptor::new("airpressure")
//!         .with_conversion(Conversion::Scaled { factor: 0.01 }),
//! );
//! let handler = LifecycleController::new(
//!     HandlerConfig::new("abc"),
//!     barometer,
//!     Arc::clone(&registry),
//!     Arc::clone(&table),
//!     backend,
//!     publisher,
//!     PollScheduler::new(),
//! );
//! handler.attach().await;
//!
//! // The wire-protocol integration feeds daemon events into `events_tx`;
//! // the handler goes online once its module attaches.
//! events_tx.send(BridgeEvent::reachable(true)).await.unwrap();
//! # }
//! ```

pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod poll;
pub mod registry;
pub mod subscription;
pub mod types;

pub use descriptor::{ChannelDescriptor, Conversion, DeviceDescriptor};
pub use dispatch::{BridgeEvent, ModuleChange, NotificationDispatcher};
pub use error::{BackendError, ConfigError, Error, Result};
pub use lifecycle::{
    HandlerConfig, HandlerState, HandlerStatus, LifecycleController, OfflineReason, StatePublisher,
};
pub use poll::{PollHandle, PollScheduler};
pub use registry::{ChannelHandle, ConnectionRegistry, ModuleBackend, ModuleHandle, ModuleInfo};
pub use subscription::{Listener, ListenerId, SubscriptionTable};
pub use types::{ChannelConfig, ChannelId, DeviceType, LevelState, ModuleId, OnOff, TypedValue};
