// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-handler lifecycle management.
//!
//! Each logical handler owns one [`LifecycleController`] that drives it
//! through OFFLINE → ONLINE transitions based on bridge reachability, module
//! attach/detach events and configuration validity. The controller owns the
//! enable/disable of its module and the teardown of its subscriptions.
//!
//! # States
//!
//! ```text
//! UNCONFIGURED ──► CONFIG_ERROR (terminal until reconfigured)
//! UNCONFIGURED ──► AWAITING_BRIDGE ──► BRIDGE_OFFLINE ──► ENABLING
//! ENABLING ──► ONLINE | CONFIG_ERROR | OFFLINE(not_found / enable_failed)
//! ONLINE ──► OFFLINE(gone)            (module detached)
//! any ──► DISPOSED                    (explicit teardown)
//! ```
//!
//! Transient offline states re-enter `ENABLING` on the next matching attach
//! or reachability event; there is no timed retry.

mod config;
mod controller;
mod publisher;
mod state;

pub use config::HandlerConfig;
pub use controller::LifecycleController;
pub use publisher::StatePublisher;
pub use state::{HandlerState, HandlerStatus, OfflineReason};
