// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription management for bridge notifications.
//!
//! This module provides the seam between the single event stream coming
//! from the daemon and the independently-managed handlers interested in it:
//!
//! - [`Listener`] - the callback interface a handler implements
//! - [`ListenerId`] - identity used for idempotent register/unregister
//! - [`SubscriptionTable`] - thread-safe (module id) → listeners mapping

mod listener;
mod table;

pub use listener::{Listener, ListenerId};
pub use table::SubscriptionTable;

pub(crate) use table::{DeliveryHandle, DeliveryItem};
