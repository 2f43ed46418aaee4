// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `modbridge` library.
//!
//! This module provides the error hierarchy for failures across the library:
//! handler configuration, backend communication with the daemon, and module
//! resolution. Lifecycle outcomes (bridge offline, module gone) are not
//! errors; they are folded into [`HandlerState`](crate::lifecycle::HandlerState)
//! so consumers can distinguish "broken" from "temporarily unavailable".

use thiserror::Error;

use crate::types::{ChannelId, DeviceType, ModuleId};

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Handler configuration is invalid. Terminal until reconfigured.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A call to the module backend failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// The module is not present in the connection registry.
    #[error("module {0} not found")]
    ModuleNotFound(ModuleId),

    /// The bridge connection to the daemon is not reachable.
    #[error("bridge is not reachable")]
    NotReachable,

    /// The handler has been disposed and accepts no further operations.
    #[error("handler is disposed")]
    Disposed,
}

/// Errors related to handler configuration.
///
/// These are terminal: a handler that hits one of these stays in
/// `ConfigError` state until it is explicitly reconfigured.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No module uid was configured for the handler.
    #[error("module uid is not configured")]
    MissingModuleUid,

    /// The resolved module has a different device type than expected.
    #[error("expected module type '{expected}', found '{actual}'")]
    WrongModuleType {
        /// The device type the handler's descriptor expects.
        expected: DeviceType,
        /// The device type the module actually reported.
        actual: DeviceType,
    },

    /// A configured channel does not exist in the device descriptor.
    #[error("unknown channel: {0}")]
    UnknownChannel(ChannelId),
}

/// Errors reported by a [`ModuleBackend`](crate::registry::ModuleBackend)
/// implementation.
///
/// These are transient from the lifecycle's point of view: an enable or
/// configure failure sends the handler offline, and a later attach or
/// reachability event triggers another attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Communication with the daemon failed.
    #[error("daemon communication failed: {0}")]
    Io(String),

    /// The call did not complete in time.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The daemon rejected the operation.
    #[error("operation rejected: {0}")]
    Rejected(String),

    /// The daemon no longer knows the addressed module or channel.
    #[error("unknown target: {0}")]
    UnknownTarget(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
