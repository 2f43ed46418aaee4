// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handler lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a handler is offline while the bridge itself is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineReason {
    /// The configured module is not present in the registry.
    NotFound,
    /// The module detached while the handler was online.
    Gone,
    /// A configure or enable call to the backend failed.
    EnableFailed,
}

impl OfflineReason {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Gone => "gone",
            Self::EnableFailed => "enable_failed",
        }
    }
}

impl fmt::Display for OfflineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of one handler's lifecycle.
///
/// Transitions are driven by the handler's own `attach`/`dispose` calls and
/// by bridge events (module attach/detach, reachability changes). Failures
/// never surface as errors from the controller; they fold into one of these
/// states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerState {
    /// Not yet attached, or reset by reconfiguration.
    Unconfigured,
    /// Invalid configuration or wrong module type. Terminal until the
    /// handler is explicitly reconfigured.
    ConfigError,
    /// The daemon has not reported any connection status yet.
    AwaitingBridge,
    /// The bridge is present but currently unreachable.
    BridgeOffline,
    /// The enable sequence is running.
    Enabling,
    /// The module is resolved, configured, enabled and subscribed.
    Online,
    /// The bridge is reachable but the module is not usable.
    Offline(OfflineReason),
    /// The handler has been torn down. Terminal.
    Disposed,
}

impl HandlerState {
    /// Returns `true` if the handler is online.
    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    /// Returns `true` if no event-driven retry may leave this state.
    ///
    /// `ConfigError` requires explicit reconfiguration; `Disposed` is final.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ConfigError | Self::Disposed)
    }

    /// Returns `true` if an attach or reachability event should trigger a
    /// new enable attempt from this state.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AwaitingBridge | Self::BridgeOffline | Self::Offline(_)
        )
    }
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "UNCONFIGURED"),
            Self::ConfigError => write!(f, "CONFIG_ERROR"),
            Self::AwaitingBridge => write!(f, "AWAITING_BRIDGE"),
            Self::BridgeOffline => write!(f, "BRIDGE_OFFLINE"),
            Self::Enabling => write!(f, "ENABLING"),
            Self::Online => write!(f, "ONLINE"),
            Self::Offline(reason) => write!(f, "OFFLINE({reason})"),
            Self::Disposed => write!(f, "DISPOSED"),
        }
    }
}

/// Observable status of a handler: the state plus a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerStatus {
    /// The lifecycle state.
    pub state: HandlerState,
    /// Detail for consumers (e.g. the configuration error message).
    pub detail: Option<String>,
}

impl HandlerStatus {
    /// Creates a status without detail.
    #[must_use]
    pub fn new(state: HandlerState) -> Self {
        Self {
            state,
            detail: None,
        }
    }

    /// Attaches a detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl Default for HandlerStatus {
    fn default() -> Self {
        Self::new(HandlerState::Unconfigured)
    }
}

impl fmt::Display for HandlerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self.state),
            None => write!(f, "{}", self.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(HandlerState::ConfigError.is_terminal());
        assert!(HandlerState::Disposed.is_terminal());
        assert!(!HandlerState::Offline(OfflineReason::Gone).is_terminal());
        assert!(!HandlerState::Online.is_terminal());
    }

    #[test]
    fn retryable_states() {
        assert!(HandlerState::AwaitingBridge.is_retryable());
        assert!(HandlerState::BridgeOffline.is_retryable());
        assert!(HandlerState::Offline(OfflineReason::NotFound).is_retryable());
        assert!(!HandlerState::ConfigError.is_retryable());
        assert!(!HandlerState::Online.is_retryable());
        assert!(!HandlerState::Disposed.is_retryable());
    }

    #[test]
    fn state_display() {
        assert_eq!(HandlerState::Online.to_string(), "ONLINE");
        assert_eq!(
            HandlerState::Offline(OfflineReason::Gone).to_string(),
            "OFFLINE(gone)"
        );
    }

    #[test]
    fn status_display_with_detail() {
        let status =
            HandlerStatus::new(HandlerState::ConfigError).with_detail("module uid is not configured");
        assert_eq!(
            status.to_string(),
            "CONFIG_ERROR: module uid is not configured"
        );
    }
}
