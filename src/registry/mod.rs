// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection registry for the shared daemon connection.
//!
//! The [`ConnectionRegistry`] holds the in-memory snapshot of the modules
//! currently attached behind the bridge, plus the bridge's reachability
//! status. All reads are non-blocking; the snapshot is mutated exclusively
//! by attach/detach/reachability events applied by the
//! [`NotificationDispatcher`](crate::dispatch::NotificationDispatcher).

mod backend;
mod handle;

pub use backend::ModuleBackend;
pub use handle::{ChannelHandle, ModuleHandle, ModuleInfo};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{ChannelId, ModuleId};

/// Snapshot of the modules reachable through the shared bridge connection.
///
/// `resolve` returns `None` both for modules that were never seen and for
/// modules that have detached; callers that need to tell the two apart must
/// track detach events themselves.
///
/// # Examples
///
/// ```
/// use modbridge::registry::ConnectionRegistry;
/// use modbridge::types::ModuleId;
///
/// let registry = ConnectionRegistry::new();
/// assert!(!registry.is_reachable());
/// assert!(registry.resolve(&ModuleId::new("abc")).is_none());
/// ```
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    modules: RwLock<HashMap<ModuleId, Arc<ModuleHandle>>>,
    /// `None` until the first reachability report from the daemon.
    reachable: RwLock<Option<bool>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry with no reachability report yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a module by id.
    ///
    /// Returns `None` if the module is not currently attached. The returned
    /// handle is valid for the current use only; look it up again next time.
    #[must_use]
    pub fn resolve(&self, id: &ModuleId) -> Option<Arc<ModuleHandle>> {
        self.modules.read().get(id).cloned()
    }

    /// Resolves a channel on a currently-attached module.
    ///
    /// Returns `None` if the module is not attached or does not expose the
    /// channel.
    #[must_use]
    pub fn channel(&self, module: &ModuleId, channel: &ChannelId) -> Option<ChannelHandle> {
        let handle = self.resolve(module)?;
        handle
            .has_channel(channel)
            .then(|| ChannelHandle::new(module.clone(), channel.clone()))
    }

    /// Returns `true` if the bridge connection is currently reachable.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.reachable.read().unwrap_or(false)
    }

    /// Returns the reachability status, or `None` if the daemon has not
    /// reported one yet.
    ///
    /// Handlers use the distinction to tell "no bridge yet" from "bridge
    /// present but offline".
    #[must_use]
    pub fn reachability(&self) -> Option<bool> {
        *self.reachable.read()
    }

    /// Returns the ids of all currently-attached modules.
    #[must_use]
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.modules.read().keys().cloned().collect()
    }

    /// Returns the number of currently-attached modules.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.read().len()
    }

    /// Records a module attach, replacing any previous handle under the id.
    pub(crate) fn apply_attach(&self, id: &ModuleId, info: ModuleInfo) {
        tracing::debug!(module = %id, device_type = %info.device_type, "module attached");
        let handle = Arc::new(ModuleHandle::new(id.clone(), info));
        self.modules.write().insert(id.clone(), handle);
    }

    /// Records a module detach. Returns `true` if the module was attached.
    pub(crate) fn apply_detach(&self, id: &ModuleId) -> bool {
        let removed = self.modules.write().remove(id).is_some();
        if removed {
            tracing::debug!(module = %id, "module detached");
        }
        removed
    }

    /// Records a reachability report from the daemon.
    ///
    /// Losing reachability invalidates the whole snapshot: modules must be
    /// re-announced by the daemon once the connection comes back.
    pub(crate) fn set_reachable(&self, reachable: bool) {
        let previous = self.reachable.write().replace(reachable);
        if previous != Some(reachable) {
            tracing::info!(reachable, "bridge reachability changed");
        }
        if !reachable {
            self.modules.write().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn barometer_info() -> ModuleInfo {
        ModuleInfo::new("barometer")
            .with_channel("airpressure")
            .with_channel("temperature")
    }

    #[test]
    fn resolve_unknown_module() {
        let registry = ConnectionRegistry::new();
        assert!(registry.resolve(&ModuleId::new("abc")).is_none());
        assert_eq!(registry.module_count(), 0);
    }

    #[test]
    fn attach_then_resolve() {
        let registry = ConnectionRegistry::new();
        registry.apply_attach(&ModuleId::new("abc"), barometer_info());

        let handle = registry.resolve(&ModuleId::new("abc")).unwrap();
        assert_eq!(handle.device_type().as_str(), "barometer");
        assert_eq!(registry.module_ids(), vec![ModuleId::new("abc")]);
    }

    #[test]
    fn detach_removes_module() {
        let registry = ConnectionRegistry::new();
        registry.apply_attach(&ModuleId::new("abc"), barometer_info());

        assert!(registry.apply_detach(&ModuleId::new("abc")));
        assert!(registry.resolve(&ModuleId::new("abc")).is_none());
        // Second detach is a no-op.
        assert!(!registry.apply_detach(&ModuleId::new("abc")));
    }

    #[test]
    fn reattach_replaces_handle() {
        let registry = ConnectionRegistry::new();
        registry.apply_attach(&ModuleId::new("abc"), barometer_info());
        registry.apply_attach(&ModuleId::new("abc"), ModuleInfo::new("thermometer"));

        let handle = registry.resolve(&ModuleId::new("abc")).unwrap();
        assert_eq!(handle.device_type().as_str(), "thermometer");
        assert_eq!(registry.module_count(), 1);
    }

    #[test]
    fn channel_lookup() {
        let registry = ConnectionRegistry::new();
        registry.apply_attach(&ModuleId::new("abc"), barometer_info());

        let handle = registry
            .channel(&ModuleId::new("abc"), &ChannelId::new("airpressure"))
            .unwrap();
        assert_eq!(handle.module().as_str(), "abc");
        assert_eq!(handle.channel().as_str(), "airpressure");

        assert!(
            registry
                .channel(&ModuleId::new("abc"), &ChannelId::new("humidity"))
                .is_none()
        );
        assert!(
            registry
                .channel(&ModuleId::new("xyz"), &ChannelId::new("airpressure"))
                .is_none()
        );
    }

    #[test]
    fn reachability_starts_unreported() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.reachability(), None);
        assert!(!registry.is_reachable());

        registry.set_reachable(true);
        assert_eq!(registry.reachability(), Some(true));
        assert!(registry.is_reachable());
    }

    #[test]
    fn losing_reachability_clears_snapshot() {
        let registry = ConnectionRegistry::new();
        registry.set_reachable(true);
        registry.apply_attach(&ModuleId::new("abc"), barometer_info());

        registry.set_reachable(false);
        assert!(registry.resolve(&ModuleId::new("abc")).is_none());
        assert_eq!(registry.reachability(), Some(false));

        // Coming back reachable does not resurrect modules.
        registry.set_reachable(true);
        assert!(registry.resolve(&ModuleId::new("abc")).is_none());
    }
}
