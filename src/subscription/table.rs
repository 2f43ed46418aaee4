// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription table mapping modules to interested listeners.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::dispatch::ModuleChange;
use crate::registry::ModuleInfo;
use crate::types::{ChannelId, ModuleId, TypedValue};

use super::listener::{Listener, ListenerId};

/// One queued notification for a single listener.
#[derive(Debug, Clone)]
pub(crate) enum DeliveryItem {
    /// A value change on a subscribed module.
    Value {
        module: ModuleId,
        channel: ChannelId,
        old: Option<TypedValue>,
        new: TypedValue,
    },
    /// A module attach or detach.
    Module {
        module: ModuleId,
        change: ModuleChange,
        info: ModuleInfo,
    },
    /// A bridge reachability change.
    Reachability { reachable: bool },
}

/// Sending side of one listener's delivery queue.
///
/// The active flag is shared with the worker: unregister clears it, and the
/// worker re-checks it before every callback, so items already queued at
/// unregister time are dropped rather than delivered.
#[derive(Clone)]
pub(crate) struct DeliveryHandle {
    id: ListenerId,
    tx: mpsc::UnboundedSender<DeliveryItem>,
    active: Arc<AtomicBool>,
}

impl DeliveryHandle {
    pub(crate) fn listener_id(&self) -> ListenerId {
        self.id
    }

    /// Enqueues an item for the listener's worker. Never blocks.
    pub(crate) fn deliver(&self, item: DeliveryItem) {
        if self.active.load(Ordering::Acquire) {
            // Send failure means the worker is gone; nothing to deliver to.
            let _ = self.tx.send(item);
        }
    }
}

struct ListenerEntry {
    handle: DeliveryHandle,
}

impl ListenerEntry {
    fn deactivate(&self) {
        self.handle.active.store(false, Ordering::Release);
    }
}

/// Thread-safe mapping from module id to interested listeners.
///
/// Registration and unregistration are idempotent and safe to call
/// concurrently with dispatch: the dispatcher always observes an atomic
/// snapshot of the listener set per module id. Each registered listener gets
/// a dedicated single-threaded worker task, which preserves per-listener
/// delivery order and keeps a slow or failing listener from blocking anyone
/// else.
#[derive(Default)]
pub struct SubscriptionTable {
    // Vec keeps insertion order; sets per module are small (usually one).
    inner: RwLock<HashMap<ModuleId, Vec<ListenerEntry>>>,
}

impl SubscriptionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for a module.
    ///
    /// Idempotent: registering a listener that is already registered for the
    /// module is a no-op. Spawns the listener's delivery worker on the
    /// current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn register(&self, module: ModuleId, listener: Arc<dyn Listener>) {
        let id = listener.id();
        let mut inner = self.inner.write();
        let entries = inner.entry(module.clone()).or_default();
        if entries.iter().any(|e| e.handle.listener_id() == id) {
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(true));
        spawn_worker(listener, rx, Arc::clone(&active));

        tracing::debug!(listener = %id, module = %module, "listener registered");
        entries.push(ListenerEntry {
            handle: DeliveryHandle { id, tx, active },
        });
    }

    /// Unregisters a listener from a module.
    ///
    /// Idempotent: unregistering an absent listener is a no-op. Once this
    /// returns, no further callback is invoked for the listener, including
    /// for notifications that were already queued.
    ///
    /// Returns `true` if the listener was registered.
    pub fn unregister(&self, module: &ModuleId, id: ListenerId) -> bool {
        let mut inner = self.inner.write();
        let Some(entries) = inner.get_mut(module) else {
            return false;
        };
        let Some(pos) = entries
            .iter()
            .position(|e| e.handle.listener_id() == id)
        else {
            return false;
        };

        let entry = entries.remove(pos);
        entry.deactivate();
        if entries.is_empty() {
            inner.remove(module);
        }
        tracing::debug!(listener = %id, module = %module, "listener unregistered");
        true
    }

    /// Returns a snapshot of the delivery handles for one module, in
    /// registration order.
    pub(crate) fn listeners_for(&self, module: &ModuleId) -> Vec<DeliveryHandle> {
        self.inner
            .read()
            .get(module)
            .map(|entries| entries.iter().map(|e| e.handle.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns a snapshot of every registered listener's delivery handle,
    /// deduplicated by listener id.
    ///
    /// Used for module attach/detach and reachability fan-out, which is not
    /// filtered by module id.
    pub(crate) fn all_listeners(&self) -> Vec<DeliveryHandle> {
        let inner = self.inner.read();
        let mut seen = HashMap::new();
        for entries in inner.values() {
            for entry in entries {
                seen.entry(entry.handle.listener_id())
                    .or_insert_with(|| entry.handle.clone());
            }
        }
        seen.into_values().collect()
    }

    /// Returns the number of listeners registered for a module.
    #[must_use]
    pub fn listener_count(&self, module: &ModuleId) -> usize {
        self.inner.read().get(module).map_or(0, Vec::len)
    }

    /// Returns `true` if no listener is registered for any module.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl std::fmt::Debug for SubscriptionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("SubscriptionTable")
            .field("modules", &inner.len())
            .field(
                "listeners",
                &inner.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

/// Runs one listener's delivery loop until its queue closes or it is
/// deactivated.
fn spawn_worker(
    listener: Arc<dyn Listener>,
    mut rx: mpsc::UnboundedReceiver<DeliveryItem>,
    active: Arc<AtomicBool>,
) {
    tokio::spawn(async move {
        let id = listener.id();
        while let Some(item) = rx.recv().await {
            if !active.load(Ordering::Acquire) {
                break;
            }
            let result = match &item {
                DeliveryItem::Value {
                    module,
                    channel,
                    old,
                    new,
                } => {
                    listener
                        .on_value_changed(module, channel, old.as_ref(), new)
                        .await
                }
                DeliveryItem::Module {
                    module,
                    change,
                    info,
                } => listener.on_module_changed(module, *change, info).await,
                DeliveryItem::Reachability { reachable } => {
                    listener.on_reachability_changed(*reachable).await
                }
            };
            if let Err(error) = result {
                tracing::warn!(listener = %id, %error, "listener callback failed");
            }
        }
        tracing::debug!(listener = %id, "delivery worker stopped");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    struct CountingListener {
        id: ListenerId,
        values: AtomicU32,
        module_changes: AtomicU32,
    }

    impl CountingListener {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: ListenerId::new(),
                values: AtomicU32::new(0),
                module_changes: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Listener for CountingListener {
        fn id(&self) -> ListenerId {
            self.id
        }

        async fn on_value_changed(
            &self,
            _module: &ModuleId,
            _channel: &ChannelId,
            _old: Option<&TypedValue>,
            _new: &TypedValue,
        ) -> Result<()> {
            self.values.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_module_changed(
            &self,
            _module: &ModuleId,
            _change: ModuleChange,
            _info: &ModuleInfo,
        ) -> Result<()> {
            self.module_changes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_reachability_changed(&self, _reachable: bool) -> Result<()> {
            Ok(())
        }
    }

    fn value_item(module: &str) -> DeliveryItem {
        DeliveryItem::Value {
            module: ModuleId::new(module),
            channel: ChannelId::new("temperature"),
            old: None,
            new: TypedValue::Decimal(21.5),
        }
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let table = SubscriptionTable::new();
        let listener = CountingListener::new();
        let module = ModuleId::new("abc");

        table.register(module.clone(), listener.clone());
        table.register(module.clone(), listener.clone());

        assert_eq!(table.listener_count(&module), 1);
        assert_eq!(table.listeners_for(&module).len(), 1);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let table = SubscriptionTable::new();
        let listener = CountingListener::new();
        let module = ModuleId::new("abc");

        table.register(module.clone(), listener.clone());
        assert!(table.unregister(&module, listener.id()));
        assert!(!table.unregister(&module, listener.id()));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn listeners_for_is_module_scoped() {
        let table = SubscriptionTable::new();
        let listener = CountingListener::new();
        table.register(ModuleId::new("abc"), listener);

        assert_eq!(table.listeners_for(&ModuleId::new("abc")).len(), 1);
        assert!(table.listeners_for(&ModuleId::new("xyz")).is_empty());
    }

    #[tokio::test]
    async fn all_listeners_deduplicates() {
        let table = SubscriptionTable::new();
        let listener = CountingListener::new();
        table.register(ModuleId::new("abc"), listener.clone());
        table.register(ModuleId::new("xyz"), listener);

        assert_eq!(table.all_listeners().len(), 1);
    }

    #[tokio::test]
    async fn delivery_reaches_listener() {
        let table = SubscriptionTable::new();
        let listener = CountingListener::new();
        let module = ModuleId::new("abc");
        table.register(module.clone(), listener.clone());

        for handle in table.listeners_for(&module) {
            handle.deliver(value_item("abc"));
        }

        tokio::task::yield_now().await;
        for _ in 0..50 {
            if listener.values.load(Ordering::SeqCst) == 1 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        panic!("value notification was not delivered");
    }

    #[tokio::test]
    async fn no_delivery_after_unregister() {
        let table = SubscriptionTable::new();
        let listener = CountingListener::new();
        let module = ModuleId::new("abc");
        table.register(module.clone(), listener.clone());

        // Grab a stale handle, then unregister before delivering through it.
        let stale = table.listeners_for(&module);
        table.unregister(&module, listener.id());
        for handle in stale {
            handle.deliver(value_item("abc"));
        }

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(listener.values.load(Ordering::SeqCst), 0);
    }
}
