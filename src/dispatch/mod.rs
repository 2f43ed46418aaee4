// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notification dispatch from the daemon event stream to listeners.
//!
//! The [`NotificationDispatcher`] consumes the single ordered
//! [`BridgeEvent`] stream of the shared daemon connection. Value changes are
//! routed only to the listeners subscribed to the reporting module; module
//! attach/detach and reachability changes go to every registered listener.
//! The registry snapshot is updated before fan-out, so a listener reacting
//! to an event always observes a registry that already reflects it.
//!
//! Listener callbacks run on per-listener worker tasks (see
//! [`SubscriptionTable`](crate::subscription::SubscriptionTable)), so the
//! consumption loop itself never waits on a listener.

mod event;

pub use event::{BridgeEvent, ModuleChange};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::registry::ConnectionRegistry;
use crate::subscription::{DeliveryItem, SubscriptionTable};

/// Routes bridge events to subscribed listeners.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use modbridge::dispatch::{BridgeEvent, NotificationDispatcher};
/// use modbridge::registry::{ConnectionRegistry, ModuleInfo};
/// use modbridge::subscription::SubscriptionTable;
///
/// # async fn example() {
/// let registry = Arc::new(ConnectionRegistry::new());
/// let table = Arc::new(SubscriptionTable::new());
///
/// let (tx, rx) = tokio::sync::mpsc::channel(256);
/// let dispatcher = NotificationDispatcher::new(Arc::clone(&registry), Arc::clone(&table));
/// let _task = dispatcher.spawn(rx);
///
/// // The wire-protocol integration feeds daemon events into `tx`:
/// tx.send(BridgeEvent::reachable(true)).await.unwrap();
/// tx.send(BridgeEvent::attached("abc", ModuleInfo::new("barometer")))
///     .await
///     .unwrap();
/// # }
/// ```
#[derive(Debug)]
pub struct NotificationDispatcher {
    registry: Arc<ConnectionRegistry>,
    table: Arc<SubscriptionTable>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over the given registry and subscription table.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, table: Arc<SubscriptionTable>) -> Self {
        Self { registry, table }
    }

    /// Consumes the event stream until the sender is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<BridgeEvent>) {
        tracing::debug!("notification dispatcher started");
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }
        tracing::debug!("notification dispatcher stopped");
    }

    /// Spawns the consumption loop on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(self, rx: mpsc::Receiver<BridgeEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }

    fn handle(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::ValueChanged {
                module,
                channel,
                old,
                new,
            } => {
                let listeners = self.table.listeners_for(&module);
                tracing::trace!(
                    module = %module,
                    channel = %channel,
                    value = %new,
                    listeners = listeners.len(),
                    "dispatching value change"
                );
                for handle in listeners {
                    handle.deliver(DeliveryItem::Value {
                        module: module.clone(),
                        channel: channel.clone(),
                        old: old.clone(),
                        new: new.clone(),
                    });
                }
            }
            BridgeEvent::ModuleAttached { module, info } => {
                self.registry.apply_attach(&module, info.clone());
                self.fan_out_module_change(&module, ModuleChange::Attached, info);
            }
            BridgeEvent::ModuleDetached { module, info } => {
                self.registry.apply_detach(&module);
                self.fan_out_module_change(&module, ModuleChange::Detached, info);
            }
            BridgeEvent::ReachabilityChanged { reachable } => {
                self.registry.set_reachable(reachable);
                for handle in self.table.all_listeners() {
                    handle.deliver(DeliveryItem::Reachability { reachable });
                }
            }
        }
    }

    fn fan_out_module_change(
        &self,
        module: &crate::types::ModuleId,
        change: ModuleChange,
        info: crate::registry::ModuleInfo,
    ) {
        // Every listener sees attach/detach; each filters by its own uid.
        for handle in self.table.all_listeners() {
            handle.deliver(DeliveryItem::Module {
                module: module.clone(),
                change,
                info: info.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::registry::ModuleInfo;
    use crate::subscription::{Listener, ListenerId};
    use crate::types::{ChannelId, ModuleId, TypedValue};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Value(ModuleId, ChannelId, TypedValue),
        Module(ModuleId, ModuleChange),
        Reachability(bool),
    }

    struct RecordingListener {
        id: ListenerId,
        seen: Mutex<Vec<Seen>>,
    }

    impl RecordingListener {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: ListenerId::new(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<Seen> {
            self.seen.lock().clone()
        }
    }

    #[async_trait]
    impl Listener for RecordingListener {
        fn id(&self) -> ListenerId {
            self.id
        }

        async fn on_value_changed(
            &self,
            module: &ModuleId,
            channel: &ChannelId,
            _old: Option<&TypedValue>,
            new: &TypedValue,
        ) -> Result<()> {
            self.seen
                .lock()
                .push(Seen::Value(module.clone(), channel.clone(), new.clone()));
            Ok(())
        }

        async fn on_module_changed(
            &self,
            module: &ModuleId,
            change: ModuleChange,
            _info: &ModuleInfo,
        ) -> Result<()> {
            self.seen.lock().push(Seen::Module(module.clone(), change));
            Ok(())
        }

        async fn on_reachability_changed(&self, reachable: bool) -> Result<()> {
            self.seen.lock().push(Seen::Reachability(reachable));
            Ok(())
        }
    }

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        table: Arc<SubscriptionTable>,
        tx: mpsc::Sender<BridgeEvent>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let table = Arc::new(SubscriptionTable::new());
        let (tx, rx) = mpsc::channel(64);
        NotificationDispatcher::new(Arc::clone(&registry), Arc::clone(&table)).spawn(rx);
        Fixture {
            registry,
            table,
            tx,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn value_events_are_module_scoped() {
        let f = fixture();
        let listener = RecordingListener::new();
        f.table.register(ModuleId::new("abc"), listener.clone());

        f.tx
            .send(BridgeEvent::value_changed(
                "xyz",
                "temperature",
                None,
                TypedValue::Decimal(1.0),
            ))
            .await
            .unwrap();
        f.tx
            .send(BridgeEvent::value_changed(
                "abc",
                "airpressure",
                None,
                TypedValue::Decimal(2.0),
            ))
            .await
            .unwrap();
        settle().await;

        // Zero events for the unsubscribed module id.
        assert_eq!(
            listener.seen(),
            vec![Seen::Value(
                ModuleId::new("abc"),
                ChannelId::new("airpressure"),
                TypedValue::Decimal(2.0)
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn module_changes_reach_all_listeners() {
        let f = fixture();
        let abc = RecordingListener::new();
        let xyz = RecordingListener::new();
        f.table.register(ModuleId::new("abc"), abc.clone());
        f.table.register(ModuleId::new("xyz"), xyz.clone());

        f.tx
            .send(BridgeEvent::attached("abc", ModuleInfo::new("barometer")))
            .await
            .unwrap();
        settle().await;

        let expected = Seen::Module(ModuleId::new("abc"), ModuleChange::Attached);
        assert_eq!(abc.seen(), vec![expected.clone()]);
        assert_eq!(xyz.seen(), vec![expected]);
    }

    #[tokio::test(start_paused = true)]
    async fn registry_updated_before_fan_out() {
        let f = fixture();
        f.tx
            .send(BridgeEvent::reachable(true))
            .await
            .unwrap();
        f.tx
            .send(BridgeEvent::attached("abc", ModuleInfo::new("barometer")))
            .await
            .unwrap();
        settle().await;

        assert!(f.registry.is_reachable());
        assert!(f.registry.resolve(&ModuleId::new("abc")).is_some());

        f.tx
            .send(BridgeEvent::detached("abc", ModuleInfo::new("barometer")))
            .await
            .unwrap();
        settle().await;
        assert!(f.registry.resolve(&ModuleId::new("abc")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn per_listener_order_is_preserved() {
        let f = fixture();
        let listener = RecordingListener::new();
        f.table.register(ModuleId::new("abc"), listener.clone());

        let mut previous = None;
        for i in 0..100 {
            let value = TypedValue::Decimal(f64::from(i));
            f.tx
                .send(BridgeEvent::value_changed(
                    "abc",
                    "airpressure",
                    previous.clone(),
                    value.clone(),
                ))
                .await
                .unwrap();
            previous = Some(value);
        }
        settle().await;

        let seen = listener.seen();
        assert_eq!(seen.len(), 100);
        for (i, item) in seen.iter().enumerate() {
            assert_eq!(
                *item,
                Seen::Value(
                    ModuleId::new("abc"),
                    ChannelId::new("airpressure"),
                    TypedValue::Decimal(i as f64)
                )
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_listener_does_not_affect_others() {
        struct FailingListener {
            id: ListenerId,
        }

        #[async_trait]
        impl Listener for FailingListener {
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
                Err(crate::error::Error::NotReachable)
            }

            async fn on_module_changed(
                &self,
                _module: &ModuleId,
                _change: ModuleChange,
                _info: &ModuleInfo,
            ) -> Result<()> {
                Ok(())
            }

            async fn on_reachability_changed(&self, _reachable: bool) -> Result<()> {
                Ok(())
            }
        }

        let f = fixture();
        let failing = Arc::new(FailingListener {
            id: ListenerId::new(),
        });
        let recording = RecordingListener::new();
        f.table.register(ModuleId::new("abc"), failing);
        f.table.register(ModuleId::new("abc"), recording.clone());

        for i in 0..3 {
            f.tx
                .send(BridgeEvent::value_changed(
                    "abc",
                    "airpressure",
                    None,
                    TypedValue::Decimal(f64::from(i)),
                ))
                .await
                .unwrap();
        }
        settle().await;

        assert_eq!(recording.seen().len(), 3);
    }
}
