// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-handler lifecycle state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::descriptor::DeviceDescriptor;
use crate::dispatch::ModuleChange;
use crate::error::{BackendError, ConfigError, Result};
use crate::poll::{PollHandle, PollScheduler};
use crate::registry::{ConnectionRegistry, ModuleBackend, ModuleHandle, ModuleInfo};
use crate::subscription::{Listener, ListenerId, SubscriptionTable};
use crate::types::{ChannelId, ModuleId, TypedValue};

use super::config::HandlerConfig;
use super::publisher::StatePublisher;
use super::state::{HandlerState, HandlerStatus, OfflineReason};

/// Drives one handler through its lifecycle.
///
/// The controller is generic over a [`DeviceDescriptor`]: one controller
/// implementation serves every module type, parameterized by the expected
/// type tag, the channel table and the per-channel conversion rules.
///
/// The controller implements [`Listener`] and reacts to bridge events on its
/// own delivery worker: an attach of its configured module (or the bridge
/// becoming reachable) from a transient state triggers a new enable attempt;
/// a detach while online sends it to `OFFLINE(gone)`. Failures never cross
/// the public boundary as errors; they fold into the observable
/// [`HandlerStatus`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use modbridge::descriptor::{ChannelDescriptor, Conversion, DeviceDescriptor};
/// use modbridge::lifecycle::{HandlerConfig, LifecycleController};
/// # use modbridge::lifecycle::StatePublisher;
/// # use modbridge::poll::PollScheduler;
/// # use modbridge::registry::{ConnectionRegistry, ModuleBackend};
/// # use modbridge::subscription::SubscriptionTable;
/// # async fn example(
/// #     registry: Arc<ConnectionRegistry>,
/// #     table: Arc<SubscriptionTable>,
/// #     backend: Arc<dyn ModuleBackend>,
/// #     publisher: Arc<dyn StatePublisher>,
/// # ) {
/// let descriptor = DeviceDescriptor::new("barometer").with_channel(
///     ChannelDescriptor::new("airpressure").with_conversion(Conversion::Scaled { factor: 0.01 }),
/// );
///
/// let controller = LifecycleController::new(
///     HandlerConfig::new("abc"),
///     descriptor,
///     registry,
///     table,
///     backend,
///     publisher,
///     PollScheduler::new(),
/// );
/// controller.attach().await;
///
/// let status = controller.status();
/// println!("handler is {status}");
/// # }
/// ```
pub struct LifecycleController {
    id: ListenerId,
    /// Back-reference for registering `self` as a listener.
    self_ref: Weak<LifecycleController>,
    config: Mutex<HandlerConfig>,
    descriptor: DeviceDescriptor,
    registry: Arc<ConnectionRegistry>,
    table: Arc<SubscriptionTable>,
    backend: Arc<dyn ModuleBackend>,
    publisher: Arc<dyn StatePublisher>,
    scheduler: PollScheduler,
    status_tx: watch::Sender<HandlerStatus>,
    /// Serializes the enable sequence against teardown and reconfiguration.
    enable_gate: tokio::sync::Mutex<()>,
    disposed: AtomicBool,
    polls: Mutex<Vec<PollHandle>>,
}

impl LifecycleController {
    /// Creates a controller for one handler.
    ///
    /// The controller does nothing until [`attach`](Self::attach) is called.
    #[must_use]
    pub fn new(
        config: HandlerConfig,
        descriptor: DeviceDescriptor,
        registry: Arc<ConnectionRegistry>,
        table: Arc<SubscriptionTable>,
        backend: Arc<dyn ModuleBackend>,
        publisher: Arc<dyn StatePublisher>,
        scheduler: PollScheduler,
    ) -> Arc<Self> {
        let (status_tx, _) = watch::channel(HandlerStatus::default());
        Arc::new_cyclic(|self_ref| Self {
            id: ListenerId::new(),
            self_ref: self_ref.clone(),
            config: Mutex::new(config),
            descriptor,
            registry,
            table,
            backend,
            publisher,
            scheduler,
            status_tx,
            enable_gate: tokio::sync::Mutex::new(()),
            disposed: AtomicBool::new(false),
            polls: Mutex::new(Vec::new()),
        })
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> HandlerStatus {
        self.status_tx.borrow().clone()
    }

    /// Returns a receiver observing every status change.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<HandlerStatus> {
        self.status_tx.subscribe()
    }

    /// Returns the configured module id.
    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.config.lock().module_id()
    }

    /// Returns this controller's listener identity.
    #[must_use]
    pub fn listener_id(&self) -> ListenerId {
        self.id
    }

    /// Attaches the handler to the bridge.
    ///
    /// Validates the configuration, registers with the subscription table
    /// and attempts the enable sequence. The outcome is observable through
    /// [`status`](Self::status); this method never fails.
    pub async fn attach(&self) {
        if self.is_disposed() {
            return;
        }
        let (module_id, validation) = {
            let config = self.config.lock();
            (config.module_id(), config.validate())
        };
        if let Err(error) = validation {
            self.set_status(
                HandlerStatus::new(HandlerState::ConfigError).with_detail(error.to_string()),
            );
            return;
        }
        if let Some(listener) = self.listener() {
            self.table.register(module_id, listener);
        }
        self.try_enable().await;
    }

    /// Replaces the configuration and re-attaches.
    ///
    /// This is the only exit from `CONFIG_ERROR`.
    pub async fn reconfigure(&self, new_config: HandlerConfig) {
        if self.is_disposed() {
            return;
        }
        let old_module = {
            let mut config = self.config.lock();
            let old = config.module_id();
            *config = new_config;
            old
        };
        self.cancel_polls();
        if old_module != self.module_id() {
            self.table.unregister(&old_module, self.id);
        }
        self.set_status(HandlerStatus::new(HandlerState::Unconfigured));
        self.attach().await;
    }

    /// Tears the handler down.
    ///
    /// Idempotent: detach events racing an explicit dispose result in
    /// exactly one unregister/disable effect. The subscription is removed
    /// before this returns, so no notification is delivered afterwards.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _gate = self.enable_gate.lock().await;

        let module_id = self.module_id();
        self.table.unregister(&module_id, self.id);
        self.cancel_polls();

        // Best effort: the module may already be detached.
        if self.registry.resolve(&module_id).is_some() {
            if let Err(error) = self.backend.disable(&module_id).await {
                tracing::debug!(module = %module_id, %error, "disable on teardown failed");
            }
        }

        self.set_status(HandlerStatus::new(HandlerState::Disposed));
        tracing::info!(module = %module_id, "handler disposed");
    }

    /// Returns `true` if the handler has been torn down.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    // =========================================================================
    // Enable sequence
    // =========================================================================

    /// Runs the enable sequence: resolve, type-check, configure, enable,
    /// subscribe, catch up, schedule polls.
    async fn try_enable(&self) {
        if self.is_disposed() {
            return;
        }
        let _gate = self.enable_gate.lock().await;
        if self.is_disposed() || self.state().is_terminal() {
            return;
        }

        match self.registry.reachability() {
            None => {
                self.set_status(HandlerStatus::new(HandlerState::AwaitingBridge));
                return;
            }
            Some(false) => {
                self.set_status(HandlerStatus::new(HandlerState::BridgeOffline));
                return;
            }
            Some(true) => {}
        }

        let module_id = self.module_id();
        self.set_status(HandlerStatus::new(HandlerState::Enabling));

        let Some(module) = self.registry.resolve(&module_id) else {
            self.set_status(
                HandlerStatus::new(HandlerState::Offline(OfflineReason::NotFound))
                    .with_detail(format!("module {module_id} not found")),
            );
            return;
        };

        if module.device_type() != self.descriptor.device_type() {
            let error = ConfigError::WrongModuleType {
                expected: self.descriptor.device_type().clone(),
                actual: module.device_type().clone(),
            };
            tracing::warn!(module = %module_id, %error, "module type mismatch");
            self.set_status(
                HandlerStatus::new(HandlerState::ConfigError).with_detail(error.to_string()),
            );
            return;
        }

        // Push channel configuration for every descriptor channel the
        // module actually exposes.
        for channel in self.descriptor.channels() {
            if !module.has_channel(channel.id()) {
                continue;
            }
            let config = self
                .config
                .lock()
                .channel_config(channel.id())
                .cloned()
                .unwrap_or_default();
            if let Err(error) = self
                .backend
                .configure_channel(&module_id, channel.id(), &config)
                .await
            {
                self.fail_enable(&module_id, "channel configuration failed", &error);
                return;
            }
        }

        if let Err(error) = self.backend.enable(&module_id).await {
            self.fail_enable(&module_id, "module enable failed", &error);
            return;
        }

        if self.is_disposed() {
            return;
        }
        if let Some(listener) = self.listener() {
            self.table.register(module_id.clone(), listener);
        }

        // Catch-up read of every channel of interest, so the consumer sees
        // current values even before the first push notification. Idempotent
        // with pushes that may already be in flight.
        for channel in self.descriptor.channels() {
            if !module.has_channel(channel.id())
                || !self.publisher.is_channel_of_interest(channel.id())
            {
                continue;
            }
            match self.backend.read_value(&module_id, channel.id()).await {
                Ok(raw) => self
                    .publisher
                    .publish(channel.id(), channel.conversion().apply(&raw)),
                Err(error) => {
                    tracing::warn!(module = %module_id, channel = %channel.id(), %error, "catch-up read failed");
                }
            }
            // Apply a command that queued up while the module was away.
            if let Some(command) = self.publisher.read_command(channel.id()) {
                if let Err(error) = self
                    .backend
                    .write_value(&module_id, channel.id(), &command)
                    .await
                {
                    tracing::warn!(module = %module_id, channel = %channel.id(), %error, "pending command failed");
                }
            }
        }

        self.schedule_polls(&module_id, &module);

        if self.is_disposed() {
            self.cancel_polls();
            return;
        }
        if !self.registry.is_reachable() {
            // Bridge dropped mid-enable.
            self.cancel_polls();
            self.set_status(HandlerStatus::new(HandlerState::BridgeOffline));
            return;
        }
        self.set_status(HandlerStatus::new(HandlerState::Online));
    }

    fn fail_enable(&self, module_id: &ModuleId, context: &'static str, error: &BackendError) {
        tracing::warn!(module = %module_id, %error, context, "enable sequence failed");
        if self.registry.is_reachable() {
            self.set_status(
                HandlerStatus::new(HandlerState::Offline(OfflineReason::EnableFailed))
                    .with_detail(format!("{context}: {error}")),
            );
        } else {
            self.set_status(HandlerStatus::new(HandlerState::BridgeOffline));
        }
    }

    /// Schedules poll tasks for channels without push support.
    fn schedule_polls(&self, module_id: &ModuleId, module: &ModuleHandle) {
        self.cancel_polls();
        let mut polls = Vec::new();
        for channel in self.descriptor.channels() {
            let Some(interval) = channel.poll_interval() else {
                continue;
            };
            if !module.has_channel(channel.id())
                || !self.publisher.is_channel_of_interest(channel.id())
            {
                continue;
            }

            let registry = Arc::clone(&self.registry);
            let backend = Arc::clone(&self.backend);
            let publisher = Arc::clone(&self.publisher);
            let module_id = module_id.clone();
            let channel_id = channel.id().clone();
            let conversion = channel.conversion().clone();

            let handle = self.scheduler.schedule(interval, move || {
                let registry = Arc::clone(&registry);
                let backend = Arc::clone(&backend);
                let publisher = Arc::clone(&publisher);
                let module_id = module_id.clone();
                let channel_id = channel_id.clone();
                let conversion = conversion.clone();
                async move {
                    // Revalidate on every run; the module may be gone.
                    if registry.channel(&module_id, &channel_id).is_none() {
                        return;
                    }
                    match backend.read_value(&module_id, &channel_id).await {
                        Ok(raw) => publisher.publish(&channel_id, conversion.apply(&raw)),
                        Err(error) => {
                            tracing::debug!(module = %module_id, channel = %channel_id, %error, "poll read failed");
                        }
                    }
                }
            });
            polls.push(handle);
        }
        *self.polls.lock() = polls;
    }

    fn cancel_polls(&self) {
        for handle in self.polls.lock().drain(..) {
            handle.cancel();
        }
    }

    fn listener(&self) -> Option<Arc<dyn Listener>> {
        self.self_ref
            .upgrade()
            .map(|strong| strong as Arc<dyn Listener>)
    }

    fn state(&self) -> HandlerState {
        self.status_tx.borrow().state
    }

    fn set_status(&self, status: HandlerStatus) {
        let current = self.status_tx.borrow().clone();
        // Disposed is final; late transitions from in-flight work are dropped.
        if current.state == HandlerState::Disposed && status.state != HandlerState::Disposed {
            return;
        }
        if current != status {
            tracing::info!(from = %current.state, to = %status.state, "handler state changed");
            self.status_tx.send_replace(status);
        }
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("id", &self.id)
            .field("module", &self.module_id())
            .field("state", &self.state())
            .finish()
    }
}

#[async_trait]
impl Listener for LifecycleController {
    fn id(&self) -> ListenerId {
        self.id
    }

    async fn on_value_changed(
        &self,
        module: &ModuleId,
        channel: &ChannelId,
        old: Option<&TypedValue>,
        new: &TypedValue,
    ) -> Result<()> {
        if self.is_disposed() || *module != self.module_id() {
            return Ok(());
        }
        if !matches!(self.state(), HandlerState::Online | HandlerState::Enabling) {
            return Ok(());
        }
        let Some(descriptor) = self.descriptor.channel(channel) else {
            tracing::debug!(module = %module, channel = %channel, "value for unknown channel");
            return Ok(());
        };
        if !self.publisher.is_channel_of_interest(channel) {
            return Ok(());
        }
        tracing::trace!(module = %module, channel = %channel, ?old, %new, "publishing value change");
        self.publisher
            .publish(channel, descriptor.conversion().apply(new));
        Ok(())
    }

    async fn on_module_changed(
        &self,
        module: &ModuleId,
        change: ModuleChange,
        _info: &ModuleInfo,
    ) -> Result<()> {
        if self.is_disposed() || *module != self.module_id() {
            return Ok(());
        }
        match change {
            ModuleChange::Attached => {
                if self.state().is_retryable() {
                    self.try_enable().await;
                }
            }
            ModuleChange::Detached => {
                if matches!(self.state(), HandlerState::Online | HandlerState::Enabling) {
                    self.cancel_polls();
                    self.set_status(
                        HandlerStatus::new(HandlerState::Offline(OfflineReason::Gone))
                            .with_detail("module detached"),
                    );
                }
            }
        }
        Ok(())
    }

    async fn on_reachability_changed(&self, reachable: bool) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }
        if reachable {
            if self.state().is_retryable() {
                self.try_enable().await;
            }
        } else if !self.state().is_terminal() && self.state() != HandlerState::Unconfigured {
            self.cancel_polls();
            self.set_status(HandlerStatus::new(HandlerState::BridgeOffline));
        }
        Ok(())
    }
}
