// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! IPC lifecycle: worker creation, hardware registration, outbound signal.

use std::sync::Arc;

use crate::collab::Collaborators;
use crate::dispatch::SerialWorker;
use crate::error::LifecycleError;
use crate::hw::{HardwareLink, IpcSignal};
use crate::instance::LinkInstance;
use crate::state::ControlStateMachine;
use crate::stats::{LinkStats, LinkStatus};
use crate::types::InstanceId;

/// A registered link: its worker, its hardware callback and its doorbell.
pub struct IpcLifecycle {
    instance: InstanceId,
    link: Arc<dyn HardwareLink>,
    signal: IpcSignal,
    // Taken by `unregister`; still present on drop means the link was never
    // taken offline.
    worker: Option<SerialWorker>,
    stats: Arc<LinkStats>,
}

impl IpcLifecycle {
    /// Worker thread name for an instance.
    pub fn worker_name(instance: InstanceId) -> String {
        format!("bblink_wq{}", instance)
    }

    /// Build the state machine for `instance` and bring the link online:
    /// start its worker, then hand the dispatch bridge to the hardware link.
    pub fn register(
        instance: LinkInstance,
        collab: Collaborators,
        link: Arc<dyn HardwareLink>,
    ) -> Result<Self, LifecycleError> {
        let id = instance.id();
        let signal = IpcSignal::new(Arc::clone(&link));
        let machine = ControlStateMachine::new(instance, collab, signal.clone());
        let stats = machine.stats();

        let worker = SerialWorker::spawn(Self::worker_name(id), machine)?;
        link.register_ipc(Some(worker.bridge().into_handler()));

        tracing::info!(instance = %id, worker = %worker.name(), "IPC registered");

        Ok(Self {
            instance: id,
            link,
            signal,
            worker: Some(worker),
            stats,
        })
    }

    /// Take the link offline.
    ///
    /// Blocks until every queued and in-flight run has finished, stops the
    /// worker, then removes the hardware callback. Returns the state machine
    /// so its final state can be inspected or reused.
    pub fn unregister(mut self) -> Result<ControlStateMachine, LifecycleError> {
        let worker = self
            .worker
            .take()
            .ok_or(LifecycleError::NotAttached(self.instance))?;

        tracing::debug!(instance = %self.instance, "Flush worker queue");
        let drained = worker.drain();

        tracing::debug!(instance = %self.instance, "Unregister hardware callback");
        self.link.register_ipc(None);

        tracing::info!(instance = %self.instance, "IPC unregistered");
        drained
    }

    /// Signal the peer. All prior shared-memory writes are made visible first.
    pub fn generate(&self) {
        self.signal.generate();
    }

    /// Doorbell handle for collaborators outside the worker.
    pub fn signal(&self) -> IpcSignal {
        self.signal.clone()
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn status(&self) -> LinkStatus {
        self.stats.snapshot(self.instance)
    }
}

impl std::fmt::Debug for IpcLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcLifecycle")
            .field("instance", &self.instance)
            .field("worker", &self.worker.as_ref().map(SerialWorker::name))
            .finish_non_exhaustive()
    }
}

impl Drop for IpcLifecycle {
    /// Dropped without `unregister`: cut the hardware callback first so no
    /// new run is scheduled, then let the worker finish what is queued and
    /// exit on its own. Does not wait for it.
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            tracing::warn!(instance = %self.instance, "Link dropped while registered");
            self.link.register_ipc(None);
            worker.stop();
        }
    }
}
