// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Dispatch bridge and serialized worker.
//!
//! The hardware link calls the bridge from a context that must not block.
//! The bridge never looks at link state: it only queues a run of the
//! control state machine on the link's single worker thread. One worker per
//! link means runs never overlap, and the FIFO keeps hardware order.
//!
//! A run that is queued but not yet started absorbs further notifications.
//! The flag is cleared as the run starts, so a notification arriving during
//! a run always schedules another one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::LifecycleError;
use crate::hw::IpcHandler;
use crate::state::ControlStateMachine;
use crate::types::InstanceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkItem {
    Run,
    Shutdown,
}

/// Callback side of the worker queue.
#[derive(Debug)]
pub struct DispatchBridge {
    instance: InstanceId,
    tx: UnboundedSender<WorkItem>,
    pending: Arc<AtomicBool>,
}

impl DispatchBridge {
    /// Schedule a state machine run. Never blocks.
    pub fn on_mailbox_change(&self) {
        if self.pending.swap(true, Ordering::AcqRel) {
            tracing::trace!(instance = %self.instance, "Run already pending");
            return;
        }
        if self.tx.send(WorkItem::Run).is_err() {
            self.pending.store(false, Ordering::Release);
            tracing::debug!(instance = %self.instance, "Worker gone, notification ignored");
        }
    }

    /// Wrap the bridge as a hardware-link handler.
    pub fn into_handler(self: Arc<Self>) -> IpcHandler {
        Arc::new(move || self.on_mailbox_change())
    }
}

/// Dedicated, uniquely named worker thread owning a state machine.
#[derive(Debug)]
pub struct SerialWorker {
    name: String,
    bridge: Arc<DispatchBridge>,
    thread: JoinHandle<ControlStateMachine>,
}

impl SerialWorker {
    /// Start the worker. The state machine moves onto the worker thread.
    pub fn spawn(name: String, machine: ControlStateMachine) -> Result<Self, LifecycleError> {
        let instance = machine.id();
        let (tx, rx) = unbounded_channel();
        let pending = Arc::new(AtomicBool::new(false));

        let worker_pending = Arc::clone(&pending);
        let thread = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || Self::work(machine, rx, worker_pending))
            .map_err(|source| LifecycleError::WorkerSpawn {
                name: name.clone(),
                source,
            })?;

        tracing::debug!(instance = %instance, worker = %name, "Worker started");

        Ok(Self {
            name,
            bridge: Arc::new(DispatchBridge {
                instance,
                tx,
                pending,
            }),
            thread,
        })
    }

    fn work(
        mut machine: ControlStateMachine,
        mut rx: UnboundedReceiver<WorkItem>,
        pending: Arc<AtomicBool>,
    ) -> ControlStateMachine {
        while let Some(item) = rx.blocking_recv() {
            match item {
                WorkItem::Run => {
                    // Pairs with the swap in the bridge so this run sees
                    // every mailbox write made before the notification.
                    pending.swap(false, Ordering::AcqRel);
                    machine.run();
                }
                WorkItem::Shutdown => break,
            }
        }
        machine
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bridge(&self) -> Arc<DispatchBridge> {
        Arc::clone(&self.bridge)
    }

    /// Wait for every queued and in-flight run, then stop the thread.
    pub fn drain(self) -> Result<ControlStateMachine, LifecycleError> {
        // Queued behind all pending runs, so they complete first.
        let _ = self.bridge.tx.send(WorkItem::Shutdown);
        self.thread
            .join()
            .map_err(|_| LifecycleError::WorkerPanicked { name: self.name })
    }

    /// Ask the thread to stop after the queued work, without waiting for it.
    pub fn stop(self) {
        let _ = self.bridge.tx.send(WorkItem::Shutdown);
        tracing::debug!(worker = %self.name, "Worker detached");
    }
}
