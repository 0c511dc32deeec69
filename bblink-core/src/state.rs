// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Control state machine for one AP/BB link.
//!
//! Runs once per scheduled mailbox notification, always inside the link's
//! serialized worker. The link state is not a separate enum: it is the last
//! accepted command (`old_status`) plus the `configured` flag. READY splits
//! into a hot path (same command as last time: drain the queue) and a cold
//! path (transition into READY: renegotiate).
//!
//! Notifications may be coalesced, so every run re-reads the live mailbox
//! word instead of trusting anything captured when the run was scheduled.

use std::sync::Arc;

use crate::channel;
use crate::collab::Collaborators;
use crate::error::ProtocolError;
use crate::hw::IpcSignal;
use crate::instance::LinkInstance;
use crate::shm::{ConfigReader, IpcCommand, MailboxMessage};
use crate::stats::LinkStats;
use crate::types::InstanceId;

pub struct ControlStateMachine {
    instance: LinkInstance,
    collab: Collaborators,
    signal: IpcSignal,
    stats: Arc<LinkStats>,
}

impl ControlStateMachine {
    pub fn new(instance: LinkInstance, collab: Collaborators, signal: IpcSignal) -> Self {
        Self {
            instance,
            collab,
            signal,
            stats: Arc::new(LinkStats::default()),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.instance.id()
    }

    pub fn instance(&self) -> &LinkInstance {
        &self.instance
    }

    pub fn stats(&self) -> Arc<LinkStats> {
        Arc::clone(&self.stats)
    }

    /// Give back the owned parts.
    pub fn into_parts(self) -> (LinkInstance, Collaborators) {
        (self.instance, self.collab)
    }

    /// Handle the current mailbox word.
    pub fn run(&mut self) {
        self.handle_mailbox();
        self.stats.record_run();
    }

    fn handle_mailbox(&mut self) {
        let id = self.instance.id();

        let word = match self.instance.mailbox_word() {
            Ok(word) => word,
            Err(e) => {
                tracing::error!(instance = %id, error = %e, "Cannot read mailbox word");
                return;
            }
        };

        let command = match MailboxMessage::validate(word) {
            Ok(command) => command,
            Err(err) => {
                // A corrupted word never reconfigures the link and never
                // becomes the new status.
                tracing::error!(instance = %id, error = %err, "Mailbox integrity check failed");
                self.stats.record_integrity_failure();
                if self.instance.configured {
                    self.teardown();
                }
                self.publish();
                return;
            }
        };

        let decoded = IpcCommand::from(command);
        tracing::debug!(
            instance = %id,
            command = %decoded,
            old_status = self.instance.old_status,
            "Mailbox message"
        );

        match decoded {
            IpcCommand::Ready if command == self.instance.old_status => self.process_queue(),
            IpcCommand::Ready => self.negotiate(),
            IpcCommand::BootFwRequest | IpcCommand::BootRestartFwRequest => {
                // The peer is about to reload firmware and reuse the memory.
                if self.instance.configured {
                    self.teardown();
                }
            }
            IpcCommand::BootError(kind) => {
                let err = ProtocolError::BootErrorSignaled { kind, word };
                tracing::error!(instance = %id, error = %err, "Secure boot failure");
            }
            IpcCommand::BootColdBootInd | IpcCommand::BootFwConf => {
                let err = ProtocolError::ProtocolViolation {
                    command: decoded.name(),
                    word,
                };
                tracing::error!(instance = %id, error = %err, "Unexpected boot message");
            }
            IpcCommand::Unknown(_) => {
                let err = ProtocolError::UnknownCommand { word };
                tracing::error!(instance = %id, error = %err, "Unknown mailbox message");
            }
        }

        self.instance.old_status = command;
        self.publish();
    }

    /// Hot path: READY repeated.
    fn process_queue(&mut self) {
        if !self.instance.configured {
            tracing::debug!(
                instance = %self.instance.id(),
                "Link not configured, queue not processed"
            );
            return;
        }

        let ctx = self.instance.context(&self.signal);
        match self.collab.queue.process(&ctx) {
            Ok(()) => self.stats.record_queue_pass(),
            Err(e) => {
                tracing::error!(instance = %ctx.instance, error = %e, "Queue processing failed")
            }
        }
    }

    /// Cold path: transition into READY.
    ///
    /// Config first, then the buffer pool and queue built on it, then the
    /// interfaces that depend on the queue. A failing step ends the sequence.
    /// A rejected config on a configured link tears the old one down.
    fn negotiate(&mut self) {
        let id = self.instance.id();
        tracing::info!(instance = %id, "Negotiating shared memory link");

        if let Err(e) = ConfigReader::read(&mut self.instance) {
            tracing::error!(instance = %id, error = %e, "Negotiation aborted");
            // Nothing negotiated earlier may keep running on a rejected layout.
            if self.instance.configured {
                self.teardown();
            }
            return;
        }
        self.stats.record_negotiation();

        let ctx = self.instance.context(&self.signal);

        if let Err(e) = self.collab.pool.init(&ctx) {
            tracing::error!(instance = %id, error = %e, "Negotiation aborted");
            return;
        }

        if let Err(e) = self.collab.queue.init(&ctx) {
            tracing::error!(instance = %id, error = %e, "Negotiation aborted");
            return;
        }

        channel::init_interfaces(&mut self.collab.adapters, &ctx);
        tracing::info!(instance = %id, "Shared memory link up");
    }

    /// Abort the queue, then stop the interfaces.
    fn teardown(&mut self) {
        let id = self.instance.id();
        tracing::info!(instance = %id, "Tearing down shared memory link");
        self.stats.record_teardown();

        {
            let ctx = self.instance.context(&self.signal);
            if let Err(e) = self.collab.queue.abort(&ctx) {
                tracing::error!(instance = %id, error = %e, "Queue abort failed");
            }
        }

        // Only this worker can renegotiate, so nothing races this write.
        self.instance.configured = false;
        channel::cleanup_interfaces(&mut self.collab.adapters, &self.instance.channels, id);
    }

    fn publish(&self) {
        self.stats
            .publish(self.instance.configured, self.instance.old_status);
    }
}
