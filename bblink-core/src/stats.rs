// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::shm::IpcCommand;
use crate::types::InstanceId;

/// Per-link counters, written by the serialized worker only.
/// Readable from any thread.
#[derive(Debug, Default)]
pub struct LinkStats {
    configured: AtomicBool,
    old_status: AtomicU32,
    runs: AtomicU64,
    negotiations: AtomicU64,
    queue_passes: AtomicU64,
    integrity_failures: AtomicU64,
    teardowns: AtomicU64,
}

impl LinkStats {
    /// Marks a run as complete; everything it did is visible once observed.
    pub(crate) fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn record_negotiation(&self) {
        self.negotiations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_queue_pass(&self) {
        self.queue_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_integrity_failure(&self) {
        self.integrity_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_teardown(&self) {
        self.teardowns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn publish(&self, configured: bool, old_status: u16) {
        self.old_status.store(u32::from(old_status), Ordering::Relaxed);
        self.configured.store(configured, Ordering::Release);
    }

    pub fn snapshot(&self, instance: InstanceId) -> LinkStatus {
        let old_status = self.old_status.load(Ordering::Acquire) as u16;
        LinkStatus {
            instance,
            configured: self.configured.load(Ordering::Acquire),
            old_status,
            last_command: IpcCommand::from(old_status).to_string(),
            runs: self.runs.load(Ordering::Acquire),
            negotiations: self.negotiations.load(Ordering::Relaxed),
            queue_passes: self.queue_passes.load(Ordering::Relaxed),
            integrity_failures: self.integrity_failures.load(Ordering::Relaxed),
            teardowns: self.teardowns.load(Ordering::Relaxed),
        }
    }
}

/// Serializable status of one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatus {
    pub instance: InstanceId,
    pub configured: bool,
    pub old_status: u16,
    pub last_command: String,
    pub runs: u64,
    pub negotiations: u64,
    pub queue_passes: u64,
    pub integrity_failures: u64,
    pub teardowns: u64,
}
