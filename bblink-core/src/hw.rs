// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Hardware link seam.
//!
//! The hardware link delivers mailbox-change notifications to a registered
//! handler and raises the outbound doorbell towards the baseband. The
//! register/interrupt plumbing behind it lives outside this crate.

use std::sync::atomic::{fence, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Handler invoked by the hardware link on every mailbox-word change.
///
/// Runs in a restricted context: it must not block and must not inspect
/// link state. The closure captures its context explicitly.
pub type IpcHandler = Arc<dyn Fn() + Send + Sync>;

/// Register/doorbell interface of the AP/BB hardware link.
pub trait HardwareLink: Send + Sync {
    /// Install `handler`, or remove the current one with `None`.
    fn register_ipc(&self, handler: Option<IpcHandler>);

    /// Ring the doorbell towards the peer.
    fn generate_ipc(&self);
}

/// Outbound signal towards the peer.
#[derive(Clone)]
pub struct IpcSignal {
    link: Arc<dyn HardwareLink>,
}

impl IpcSignal {
    pub fn new(link: Arc<dyn HardwareLink>) -> Self {
        Self { link }
    }

    /// Signal the peer.
    ///
    /// The full fence makes every AP write to shared memory globally visible
    /// before the peer can observe the doorbell. The peer has no other
    /// ordering primitive with us.
    pub fn generate(&self) {
        fence(Ordering::SeqCst);
        self.link.generate_ipc();
    }
}

impl std::fmt::Debug for IpcSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcSignal").finish_non_exhaustive()
    }
}

/// Software hardware link.
///
/// `raise()` plays the interrupt: it invokes whatever handler is registered.
/// Outbound signals are counted.
#[derive(Default)]
pub struct LoopbackLink {
    handler: Mutex<Option<IpcHandler>>,
    generated: AtomicU64,
    raised: AtomicU64,
}

impl LoopbackLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Deliver a mailbox-change notification.
    /// Returns false when no handler is registered.
    pub fn raise(&self) -> bool {
        // Never hold the lock while the handler runs.
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        match handler {
            Some(handler) => {
                self.raised.fetch_add(1, Ordering::Relaxed);
                handler();
                true
            }
            None => {
                tracing::trace!("Mailbox change with no handler registered");
                false
            }
        }
    }

    pub fn is_registered(&self) -> bool {
        self.handler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Number of outbound signals generated so far.
    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Acquire)
    }

    /// Number of notifications delivered to a handler.
    pub fn raised(&self) -> u64 {
        self.raised.load(Ordering::Acquire)
    }
}

impl HardwareLink for LoopbackLink {
    fn register_ipc(&self, handler: Option<IpcHandler>) {
        let mut slot = self
            .handler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = handler;
    }

    fn generate_ipc(&self) {
        self.generated.fetch_add(1, Ordering::AcqRel);
    }
}
