// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-link instance handle.
//!
//! Owns the mapped mailbox and IPC regions, the last negotiated config
//! snapshot, the channel table and the `configured` / `old_status` pair that
//! together form the link state. Created at attach time and kept until
//! detach; `configured` toggles with every negotiation cycle.

use std::sync::Arc;

use crate::channel::ChannelTable;
use crate::collab::LinkContext;
use crate::error::SharedMemoryError;
use crate::hw::IpcSignal;
use crate::shm::layout::{mailbox_region_min_size, MAILBOX_OFFSET};
use crate::shm::{ConfigBlock, SharedMemoryRegion, ShmLayout};
use crate::types::InstanceId;

/// Last-command value before the first message is accepted.
pub const INITIAL_STATUS: u16 = 0;

#[derive(Debug)]
pub struct LinkInstance {
    id: InstanceId,
    mailbox: Arc<SharedMemoryRegion>,
    ipc: Arc<SharedMemoryRegion>,
    pub(crate) conf: Option<ConfigBlock>,
    pub(crate) layout: ShmLayout,
    pub(crate) channels: ChannelTable,
    pub(crate) configured: bool,
    pub(crate) old_status: u16,
}

impl LinkInstance {
    /// Attach to mapped regions.
    ///
    /// The mailbox region must be large enough to hold the mailbox word and
    /// the config block; nothing else is checked until the peer negotiates.
    pub fn attach(
        id: InstanceId,
        mailbox: Arc<SharedMemoryRegion>,
        ipc: Arc<SharedMemoryRegion>,
    ) -> Result<Self, SharedMemoryError> {
        let required = mailbox_region_min_size();
        if mailbox.size() < required {
            return Err(SharedMemoryError::RegionTooSmall {
                region: "mailbox",
                size: mailbox.size(),
                required,
            });
        }

        tracing::debug!(
            instance = %id,
            mailbox_size = mailbox.size(),
            ipc_size = ipc.size(),
            "Link instance attached"
        );

        Ok(Self {
            id,
            mailbox,
            ipc,
            conf: None,
            layout: ShmLayout::default(),
            channels: ChannelTable::new(),
            configured: false,
            old_status: INITIAL_STATUS,
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn mailbox(&self) -> &SharedMemoryRegion {
        &self.mailbox
    }

    pub fn ipc(&self) -> &SharedMemoryRegion {
        &self.ipc
    }

    /// Externally mapped size of the IPC region.
    pub fn ipc_size(&self) -> usize {
        self.ipc.size()
    }

    /// Live mailbox word, re-read on every call.
    pub fn mailbox_word(&self) -> Result<u32, SharedMemoryError> {
        self.mailbox.read_u32(MAILBOX_OFFSET)
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Last accepted command.
    pub fn old_status(&self) -> u16 {
        self.old_status
    }

    /// Config snapshot of the last successful negotiation.
    pub fn config(&self) -> Option<&ConfigBlock> {
        self.conf.as_ref()
    }

    pub fn layout(&self) -> &ShmLayout {
        &self.layout
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    pub(crate) fn context<'a>(&'a self, signal: &'a IpcSignal) -> LinkContext<'a> {
        LinkContext {
            instance: self.id,
            channels: &self.channels,
            layout: &self.layout,
            ipc: &self.ipc,
            signal,
        }
    }
}
