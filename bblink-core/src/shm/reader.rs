// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Config reader.
//!
//! Parses the config block the baseband wrote into the mailbox region and
//! derives the region layout and channel table from it. Pure function of
//! shared memory and handle state: no hardware register access.

use crate::channel::ChannelTable;
use crate::error::{LinkResult, NegotiationError};
use crate::instance::LinkInstance;
use crate::shm::layout::CONFIG_VERSION;
use crate::shm::{ConfigBlock, ShmLayout};

pub struct ConfigReader;

impl ConfigReader {
    /// Re-read the config block into `instance`.
    ///
    /// On a version mismatch nothing in the block is trusted and the instance
    /// stays unconfigured. A size mismatch is only a warning; the externally
    /// mapped size stays authoritative.
    pub fn read(instance: &mut LinkInstance) -> LinkResult<()> {
        let id = instance.id();
        let conf = ConfigBlock::read_from(instance.mailbox())?;

        if conf.version != CONFIG_VERSION {
            let err = NegotiationError::VersionMismatch {
                expected: CONFIG_VERSION,
                found: conf.version,
            };
            tracing::error!(instance = %id, error = %err, "Config rejected");
            return Err(err.into());
        }

        if instance.ipc_size() != conf.shmem_size as usize {
            let warning = NegotiationError::RegionSizeMismatch {
                mapped: instance.ipc_size(),
                reported: conf.shmem_size,
            };
            tracing::warn!(instance = %id, "{}", warning);
        }

        let layout = ShmLayout::from_config(&conf);
        tracing::debug!(
            instance = %id,
            desc_offset = layout.desc.offset,
            desc_size = layout.desc.len,
            data_offset = layout.data.offset,
            data_size = layout.data.len,
            queue_head = layout.queue_head,
            queue_tail = layout.queue_tail,
            "Derived shared memory layout"
        );

        let channels = ChannelTable::from_map(&conf.chan_map);
        for chan in channels.mapped() {
            tracing::debug!(
                instance = %id,
                chan = chan.index,
                name = %chan.name,
                kind = %chan.kind,
                "Channel mapped"
            );
        }

        instance.layout = layout;
        instance.channels = channels;
        instance.conf = Some(conf);
        instance.configured = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::channel::ChannelType;
    use crate::error::LinkError;
    use crate::shm::{ConfigBlockBuilder, SharedMemoryRegion};
    use crate::types::InstanceId;

    const IPC_SIZE: usize = 64 * 1024;

    fn instance() -> (Arc<SharedMemoryRegion>, LinkInstance) {
        let mailbox = Arc::new(SharedMemoryRegion::anonymous(4096).unwrap());
        let ipc = Arc::new(SharedMemoryRegion::anonymous(IPC_SIZE).unwrap());
        let instance = LinkInstance::attach(InstanceId::new(0), mailbox.clone(), ipc).unwrap();
        (mailbox, instance)
    }

    fn block(shmem_size: u32) -> ConfigBlockBuilder {
        ConfigBlockBuilder::new(shmem_size)
            .desc_region(0x1000, 0x1000)
            .data_region(0x2000, 0x4000)
            .queues(0x40, 0x80)
            .channel(0, ChannelType::Terminal, "at0")
            .channel(5, ChannelType::Network, "rmnet0")
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let (mailbox, mut instance) = instance();
        block(IPC_SIZE as u32)
            .version(0xBAD)
            .build()
            .write_to(&mailbox)
            .unwrap();

        let result = ConfigReader::read(&mut instance);
        assert!(matches!(
            result,
            Err(LinkError::Negotiation(NegotiationError::VersionMismatch { found: 0xBAD, .. }))
        ));
        assert!(!instance.is_configured());
        assert!(instance.config().is_none());
        assert_eq!(instance.channels().mapped().count(), 0);
    }

    #[test]
    fn test_size_mismatch_is_only_a_warning() {
        let (mailbox, mut instance) = instance();
        block(IPC_SIZE as u32 * 2).build().write_to(&mailbox).unwrap();

        ConfigReader::read(&mut instance).unwrap();
        assert!(instance.is_configured());
        assert_eq!(instance.ipc_size(), IPC_SIZE);
    }

    #[test]
    fn test_layout_and_channels_copied() {
        let (mailbox, mut instance) = instance();
        block(IPC_SIZE as u32).build().write_to(&mailbox).unwrap();

        ConfigReader::read(&mut instance).unwrap();
        assert_eq!(instance.layout().desc.offset, 0x1000);
        assert_eq!(instance.layout().data.len, 0x4000);
        assert_eq!(instance.layout().queue_tail, 0x80);
        assert_eq!(instance.channels().get(5).map(|c| c.kind), Some(ChannelType::Network));

        // Snapshot is by value: later peer writes do not show through.
        ConfigBlockBuilder::new(0).build().write_to(&mailbox).unwrap();
        assert_eq!(instance.channels().get(0).map(|c| c.name.as_str()), Some("at0"));
        assert_eq!(instance.config().map(|c| c.queue_ap_offset), Some(0x80));
    }
}
