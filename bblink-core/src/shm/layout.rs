// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Binary layout of the mailbox region.
//!
//! The mailbox word sits at offset 0, the config block written by the
//! baseband firmware at [`CONFIG_OFFSET`]. Offsets inside the config block
//! are relative to the base of the IPC region.

use serde::Serialize;

use crate::channel::ChannelType;
use crate::error::SharedMemoryError;
use crate::shm::SharedMemoryRegion;

/// Byte offset of the mailbox word inside the mailbox region.
pub const MAILBOX_OFFSET: usize = 0;

/// Byte offset of the config block inside the mailbox region.
pub const CONFIG_OFFSET: usize = 8;

/// The only config block version this control plane understands.
pub const CONFIG_VERSION: u32 = 0x0001_0003;

/// Number of entries in the channel map.
pub const MAX_CHANNELS: usize = 12;

/// Size of the NUL-padded channel name field.
pub const CHANNEL_NAME_LEN: usize = 16;

/// One entry of the channel map, as laid out by the peer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMapEntry {
    pub kind: u32,
    pub name: [u8; CHANNEL_NAME_LEN],
}

impl ChannelMapEntry {
    pub const UNMAPPED: Self = Self {
        kind: 0,
        name: [0; CHANNEL_NAME_LEN],
    };

    /// Name up to the first NUL, lossily decoded.
    pub fn name_lossy(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(CHANNEL_NAME_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

/// Config block negotiated by the baseband firmware.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigBlock {
    pub version: u32,
    pub shmem_size: u32,
    pub region_ap_desc_offset: u32,
    pub region_ap_desc_size: u32,
    pub region_ap_data_offset: u32,
    pub region_ap_data_size: u32,
    pub queue_bb_offset: u32,
    pub queue_ap_offset: u32,
    pub chan_map: [ChannelMapEntry; MAX_CHANNELS],
}

/// Bytes of mailbox region needed to hold the mailbox word and config block.
pub const fn mailbox_region_min_size() -> usize {
    CONFIG_OFFSET + std::mem::size_of::<ConfigBlock>()
}

impl ConfigBlock {
    /// Snapshot the block out of the mailbox region.
    pub fn read_from(mailbox: &SharedMemoryRegion) -> Result<Self, SharedMemoryError> {
        mailbox.read_struct::<ConfigBlock>(CONFIG_OFFSET)
    }

    /// Write the block into the mailbox region (peer side).
    pub fn write_to(&self, mailbox: &SharedMemoryRegion) -> Result<(), SharedMemoryError> {
        mailbox.write_struct(CONFIG_OFFSET, *self)
    }
}

/// Byte range inside the IPC region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.len)
    }

    /// Whether the span lies entirely inside a region of `size` bytes.
    pub fn fits(&self, size: usize) -> bool {
        self.offset
            .checked_add(self.len)
            .is_some_and(|end| end <= size)
    }
}

/// Addresses derived from a config block, relative to the IPC region base.
///
/// Nothing here is bounds-checked against the mapping: the values come from
/// the peer, and consumers check spans before dereferencing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ShmLayout {
    /// Descriptor region (uncached on hardware).
    pub desc: Span,
    /// Data region (cached on hardware).
    pub data: Span,
    /// Shared queue head: written by the peer.
    pub queue_head: usize,
    /// Shared queue tail: always the AP queue.
    pub queue_tail: usize,
}

impl ShmLayout {
    pub fn from_config(conf: &ConfigBlock) -> Self {
        Self {
            desc: Span {
                offset: conf.region_ap_desc_offset as usize,
                len: conf.region_ap_desc_size as usize,
            },
            data: Span {
                offset: conf.region_ap_data_offset as usize,
                len: conf.region_ap_data_size as usize,
            },
            queue_head: Self::queue_head_offset(conf),
            queue_tail: conf.queue_ap_offset as usize,
        }
    }

    #[cfg(not(feature = "baseband-simu"))]
    fn queue_head_offset(conf: &ConfigBlock) -> usize {
        conf.queue_bb_offset as usize
    }

    #[cfg(feature = "baseband-simu")]
    fn queue_head_offset(conf: &ConfigBlock) -> usize {
        conf.queue_ap_offset as usize
    }
}

/// Peer-side builder for a config block.
#[derive(Debug, Clone)]
pub struct ConfigBlockBuilder {
    block: ConfigBlock,
}

impl ConfigBlockBuilder {
    /// Start a block describing an IPC region of `shmem_size` bytes.
    pub fn new(shmem_size: u32) -> Self {
        Self {
            block: ConfigBlock {
                version: CONFIG_VERSION,
                shmem_size,
                region_ap_desc_offset: 0,
                region_ap_desc_size: 0,
                region_ap_data_offset: 0,
                region_ap_data_size: 0,
                queue_bb_offset: 0,
                queue_ap_offset: 0,
                chan_map: [ChannelMapEntry::UNMAPPED; MAX_CHANNELS],
            },
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.block.version = version;
        self
    }

    pub fn desc_region(mut self, offset: u32, size: u32) -> Self {
        self.block.region_ap_desc_offset = offset;
        self.block.region_ap_desc_size = size;
        self
    }

    pub fn data_region(mut self, offset: u32, size: u32) -> Self {
        self.block.region_ap_data_offset = offset;
        self.block.region_ap_data_size = size;
        self
    }

    pub fn queues(mut self, bb_offset: u32, ap_offset: u32) -> Self {
        self.block.queue_bb_offset = bb_offset;
        self.block.queue_ap_offset = ap_offset;
        self
    }

    /// Map channel `index`. Names longer than the field are truncated.
    /// Indices past the end of the map are ignored.
    pub fn channel(mut self, index: usize, kind: ChannelType, name: &str) -> Self {
        if let Some(entry) = self.block.chan_map.get_mut(index) {
            let mut field = [0u8; CHANNEL_NAME_LEN];
            let bytes = name.as_bytes();
            let n = bytes.len().min(CHANNEL_NAME_LEN - 1);
            field[..n].copy_from_slice(&bytes[..n]);
            *entry = ChannelMapEntry {
                kind: kind.raw(),
                name: field,
            };
        }
        self
    }

    pub fn build(self) -> ConfigBlock {
        self.block
    }
}
