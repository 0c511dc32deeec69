// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `bblink inspect` command - Show what the baseband published in a mailbox.
//!
//! Opens the named mailbox region of a configured link read-only in spirit:
//! nothing is written back.

use bblink_core::shm::layout::{CONFIG_VERSION, MAILBOX_OFFSET};
use bblink_core::shm::{ConfigBlock, MailboxMessage, SharedMemoryRegion, ShmLayout};
use bblink_core::{ChannelTable, ConfigLoader, InstanceId};

pub async fn execute(config_path: &str, instance: u32) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_file(config_path)?;
    let id = InstanceId::new(instance);

    let link = config
        .link(id)
        .ok_or_else(|| format!("Instance {} is not defined in {}", id, config_path))?;

    tracing::debug!(instance = %id, shm = %link.mailbox_shm, "Opening mailbox region");
    let mailbox = SharedMemoryRegion::open(link.mailbox_shm.as_str(), link.mailbox_size)?;

    let word = mailbox.read_u32(MAILBOX_OFFSET)?;
    let block = ConfigBlock::read_from(&mailbox)?;

    println!("Link {} ({})", id, link.mailbox_shm);
    println!();
    match MailboxMessage::decode(word) {
        Ok(command) => println!("Mailbox:        {:#010x} ({})", word, command),
        Err(e) => println!("Mailbox:        {:#010x} ✗ {}", word, e),
    }

    let version_note = if block.version == CONFIG_VERSION {
        "✓"
    } else {
        "✗ unsupported"
    };
    println!("Version:        {:#010x} {}", block.version, version_note);
    println!(
        "Shmem size:     {} bytes (configured ipc_size: {})",
        block.shmem_size, link.ipc_size
    );

    let layout = ShmLayout::from_config(&block);
    println!(
        "Descriptors:    {:#x}..{:#x}",
        layout.desc.offset,
        layout.desc.end()
    );
    println!(
        "Data:           {:#x}..{:#x}",
        layout.data.offset,
        layout.data.end()
    );
    println!("Queue head:     {:#x}", layout.queue_head);
    println!("Queue tail:     {:#x}", layout.queue_tail);
    println!();

    let channels = ChannelTable::from_map(&block.chan_map);
    let counts = channels.counts();
    println!(
        "Channels ({} terminal, {} log, {} network):",
        counts.terminal, counts.log, counts.network
    );
    for entry in channels.mapped() {
        println!("  [{:>2}] {:<8} {}", entry.index, entry.kind, entry.name);
    }

    Ok(())
}
