// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `bblink simulate` command - Drive links from an in-process baseband.
//!
//! Each link gets anonymous shared regions and a loopback interrupt line.
//! The simulated baseband publishes a config block, then plays a boot,
//! ready and renegotiation script while the control plane reacts.

use std::sync::Arc;
use std::time::Duration;

use bblink_core::shm::layout::MAILBOX_OFFSET;
use bblink_core::shm::{cmd, ConfigBlockBuilder, MailboxMessage, SharedMemoryRegion};
use bblink_core::{
    ChannelType, Collaborators, ConfigLoader, InstanceId, IpcLifecycle, LinkConfig, LinkError,
    LinkInstance, LinkRegistry, LinkStatus, LoopbackLink, ShmName,
};

/// Time allowed for the worker to handle one mailbox word.
const RUN_TIMEOUT: Duration = Duration::from_secs(5);

/// Baseband end of a simulated link.
struct SimulatedBaseband {
    id: InstanceId,
    mailbox: Arc<SharedMemoryRegion>,
    link: Arc<LoopbackLink>,
}

impl SimulatedBaseband {
    fn publish_config(&self, ipc_size: usize) -> Result<(), LinkError> {
        let size = ipc_size as u32;
        ConfigBlockBuilder::new(size)
            .desc_region(size / 8, size / 8)
            .data_region(size / 4, size / 4)
            .queues(0x40, 0x80)
            .channel(0, ChannelType::Terminal, "at0")
            .channel(1, ChannelType::Terminal, "at1")
            .channel(2, ChannelType::Log, "trace")
            .channel(4, ChannelType::Network, "rmnet0")
            .build()
            .write_to(&self.mailbox)?;
        Ok(())
    }

    /// Post a command and wait until the worker has handled it.
    async fn post(
        &self,
        registry: &LinkRegistry,
        command: u16,
    ) -> Result<LinkStatus, Box<dyn std::error::Error>> {
        let before = registry.status(self.id)?.runs;
        self.mailbox
            .write_u32(MAILBOX_OFFSET, MailboxMessage::encode(command))?;
        self.link.raise();

        let status = tokio::time::timeout(RUN_TIMEOUT, async {
            loop {
                let status = registry.status(self.id)?;
                if status.runs > before {
                    return Ok::<_, LinkError>(status);
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .map_err(|_| format!("Link {} did not handle command {:#06x}", self.id, command))??;

        println!(
            "  [{}] {:<20} configured={} negotiations={} queue_passes={}",
            self.id,
            status.last_command,
            status.configured,
            status.negotiations,
            status.queue_passes
        );
        Ok(status)
    }
}

/// Links to simulate: those of the settings file, or a single default one.
fn simulated_links(config_path: &str) -> Result<Vec<LinkConfig>, LinkError> {
    match ConfigLoader::load_file(config_path) {
        Ok(config) => Ok(config.links),
        Err(LinkError::ConfigNotFound { path }) => {
            tracing::warn!(path = %path.display(), "No settings file, simulating instance 0");
            Ok(vec![LinkConfig {
                instance: InstanceId::new(0),
                mailbox_shm: ShmName::new("bblink-sim-mb0")?,
                mailbox_size: 4096,
                ipc_shm: ShmName::new("bblink-sim-ipc0")?,
                ipc_size: 1024 * 1024,
            }])
        }
        Err(e) => Err(e),
    }
}

pub async fn execute(config_path: &str, cycles: u32) -> Result<(), Box<dyn std::error::Error>> {
    let links = simulated_links(config_path)?;
    let registry = LinkRegistry::new_shared();
    let mut basebands = Vec::with_capacity(links.len());

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   BBLINK SIMULATED BASEBAND                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    for link in &links {
        let mailbox = Arc::new(SharedMemoryRegion::anonymous(link.mailbox_size)?);
        let ipc = Arc::new(SharedMemoryRegion::anonymous(link.ipc_size)?);
        let instance = LinkInstance::attach(link.instance, Arc::clone(&mailbox), ipc)?;

        let hw = LoopbackLink::new_shared();
        let lifecycle = IpcLifecycle::register(instance, Collaborators::logging(), hw.clone())?;
        registry.attach(lifecycle)?;

        let baseband = SimulatedBaseband {
            id: link.instance,
            mailbox,
            link: hw,
        };
        baseband.publish_config(link.ipc_size)?;
        basebands.push(baseband);
    }

    tracing::info!(links = basebands.len(), cycles, "Simulation started");

    for baseband in &basebands {
        baseband.post(&registry, cmd::BOOT_COLD_BOOT_IND).await?;
        baseband.post(&registry, cmd::READY).await?;
        for _ in 0..cycles {
            baseband.post(&registry, cmd::READY).await?;
        }

        // Firmware reload and renegotiation.
        baseband.post(&registry, cmd::BOOT_FW_REQ).await?;
        baseband.post(&registry, cmd::BOOT_FW_CONF).await?;
        baseband.post(&registry, cmd::READY).await?;
    }

    let statuses = registry.statuses();

    // Detaching joins worker threads.
    let detached = {
        let registry = Arc::clone(&registry);
        tokio::task::spawn_blocking(move || registry.detach_all()).await?
    };
    for result in detached {
        result?;
    }

    println!();
    println!("{}", serde_json::to_string_pretty(&statuses)?);

    Ok(())
}
