// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! End-to-end integration tests for bblink.
//!
//! These tests play the baseband side through a loopback hardware link and
//! verify what the control plane drives on the AP side.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bblink_core::shm::layout::MAILBOX_OFFSET;
use bblink_core::shm::{cmd, ConfigBlockBuilder, MailboxMessage, SharedMemoryRegion};
use bblink_core::{
    AdapterFamily, AdapterRegistry, BufferPool, ChannelAdapter, ChannelType, CollaboratorError,
    Collaborators, ConfigLoader, InstanceId, IpcLifecycle, LinkContext, LinkInstance,
    LinkRegistry, LoopbackLink, SharedQueue,
};
use tempfile::TempDir;

const IPC_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    PoolInit,
    QueueInit,
    QueueProcess,
    QueueAbort,
    Init(AdapterFamily, usize),
    Cleanup(AdapterFamily),
}

type CallLog = Arc<Mutex<Vec<Call>>>;

struct RecordingQueue(CallLog);

impl SharedQueue for RecordingQueue {
    fn init(&mut self, _ctx: &LinkContext<'_>) -> Result<(), CollaboratorError> {
        self.0.lock().unwrap().push(Call::QueueInit);
        Ok(())
    }

    fn process(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError> {
        self.0.lock().unwrap().push(Call::QueueProcess);
        // A real queue signals the peer after handing buffers back.
        ctx.signal.generate();
        Ok(())
    }

    fn abort(&mut self, _ctx: &LinkContext<'_>) -> Result<(), CollaboratorError> {
        self.0.lock().unwrap().push(Call::QueueAbort);
        Ok(())
    }
}

struct RecordingPool(CallLog);

impl BufferPool for RecordingPool {
    fn init(&mut self, _ctx: &LinkContext<'_>) -> Result<(), CollaboratorError> {
        self.0.lock().unwrap().push(Call::PoolInit);
        Ok(())
    }
}

struct RecordingAdapter(CallLog, AdapterFamily);

impl ChannelAdapter for RecordingAdapter {
    fn init(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError> {
        let channels = ctx.channels.of_family(self.1).count();
        self.0.lock().unwrap().push(Call::Init(self.1, channels));
        Ok(())
    }

    fn cleanup(&mut self, _instance: InstanceId) -> Result<(), CollaboratorError> {
        self.0.lock().unwrap().push(Call::Cleanup(self.1));
        Ok(())
    }
}

/// Baseband side of one link.
struct Peer {
    mailbox: Arc<SharedMemoryRegion>,
    link: Arc<LoopbackLink>,
}

impl Peer {
    /// Publish a config block with 2 terminal, 0 log, 1 network channels.
    fn publish_config(&self, version: Option<u32>) {
        let mut builder = ConfigBlockBuilder::new(IPC_SIZE as u32)
            .desc_region(0x1000, 0x4000)
            .data_region(0x8000, 0x20000)
            .queues(0x100, 0x200)
            .channel(0, ChannelType::Terminal, "at0")
            .channel(1, ChannelType::Terminal, "at1")
            .channel(4, ChannelType::Network, "rmnet0");
        if let Some(version) = version {
            builder = builder.version(version);
        }
        builder.build().write_to(&self.mailbox).unwrap();
    }

    /// Write a word and raise the interrupt, then wait for the run that
    /// handles it to complete.
    fn deliver(&self, lifecycle: &IpcLifecycle, word: u32) {
        let before = lifecycle.status().runs;
        self.mailbox.write_u32(MAILBOX_OFFSET, word).unwrap();
        assert!(self.link.raise(), "no handler registered");

        let deadline = Instant::now() + Duration::from_secs(5);
        while lifecycle.status().runs <= before {
            assert!(Instant::now() < deadline, "worker did not run");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn send(&self, lifecycle: &IpcLifecycle, command: u16) {
        self.deliver(lifecycle, MailboxMessage::encode(command));
    }
}

fn setup(id: u32) -> (Peer, IpcLifecycle, CallLog) {
    let mailbox = Arc::new(SharedMemoryRegion::anonymous(4096).unwrap());
    let ipc = Arc::new(SharedMemoryRegion::anonymous(IPC_SIZE).unwrap());
    let instance = LinkInstance::attach(InstanceId::new(id), mailbox.clone(), ipc).unwrap();

    let log: CallLog = Arc::default();
    let adapters = AdapterRegistry::new()
        .with(
            AdapterFamily::Terminal,
            Box::new(RecordingAdapter(log.clone(), AdapterFamily::Terminal)),
        )
        .with(
            AdapterFamily::Network,
            Box::new(RecordingAdapter(log.clone(), AdapterFamily::Network)),
        );
    let collab = Collaborators::new(
        Box::new(RecordingQueue(log.clone())),
        Box::new(RecordingPool(log.clone())),
        adapters,
    );

    let link = LoopbackLink::new_shared();
    let lifecycle = IpcLifecycle::register(instance, collab, link.clone()).unwrap();
    (Peer { mailbox, link }, lifecycle, log)
}

fn take(log: &CallLog) -> Vec<Call> {
    std::mem::take(&mut *log.lock().unwrap())
}

fn negotiation() -> Vec<Call> {
    vec![
        Call::PoolInit,
        Call::QueueInit,
        Call::Init(AdapterFamily::Terminal, 2),
        Call::Init(AdapterFamily::Network, 1),
    ]
}

fn teardown() -> Vec<Call> {
    vec![
        Call::QueueAbort,
        Call::Cleanup(AdapterFamily::Terminal),
        Call::Cleanup(AdapterFamily::Network),
    ]
}

/// READY then READY: one negotiation, then queue processing only.
#[test]
fn test_ready_negotiates_once_then_processes_queue() {
    let (peer, lifecycle, log) = setup(0);
    peer.publish_config(None);

    peer.deliver(&lifecycle, 0xFFFE_0001);
    assert_eq!(take(&log), negotiation());
    assert!(lifecycle.status().configured);

    peer.deliver(&lifecycle, 0xFFFE_0001);
    peer.deliver(&lifecycle, 0xFFFE_0001);
    assert_eq!(take(&log), vec![Call::QueueProcess, Call::QueueProcess]);

    let status = lifecycle.status();
    assert_eq!(status.negotiations, 1);
    assert_eq!(status.queue_passes, 2);
    assert_eq!(peer.link.generated(), 2);

    lifecycle.unregister().unwrap();
}

/// Corrupted word while configured: abort + cleanup once, status kept.
#[test]
fn test_corrupted_word_tears_down_configured_link() {
    let (peer, lifecycle, log) = setup(1);
    peer.publish_config(None);
    peer.send(&lifecycle, cmd::READY);
    take(&log);

    peer.deliver(&lifecycle, 0x0000_0001);
    assert_eq!(take(&log), teardown());

    let status = lifecycle.status();
    assert!(!status.configured);
    assert_eq!(status.old_status, cmd::READY);
    assert_eq!(status.integrity_failures, 1);

    // Nothing left to tear down on a second corrupted word.
    peer.deliver(&lifecycle, 0xDEAD_BEEF);
    assert!(take(&log).is_empty());

    lifecycle.unregister().unwrap();
}

/// Firmware (re)load request while configured tears the link down before
/// the status changes; the following READY renegotiates.
#[test]
fn test_firmware_reload_cycle() {
    let (peer, lifecycle, log) = setup(2);
    peer.publish_config(None);
    peer.send(&lifecycle, cmd::READY);
    take(&log);

    peer.send(&lifecycle, cmd::BOOT_FW_REQ);
    assert_eq!(take(&log), teardown());
    assert_eq!(lifecycle.status().old_status, cmd::BOOT_FW_REQ);

    peer.send(&lifecycle, cmd::READY);
    assert_eq!(take(&log), negotiation());

    peer.send(&lifecycle, cmd::BOOT_RESTART_FW_REQ);
    assert_eq!(take(&log), teardown());

    peer.send(&lifecycle, cmd::READY);
    peer.send(&lifecycle, cmd::READY);
    let mut expected = negotiation();
    expected.push(Call::QueueProcess);
    assert_eq!(take(&log), expected);

    lifecycle.unregister().unwrap();
}

/// Wrong config version leaves the link unconfigured and nothing started.
#[test]
fn test_version_mismatch_keeps_link_down() {
    let (peer, lifecycle, log) = setup(3);
    peer.publish_config(Some(0x0002_0000));

    peer.send(&lifecycle, cmd::READY);
    assert!(take(&log).is_empty());
    assert!(!lifecycle.status().configured);

    // Firmware fixed and reloaded.
    peer.send(&lifecycle, cmd::BOOT_FW_REQ);
    peer.publish_config(None);
    peer.send(&lifecycle, cmd::READY);
    assert_eq!(take(&log), negotiation());

    lifecycle.unregister().unwrap();
}

/// Boot errors, unsolicited boot messages and unknown commands are logged only.
#[test]
fn test_boot_failures_are_informational() {
    let (peer, lifecycle, log) = setup(4);
    peer.publish_config(None);
    peer.send(&lifecycle, cmd::READY);
    take(&log);

    for raw in [
        cmd::BOOT_ERROR_BT2_SIGN,
        cmd::BOOT_ERROR_APP_HDR,
        cmd::BOOT_COLD_BOOT_IND,
        cmd::BOOT_FW_CONF,
        0x0BAD,
    ] {
        peer.send(&lifecycle, raw);
        assert_eq!(lifecycle.status().old_status, raw);
    }
    assert!(take(&log).is_empty());
    assert!(lifecycle.status().configured);

    lifecycle.unregister().unwrap();
}

/// Unregister drains queued work before the callback goes away.
#[test]
fn test_unregister_drains_before_deregistering() {
    let (peer, lifecycle, log) = setup(5);
    peer.publish_config(None);

    peer.mailbox
        .write_u32(MAILBOX_OFFSET, MailboxMessage::encode(cmd::READY))
        .unwrap();
    assert!(peer.link.raise());

    let machine = lifecycle.unregister().unwrap();
    assert!(!peer.link.is_registered());
    assert!(machine.instance().is_configured());
    assert_eq!(take(&log), negotiation());

    assert!(!peer.link.raise());
}

/// Two links run side by side without sharing state.
#[test]
fn test_independent_links_in_registry() {
    let registry = LinkRegistry::new();
    let (peer_a, lifecycle_a, log_a) = setup(10);
    let (peer_b, lifecycle_b, log_b) = setup(11);
    peer_a.publish_config(None);
    peer_b.publish_config(None);

    peer_a.send(&lifecycle_a, cmd::READY);
    peer_b.send(&lifecycle_b, cmd::BOOT_FW_REQ);

    registry.attach(lifecycle_a).unwrap();
    registry.attach(lifecycle_b).unwrap();

    let statuses = registry.statuses();
    assert_eq!(statuses.len(), 2);
    assert!(statuses[0].configured);
    assert!(!statuses[1].configured);
    assert_eq!(take(&log_a), negotiation());
    assert!(take(&log_b).is_empty());

    registry.generate(InstanceId::new(11)).unwrap();
    assert_eq!(peer_b.link.generated(), 1);
    assert_eq!(peer_a.link.generated(), 0);

    for result in registry.detach_all() {
        result.unwrap();
    }
    assert!(!peer_a.link.is_registered());
    assert!(!peer_b.link.is_registered());
}

/// Settings loading from a file.
#[test]
fn test_config_loading_and_validation() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("bblink.yaml");

    std::fs::write(
        &config_path,
        r#"
links:
  - instance: 0
    mailbox_shm: bblink-mb0
    ipc_shm: bblink-ipc0
    ipc_size: 1048576
  - instance: 1
    mailbox_shm: bblink-mb1
    mailbox_size: 8192
    ipc_shm: bblink-ipc1
"#,
    )
    .expect("Failed to write config");

    let config = ConfigLoader::load_file(&config_path).expect("Failed to load config");
    assert_eq!(config.links.len(), 2);
    assert_eq!(config.links[1].mailbox_size, 8192);
    assert_eq!(config.links[1].ipc_size, 4 * 1024 * 1024);

    assert!(ConfigLoader::load_file(temp_dir.path().join("missing.yaml")).is_err());
}

/// Named regions: the reader sees what another mapping of the object wrote.
#[test]
fn test_named_region_shared_between_mappings() {
    let name = format!("bblink_test_mb_{}", std::process::id());
    let owner = SharedMemoryRegion::create(&name, 4096).expect("Failed to create SHM region");
    let opened = SharedMemoryRegion::open(&name, 4096).expect("Failed to open SHM region");

    ConfigBlockBuilder::new(IPC_SIZE as u32)
        .channel(3, ChannelType::Log, "trace")
        .build()
        .write_to(&owner)
        .unwrap();
    owner
        .write_u32(MAILBOX_OFFSET, MailboxMessage::encode(cmd::READY))
        .unwrap();

    let block = bblink_core::shm::ConfigBlock::read_from(&opened).unwrap();
    assert_eq!(block.chan_map[3].name_lossy(), "trace");
    assert_eq!(
        MailboxMessage::validate(opened.read_u32(MAILBOX_OFFSET).unwrap()),
        Ok(cmd::READY)
    );
}
