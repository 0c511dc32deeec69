// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Collaborator interfaces driven by the control state machine.
//!
//! The shared queue, the buffer pool and the channel adapters move payloads
//! once a link is up. They live outside this crate; the control plane only
//! initialises, drives and aborts them.

use std::fmt;

use serde::Serialize;

use crate::channel::ChannelTable;
use crate::error::CollaboratorError;
use crate::hw::IpcSignal;
use crate::shm::{SharedMemoryRegion, ShmLayout};
use crate::types::InstanceId;

/// Borrowed view of a configured link handed to collaborators.
pub struct LinkContext<'a> {
    pub instance: InstanceId,
    pub channels: &'a ChannelTable,
    pub layout: &'a ShmLayout,
    pub ipc: &'a SharedMemoryRegion,
    pub signal: &'a IpcSignal,
}

/// Shared queue between AP and BB.
pub trait SharedQueue: Send {
    /// Build queue state on top of a freshly negotiated layout.
    fn init(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError>;

    /// Drain and dispatch whatever the peer queued.
    fn process(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError>;

    /// Drop all in-flight buffers; the peer is about to invalidate memory.
    fn abort(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError>;
}

/// Buffer pool carved out of the descriptor and data regions.
pub trait BufferPool: Send {
    fn init(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError>;
}

/// A family of channel consumers (all terminal channels, all network channels).
pub trait ChannelAdapter: Send {
    fn init(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError>;

    fn cleanup(&mut self, instance: InstanceId) -> Result<(), CollaboratorError>;
}

/// Channel kinds that have an adapter lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AdapterFamily {
    Terminal,
    Network,
}

impl AdapterFamily {
    pub const ALL: [AdapterFamily; 2] = [AdapterFamily::Terminal, AdapterFamily::Network];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Network => "network",
        }
    }
}

impl fmt::Display for AdapterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Maps each adapter family to its init/cleanup implementation.
#[derive(Default)]
pub struct AdapterRegistry {
    terminal: Option<Box<dyn ChannelAdapter>>,
    network: Option<Box<dyn ChannelAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the adapter for `family`, replacing any previous one.
    pub fn register(&mut self, family: AdapterFamily, adapter: Box<dyn ChannelAdapter>) {
        *self.slot(family) = Some(adapter);
    }

    pub fn with(mut self, family: AdapterFamily, adapter: Box<dyn ChannelAdapter>) -> Self {
        self.register(family, adapter);
        self
    }

    pub fn contains(&self, family: AdapterFamily) -> bool {
        match family {
            AdapterFamily::Terminal => self.terminal.is_some(),
            AdapterFamily::Network => self.network.is_some(),
        }
    }

    fn slot(&mut self, family: AdapterFamily) -> &mut Option<Box<dyn ChannelAdapter>> {
        match family {
            AdapterFamily::Terminal => &mut self.terminal,
            AdapterFamily::Network => &mut self.network,
        }
    }

    pub(crate) fn init(
        &mut self,
        family: AdapterFamily,
        ctx: &LinkContext<'_>,
    ) -> Result<(), CollaboratorError> {
        match self.slot(family) {
            Some(adapter) => adapter.init(ctx),
            None => {
                tracing::warn!(instance = %ctx.instance, family = %family, "No adapter registered");
                Ok(())
            }
        }
    }

    pub(crate) fn cleanup(
        &mut self,
        family: AdapterFamily,
        instance: InstanceId,
    ) -> Result<(), CollaboratorError> {
        match self.slot(family) {
            Some(adapter) => adapter.cleanup(instance),
            None => Ok(()),
        }
    }
}

/// Everything the state machine drives for one link.
pub struct Collaborators {
    pub queue: Box<dyn SharedQueue>,
    pub pool: Box<dyn BufferPool>,
    pub adapters: AdapterRegistry,
}

impl Collaborators {
    pub fn new(
        queue: Box<dyn SharedQueue>,
        pool: Box<dyn BufferPool>,
        adapters: AdapterRegistry,
    ) -> Self {
        Self {
            queue,
            pool,
            adapters,
        }
    }

    /// Logging stand-ins for every collaborator.
    pub fn logging() -> Self {
        Self::new(
            Box::new(LoggingQueue),
            Box::new(LoggingPool),
            AdapterRegistry::new()
                .with(
                    AdapterFamily::Terminal,
                    Box::new(LoggingAdapter::new(AdapterFamily::Terminal)),
                )
                .with(
                    AdapterFamily::Network,
                    Box::new(LoggingAdapter::new(AdapterFamily::Network)),
                ),
        )
    }
}

/// Queue stand-in that checks the negotiated layout and logs activity.
#[derive(Debug, Default)]
pub struct LoggingQueue;

impl SharedQueue for LoggingQueue {
    fn init(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError> {
        let size = ctx.ipc.size();
        let offsets = [("head", ctx.layout.queue_head), ("tail", ctx.layout.queue_tail)];
        for (what, offset) in offsets {
            if offset >= size {
                return Err(CollaboratorError::Queue {
                    operation: "init",
                    reason: format!(
                        "queue {} offset {:#x} outside region of {:#x}",
                        what, offset, size
                    ),
                });
            }
        }
        tracing::info!(
            instance = %ctx.instance,
            head = ctx.layout.queue_head,
            tail = ctx.layout.queue_tail,
            "Shared queue initialised"
        );
        Ok(())
    }

    fn process(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError> {
        tracing::debug!(instance = %ctx.instance, "Shared queue processed");
        Ok(())
    }

    fn abort(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError> {
        tracing::info!(instance = %ctx.instance, "Shared queue aborted");
        Ok(())
    }
}

/// Buffer pool stand-in that checks both regions fit the mapping.
#[derive(Debug, Default)]
pub struct LoggingPool;

impl BufferPool for LoggingPool {
    fn init(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError> {
        let size = ctx.ipc.size();
        if !ctx.layout.desc.fits(size) || !ctx.layout.data.fits(size) {
            return Err(CollaboratorError::BufferPool {
                reason: format!(
                    "desc {:?} / data {:?} outside region of {:#x}",
                    ctx.layout.desc, ctx.layout.data, size
                ),
            });
        }
        tracing::info!(
            instance = %ctx.instance,
            desc_size = ctx.layout.desc.len,
            data_size = ctx.layout.data.len,
            "Buffer pool initialised"
        );
        Ok(())
    }
}

/// Adapter stand-in that logs the channels of its family.
#[derive(Debug)]
pub struct LoggingAdapter {
    family: AdapterFamily,
}

impl LoggingAdapter {
    pub fn new(family: AdapterFamily) -> Self {
        Self { family }
    }
}

impl ChannelAdapter for LoggingAdapter {
    fn init(&mut self, ctx: &LinkContext<'_>) -> Result<(), CollaboratorError> {
        for chan in ctx.channels.of_family(self.family) {
            // Interfaces are registered under the channel name.
            if chan.name.is_empty() {
                return Err(CollaboratorError::Adapter {
                    family: self.family,
                    operation: "init",
                    reason: format!("channel {} has no name", chan.index),
                });
            }
            tracing::info!(
                instance = %ctx.instance,
                family = %self.family,
                chan = chan.index,
                name = %chan.name,
                "Channel up"
            );
        }
        Ok(())
    }

    fn cleanup(&mut self, instance: InstanceId) -> Result<(), CollaboratorError> {
        tracing::info!(instance = %instance, family = %self.family, "Channels down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelType;
    use crate::hw::LoopbackLink;
    use crate::shm::{ConfigBlockBuilder, Span};

    fn layout(head: usize, data_len: usize) -> ShmLayout {
        ShmLayout {
            desc: Span { offset: 0, len: 1024 },
            data: Span {
                offset: 1024,
                len: data_len,
            },
            queue_head: head,
            queue_tail: 64,
        }
    }

    #[test]
    fn test_logging_queue_rejects_out_of_range_head() {
        let ipc = SharedMemoryRegion::anonymous(4096).unwrap();
        let signal = IpcSignal::new(LoopbackLink::new_shared());
        let channels = ChannelTable::new();
        let good = layout(32, 1024);
        let bad = layout(8192, 1024);

        let ctx = LinkContext {
            instance: InstanceId::new(0),
            channels: &channels,
            layout: &good,
            ipc: &ipc,
            signal: &signal,
        };
        assert!(LoggingQueue.init(&ctx).is_ok());

        let ctx = LinkContext { layout: &bad, ..ctx };
        assert!(matches!(
            LoggingQueue.init(&ctx),
            Err(CollaboratorError::Queue { .. })
        ));
    }

    #[test]
    fn test_logging_pool_rejects_oversized_data() {
        let ipc = SharedMemoryRegion::anonymous(4096).unwrap();
        let signal = IpcSignal::new(LoopbackLink::new_shared());
        let channels = ChannelTable::new();
        let bad = layout(32, 8192);
        let ctx = LinkContext {
            instance: InstanceId::new(0),
            channels: &channels,
            layout: &bad,
            ipc: &ipc,
            signal: &signal,
        };
        assert!(LoggingPool.init(&ctx).is_err());
    }

    #[test]
    fn test_logging_adapter_rejects_unnamed_channel() {
        let ipc = SharedMemoryRegion::anonymous(4096).unwrap();
        let signal = IpcSignal::new(LoopbackLink::new_shared());
        let block = ConfigBlockBuilder::new(4096)
            .channel(0, ChannelType::Terminal, "at0")
            .channel(1, ChannelType::Network, "")
            .build();
        let channels = ChannelTable::from_map(&block.chan_map);
        let good = layout(32, 1024);
        let ctx = LinkContext {
            instance: InstanceId::new(0),
            channels: &channels,
            layout: &good,
            ipc: &ipc,
            signal: &signal,
        };

        assert!(LoggingAdapter::new(AdapterFamily::Terminal).init(&ctx).is_ok());
        let err = LoggingAdapter::new(AdapterFamily::Network)
            .init(&ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            CollaboratorError::Adapter {
                family: AdapterFamily::Network,
                operation: "init",
                ..
            }
        ));
        assert_eq!(err.to_string(), "network adapter init failed: channel 1 has no name");
    }

    #[test]
    fn test_registry_slots() {
        let registry = AdapterRegistry::new().with(
            AdapterFamily::Network,
            Box::new(LoggingAdapter::new(AdapterFamily::Network)),
        );
        assert!(registry.contains(AdapterFamily::Network));
        assert!(!registry.contains(AdapterFamily::Terminal));
    }
}
