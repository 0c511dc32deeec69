// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Channel table and channel-type classification.
//!
//! The channel map is copied out of shared memory at negotiation time; the
//! table below is that snapshot, never a live view of peer-writable memory.
//! Adapter families are started and stopped once per family, not once per
//! channel. Fanning out to individual channels is the adapter's job.

use std::fmt;

use serde::Serialize;

use crate::collab::{AdapterFamily, AdapterRegistry, LinkContext};
use crate::shm::layout::{ChannelMapEntry, MAX_CHANNELS};
use crate::types::InstanceId;

/// Kind of a shared-memory channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ChannelType {
    #[default]
    Unmapped,
    Terminal,
    Log,
    Network,
}

impl ChannelType {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unmapped => "unmapped",
            Self::Terminal => "terminal",
            Self::Log => "log",
            Self::Network => "network",
        }
    }

    /// Raw value used in the channel map.
    pub const fn raw(&self) -> u32 {
        match self {
            Self::Unmapped => 0,
            Self::Terminal => 1,
            Self::Log => 2,
            Self::Network => 3,
        }
    }

    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Unmapped),
            1 => Some(Self::Terminal),
            2 => Some(Self::Log),
            3 => Some(Self::Network),
            _ => None,
        }
    }

    /// Adapter family started for channels of this kind, if any.
    /// Log channels are only counted.
    pub const fn family(&self) -> Option<AdapterFamily> {
        match self {
            Self::Terminal => Some(AdapterFamily::Terminal),
            Self::Network => Some(AdapterFamily::Network),
            Self::Unmapped | Self::Log => None,
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One channel of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelEntry {
    pub index: usize,
    pub kind: ChannelType,
    pub name: String,
}

impl ChannelEntry {
    fn unmapped(index: usize) -> Self {
        Self {
            index,
            kind: ChannelType::Unmapped,
            name: String::new(),
        }
    }

    /// Copy a raw map entry. Unknown kinds are treated as unmapped.
    pub fn from_map(index: usize, map: &ChannelMapEntry) -> Self {
        let kind = match ChannelType::from_raw(map.kind) {
            Some(kind) => kind,
            None => {
                tracing::warn!(
                    chan = index,
                    raw_kind = map.kind,
                    "Unknown channel type, treating as unmapped"
                );
                ChannelType::Unmapped
            }
        };
        Self {
            index,
            kind,
            name: map.name_lossy(),
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.kind != ChannelType::Unmapped
    }
}

/// Number of channels of each mapped kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChannelCounts {
    pub terminal: usize,
    pub log: usize,
    pub network: usize,
}

impl ChannelCounts {
    pub fn of(&self, family: AdapterFamily) -> usize {
        match family {
            AdapterFamily::Terminal => self.terminal,
            AdapterFamily::Network => self.network,
        }
    }
}

/// Fixed-size channel table owned by a link instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelTable {
    entries: Vec<ChannelEntry>,
}

impl ChannelTable {
    /// A table with every channel unmapped.
    pub fn new() -> Self {
        Self {
            entries: (0..MAX_CHANNELS).map(ChannelEntry::unmapped).collect(),
        }
    }

    /// Snapshot a whole channel map.
    pub fn from_map(map: &[ChannelMapEntry; MAX_CHANNELS]) -> Self {
        Self {
            entries: map
                .iter()
                .enumerate()
                .map(|(index, entry)| ChannelEntry::from_map(index, entry))
                .collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&ChannelEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelEntry> {
        self.entries.iter()
    }

    pub fn mapped(&self) -> impl Iterator<Item = &ChannelEntry> {
        self.entries.iter().filter(|c| c.is_mapped())
    }

    /// Channels belonging to an adapter family, for per-channel fan-out.
    pub fn of_family(&self, family: AdapterFamily) -> impl Iterator<Item = &ChannelEntry> {
        self.entries
            .iter()
            .filter(move |c| c.kind.family() == Some(family))
    }

    pub fn counts(&self) -> ChannelCounts {
        self.entries
            .iter()
            .fold(ChannelCounts::default(), |mut counts, chan| {
                match chan.kind {
                    ChannelType::Terminal => counts.terminal += 1,
                    ChannelType::Log => counts.log += 1,
                    ChannelType::Network => counts.network += 1,
                    ChannelType::Unmapped => {}
                }
                counts
            })
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Start every adapter family that has at least one channel.
pub(crate) fn init_interfaces(adapters: &mut AdapterRegistry, ctx: &LinkContext<'_>) {
    let counts = ctx.channels.counts();

    for family in AdapterFamily::ALL {
        let n = counts.of(family);
        if n == 0 {
            continue;
        }
        tracing::debug!(instance = %ctx.instance, family = %family, count = n, "Init channels");
        if let Err(e) = adapters.init(family, ctx) {
            tracing::error!(instance = %ctx.instance, error = %e, "Adapter init failed");
        }
    }

    if counts.log > 0 {
        tracing::debug!(instance = %ctx.instance, count = counts.log, "Init log channels");
    }
}

/// Stop every adapter family that has at least one channel.
pub(crate) fn cleanup_interfaces(
    adapters: &mut AdapterRegistry,
    channels: &ChannelTable,
    instance: InstanceId,
) {
    let counts = channels.counts();

    for family in AdapterFamily::ALL {
        let n = counts.of(family);
        if n == 0 {
            continue;
        }
        tracing::debug!(instance = %instance, family = %family, count = n, "Cleanup channels");
        if let Err(e) = adapters.cleanup(family, instance) {
            tracing::error!(instance = %instance, error = %e, "Adapter cleanup failed");
        }
    }

    if counts.log > 0 {
        tracing::debug!(instance = %instance, count = counts.log, "Cleanup log channels");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::ConfigBlockBuilder;

    #[test]
    fn test_raw_round_trip() {
        for kind in [
            ChannelType::Unmapped,
            ChannelType::Terminal,
            ChannelType::Log,
            ChannelType::Network,
        ] {
            assert_eq!(ChannelType::from_raw(kind.raw()), Some(kind));
        }
        assert_eq!(ChannelType::from_raw(9), None);
    }

    #[test]
    fn test_counts_by_type() {
        let block = ConfigBlockBuilder::new(0)
            .channel(0, ChannelType::Terminal, "at0")
            .channel(3, ChannelType::Terminal, "at1")
            .channel(4, ChannelType::Network, "rmnet0")
            .channel(7, ChannelType::Log, "trace")
            .build();
        let table = ChannelTable::from_map(&block.chan_map);

        assert_eq!(
            table.counts(),
            ChannelCounts {
                terminal: 2,
                log: 1,
                network: 1
            }
        );
        assert_eq!(table.mapped().count(), 4);
        assert_eq!(table.of_family(AdapterFamily::Terminal).count(), 2);
        assert_eq!(table.get(4).map(|c| c.name.as_str()), Some("rmnet0"));
    }

    #[test]
    fn test_unknown_kind_is_unmapped() {
        let mut block = ConfigBlockBuilder::new(0)
            .channel(2, ChannelType::Network, "rmnet0")
            .build();
        block.chan_map[2].kind = 77;
        let table = ChannelTable::from_map(&block.chan_map);

        assert_eq!(table.get(2).map(|c| c.kind), Some(ChannelType::Unmapped));
        assert_eq!(table.counts(), ChannelCounts::default());
    }

    #[test]
    fn test_indices_are_stable() {
        let table = ChannelTable::new();
        for (i, chan) in table.iter().enumerate() {
            assert_eq!(chan.index, i);
        }
        assert_eq!(table.iter().count(), MAX_CHANNELS);
    }
}
