//! Thread-safe link registry using DashMap.
//!
//! Instance table for every attached AP/BB link. Each link keeps its own
//! state and worker; nothing is process-wide.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{LifecycleError, LinkResult};
use crate::lifecycle::IpcLifecycle;
use crate::state::ControlStateMachine;
use crate::stats::LinkStatus;
use crate::types::InstanceId;

/// Thread-safe registry of attached links.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    links: DashMap<InstanceId, IpcLifecycle>,
}

impl LinkRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            links: DashMap::new(),
        }
    }

    /// Create a registry wrapped in an Arc for sharing across threads.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Add a registered link.
    ///
    /// On a duplicate instance the rejected link is unregistered again so
    /// its worker does not leak.
    pub fn attach(&self, lifecycle: IpcLifecycle) -> LinkResult<()> {
        let id = lifecycle.instance();

        let rejected = match self.links.entry(id) {
            Entry::Occupied(_) => Some(lifecycle),
            Entry::Vacant(slot) => {
                slot.insert(lifecycle);
                None
            }
        };

        // Shard lock is released here; draining may block.
        match rejected {
            Some(lifecycle) => {
                if let Err(e) = lifecycle.unregister() {
                    tracing::error!(
                        instance = %id,
                        error = %e,
                        "Rejected link failed to unregister"
                    );
                }
                Err(LifecycleError::AlreadyAttached(id).into())
            }
            None => {
                tracing::debug!(instance = %id, "Link attached");
                Ok(())
            }
        }
    }

    /// Remove a link and unregister it, draining its worker.
    pub fn detach(&self, id: InstanceId) -> LinkResult<ControlStateMachine> {
        let (_, lifecycle) = self
            .links
            .remove(&id)
            .ok_or(LifecycleError::NotAttached(id))?;

        let machine = lifecycle.unregister()?;
        tracing::debug!(instance = %id, "Link detached");
        Ok(machine)
    }

    /// Detach every link. Returns the drained state machines.
    pub fn detach_all(&self) -> Vec<LinkResult<ControlStateMachine>> {
        self.instance_ids()
            .into_iter()
            .map(|id| self.detach(id))
            .collect()
    }

    /// Signal the peer of one link.
    pub fn generate(&self, id: InstanceId) -> LinkResult<()> {
        let entry = self
            .links
            .get(&id)
            .ok_or(LifecycleError::NotAttached(id))?;
        entry.generate();
        Ok(())
    }

    pub fn status(&self, id: InstanceId) -> LinkResult<LinkStatus> {
        self.links
            .get(&id)
            .map(|entry| entry.status())
            .ok_or_else(|| LifecycleError::NotAttached(id).into())
    }

    /// Status of every link, ordered by instance.
    pub fn statuses(&self) -> Vec<LinkStatus> {
        let mut statuses: Vec<_> = self.links.iter().map(|r| r.status()).collect();
        statuses.sort_by_key(|s| s.instance);
        statuses
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.links.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn instance_ids(&self) -> Vec<InstanceId> {
        let mut ids: Vec<_> = self.links.iter().map(|r| *r.key()).collect();
        ids.sort();
        ids
    }
}
