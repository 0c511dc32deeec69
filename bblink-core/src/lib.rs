//! bblink Core Library
//!
//! Control plane of the shared-memory IPC link between an application
//! processor and a baseband modem. Parses the shared memory layout
//! negotiated by the baseband, validates mailbox messages, and drives the
//! state machine that brings channels up and down on a serialized worker.

pub mod channel;
pub mod collab;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hw;
pub mod instance;
pub mod lifecycle;
pub mod registry;
pub mod shm;
pub mod state;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use channel::{ChannelCounts, ChannelEntry, ChannelTable, ChannelType};
pub use collab::{
    AdapterFamily, AdapterRegistry, BufferPool, ChannelAdapter, Collaborators, LinkContext,
    SharedQueue,
};
pub use config::{Config, ConfigLoader, LinkConfig};
pub use error::{
    CollaboratorError, HardValidationError, LifecycleError, LinkError, LinkResult,
    NegotiationError, ProtocolError, SharedMemoryError,
};
pub use hw::{HardwareLink, IpcHandler, IpcSignal, LoopbackLink};
pub use instance::LinkInstance;
pub use lifecycle::IpcLifecycle;
pub use registry::LinkRegistry;
pub use state::ControlStateMachine;
pub use stats::{LinkStats, LinkStatus};
pub use types::{InstanceId, ShmName};
