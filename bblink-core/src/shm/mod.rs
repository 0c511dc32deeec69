// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared memory module.
//!
//! Mapping of the mailbox and IPC regions shared with the baseband, the
//! binary layout of the negotiated config block, the config reader, and the
//! mailbox word validator.

pub mod layout;
mod reader;
mod region;
mod validator;

pub use layout::{ConfigBlock, ConfigBlockBuilder, ShmLayout, Span};
pub use reader::ConfigReader;
pub use region::SharedMemoryRegion;
pub use validator::{cmd, BootErrorKind, IpcCommand, MailboxMessage};
