// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for bblink.
//!
//! This module defines explicit enum error types as per coding guidelines.
//! No `Box<dyn Error>`, no `anyhow::Result` - all errors are strongly typed.

use std::path::PathBuf;

use thiserror::Error;

use crate::collab::AdapterFamily;
use crate::shm::BootErrorKind;
use crate::types::InstanceId;

/// Top-level error type for the bblink control plane.
#[derive(Debug, Error)]
pub enum LinkError {
    // =========================================================================
    // Settings Errors - Fail-Fast on Invalid Settings
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Shared Memory Errors
    // =========================================================================
    #[error("Shared memory error: {0}")]
    SharedMemory(#[from] SharedMemoryError),

    // =========================================================================
    // Negotiation and Mailbox Protocol Errors
    // =========================================================================
    #[error("Negotiation error: {0}")]
    Negotiation(#[from] NegotiationError),

    #[error("Mailbox protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // =========================================================================
    // Worker / Hardware Registration Errors
    // =========================================================================
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors reject a settings file outright.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Region size out of bounds: {size} bytes (min: {min}, max: {max})")]
    RegionSizeOutOfBounds { size: usize, min: usize, max: usize },

    #[error("Duplicate link instance: {instance}")]
    DuplicateInstance { instance: u32 },

    #[error("Duplicate shared memory name: {name}")]
    DuplicateShmName { name: String },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },
}

/// Shared memory errors.
#[derive(Debug, Error)]
pub enum SharedMemoryError {
    #[error("Failed to create shared memory region: {name} - {reason}")]
    CreateFailed { name: String, reason: String },

    #[error("Failed to map shared memory: {reason}")]
    MapFailed { reason: String },

    #[error("Access out of bounds: offset {offset:#x} + {len} exceeds region size {size:#x}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    #[error("Region {region} too small: {size} bytes, need at least {required}")]
    RegionTooSmall {
        region: &'static str,
        size: usize,
        required: usize,
    },
}

/// Errors raised while reading the config block negotiated by the peer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// Fatal to the negotiation: nothing else in the block is trusted.
    #[error("Wrong config version {found:#x}, expected {expected:#x}")]
    VersionMismatch { expected: u32, found: u32 },

    /// Recoverable: the externally mapped size wins.
    #[error("Shared memory mapped/reported size mismatch: {mapped:#x}/{reported:#x}")]
    RegionSizeMismatch { mapped: usize, reported: u32 },
}

/// Mailbox protocol errors. All of them are handled inside the worker and
/// only ever surface in logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("IPC check failure msg={word:#010x}")]
    IntegrityFailure { word: u32 },

    #[error("BB startup failure ({kind}): msg={word:#010x}")]
    BootErrorSignaled { kind: BootErrorKind, word: u32 },

    #[error("IPC IT error, unsolicited {command}: msg={word:#010x}")]
    ProtocolViolation { command: &'static str, word: u32 },

    #[error("Unknown IPC message found: msg={word:#010x}")]
    UnknownCommand { word: u32 },
}

/// Errors creating or tearing down the serialized worker.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to spawn worker {name}: {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker {name} panicked while draining")]
    WorkerPanicked { name: String },

    #[error("Link instance {0} is already attached")]
    AlreadyAttached(InstanceId),

    #[error("Link instance {0} is not attached")]
    NotAttached(InstanceId),
}

/// Failures reported by the queue, buffer pool and channel adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Shared queue {operation} failed: {reason}")]
    Queue {
        operation: &'static str,
        reason: String,
    },

    #[error("Buffer pool init failed: {reason}")]
    BufferPool { reason: String },

    #[error("{family} adapter {operation} failed: {reason}")]
    Adapter {
        family: AdapterFamily,
        operation: &'static str,
        reason: String,
    },
}

/// Result type alias using LinkError.
pub type LinkResult<T> = Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_validation_error_display() {
        let err = HardValidationError::MissingRequiredField {
            field: "mailbox_shm",
            context: "link at index 0".to_string(),
        };
        assert!(err.to_string().contains("mailbox_shm"));
        assert!(err.to_string().contains("index 0"));
    }

    #[test]
    fn test_error_chain() {
        let negotiation_err = NegotiationError::VersionMismatch {
            expected: 0x10003,
            found: 0xdead,
        };
        let link_err: LinkError = negotiation_err.into();
        assert!(matches!(link_err, LinkError::Negotiation(_)));
        assert!(link_err.to_string().contains("0xdead"));
    }

    #[test]
    fn test_integrity_failure_shows_raw_word() {
        let err = ProtocolError::IntegrityFailure { word: 0x0000_0001 };
        assert_eq!(err.to_string(), "IPC check failure msg=0x00000001");
    }
}
