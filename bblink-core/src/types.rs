// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Following the "Newtype" pattern in Rust to ensure valid state by construction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Maximum length of a POSIX shared memory object name (without the leading `/`).
const MAX_SHM_NAME_LEN: usize = 250;

/// Identifier of one AP/BB link. Every piece of per-link state is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(u32);

impl InstanceId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for InstanceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Validated POSIX shared memory object name.
/// Must be non-empty, contain no `/` or NUL, and fit the platform limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShmName(String);

impl ShmName {
    /// Create a new ShmName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "shm_name",
                value: name,
                reason: "Shared memory name cannot be empty".to_string(),
            });
        }

        if name.len() > MAX_SHM_NAME_LEN {
            return Err(HardValidationError::InvalidFieldValue {
                field: "shm_name",
                value: name.clone(),
                reason: format!(
                    "Shared memory name too long: {} chars (max {})",
                    name.len(),
                    MAX_SHM_NAME_LEN
                ),
            });
        }

        if name.contains('/') || name.contains('\0') {
            return Err(HardValidationError::InvalidFieldValue {
                field: "shm_name",
                value: name,
                reason: "Shared memory name must not contain '/' or NUL".to_string(),
            });
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ShmName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShmName> for String {
    fn from(name: ShmName) -> Self {
        name.0
    }
}
