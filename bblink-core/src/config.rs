// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML link settings with strict schema validation.
//!
//! Describes which shared memory objects back each AP/BB link.
//! Any invalid field results in a HardValidationError.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HardValidationError, LinkError, LinkResult};
use crate::shm::layout::mailbox_region_min_size;
use crate::shm::SharedMemoryRegion;
use crate::types::{InstanceId, ShmName};

/// Raw link settings as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawLinkConfig {
    instance: Option<u32>,
    mailbox_shm: Option<String>,
    #[serde(default = "default_mailbox_size")]
    mailbox_size: usize,
    ipc_shm: Option<String>,
    #[serde(default = "default_ipc_size")]
    ipc_size: usize,
}

fn default_mailbox_size() -> usize {
    4096
}

fn default_ipc_size() -> usize {
    4 * 1024 * 1024 // 4MB
}

/// Raw root settings file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    links: Vec<RawLinkConfig>,
}

/// Validated settings of one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub instance: InstanceId,
    pub mailbox_shm: ShmName,
    pub mailbox_size: usize,
    pub ipc_shm: ShmName,
    pub ipc_size: usize,
}

/// Complete validated settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub links: Vec<LinkConfig>,
}

impl Config {
    pub fn link(&self, instance: InstanceId) -> Option<&LinkConfig> {
        self.links.iter().find(|l| l.instance == instance)
    }
}

/// Settings loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate settings from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> LinkResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LinkError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| LinkError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate settings from a YAML string.
    pub fn load_string(content: &str) -> LinkResult<Config> {
        let raw: RawConfig = serde_yaml::from_str(content).map_err(|e| LinkError::ConfigParse {
            message: format!("YAML parse error: {}", e),
        })?;

        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> LinkResult<Config> {
        let mut links = Vec::with_capacity(raw.links.len());
        let mut seen_instances = HashSet::new();
        let mut seen_names = HashSet::new();

        for (index, raw_link) in raw.links.into_iter().enumerate() {
            let link = Self::validate_link(raw_link, index)?;

            if !seen_instances.insert(link.instance) {
                return Err(HardValidationError::DuplicateInstance {
                    instance: link.instance.value(),
                }
                .into());
            }

            for name in [&link.mailbox_shm, &link.ipc_shm] {
                if !seen_names.insert(name.clone()) {
                    return Err(HardValidationError::DuplicateShmName {
                        name: name.to_string(),
                    }
                    .into());
                }
            }

            links.push(link);
        }

        if links.is_empty() {
            return Err(HardValidationError::SchemaValidation {
                message: "At least one link must be defined".to_string(),
            }
            .into());
        }

        Ok(Config { links })
    }

    fn validate_link(raw: RawLinkConfig, index: usize) -> LinkResult<LinkConfig> {
        let context = format!("link at index {}", index);

        let instance = raw
            .instance
            .ok_or_else(|| HardValidationError::MissingRequiredField {
                field: "instance",
                context: context.clone(),
            })?;

        let mailbox_shm = raw
            .mailbox_shm
            .ok_or_else(|| HardValidationError::MissingRequiredField {
                field: "mailbox_shm",
                context: context.clone(),
            })?;
        let mailbox_shm = ShmName::new(mailbox_shm)?;

        let ipc_shm = raw
            .ipc_shm
            .ok_or_else(|| HardValidationError::MissingRequiredField {
                field: "ipc_shm",
                context: context.clone(),
            })?;
        let ipc_shm = ShmName::new(ipc_shm)?;

        let mailbox_min = mailbox_region_min_size().max(SharedMemoryRegion::MIN_SIZE);
        Self::check_size(raw.mailbox_size, mailbox_min)?;
        Self::check_size(raw.ipc_size, SharedMemoryRegion::MIN_SIZE)?;

        Ok(LinkConfig {
            instance: InstanceId::new(instance),
            mailbox_shm,
            mailbox_size: raw.mailbox_size,
            ipc_shm,
            ipc_size: raw.ipc_size,
        })
    }

    fn check_size(size: usize, min: usize) -> Result<(), HardValidationError> {
        let max = SharedMemoryRegion::MAX_SIZE;
        if size < min || size > max {
            return Err(HardValidationError::RegionSizeOutOfBounds { size, min, max });
        }
        Ok(())
    }
}
