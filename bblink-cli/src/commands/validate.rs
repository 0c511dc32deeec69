// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `bblink validate` command - Validate a link settings file.

use bblink_core::ConfigLoader;

pub async fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating link settings");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Links ({}):", config.links.len());
            for link in &config.links {
                println!(
                    "  - instance {} (mailbox: {} [{} bytes], ipc: {} [{} bytes])",
                    link.instance,
                    link.mailbox_shm,
                    link.mailbox_size,
                    link.ipc_shm,
                    link.ipc_size
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
