// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `bblink decode` command - Decode a raw mailbox word.

use bblink_core::shm::{IpcCommand, MailboxMessage};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Invalid mailbox word '{input}': expected a 32-bit hex (0x...) or decimal value")]
pub struct ParseWordError {
    input: String,
}

/// Parse a 32-bit word written as `0x`-prefixed hex or decimal.
pub fn parse_word(input: &str) -> Result<u32, ParseWordError> {
    let trimmed = input.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => trimmed.replace('_', "").parse::<u32>(),
    };
    parsed.map_err(|_| ParseWordError {
        input: input.to_string(),
    })
}

pub async fn execute(word: &str) -> Result<(), Box<dyn std::error::Error>> {
    let word = parse_word(word)?;

    println!("Word:     {:#010x}", word);
    println!("Command:  {:#06x}", word & 0xFFFF);
    println!("Check:    {:#06x}", word >> 16);

    match MailboxMessage::decode(word) {
        Ok(command) => {
            println!("Integrity: ✓ ok");
            println!("Decoded:  {}", command);
            if let IpcCommand::Unknown(_) = command {
                println!("          (not a command known to the control plane)");
            }
        }
        Err(e) => {
            println!("Integrity: ✗ {}", e);
            println!(
                "Expected: {:#010x}",
                MailboxMessage::encode((word & 0xFFFF) as u16)
            );
        }
    }

    Ok(())
}
