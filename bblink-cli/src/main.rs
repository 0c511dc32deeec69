// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! bblink CLI
//!
//! Command-line interface for inspecting and simulating AP/BB shared-memory links.

use clap::{Parser, Subcommand};

mod commands;

/// bblink - AP/baseband shared-memory link control plane
#[derive(Parser)]
#[command(name = "bblink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Link settings file path
    #[arg(short, long, default_value = "bblink.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a link settings file
    Validate {
        /// Path to the settings file
        file: String,
    },

    /// Decode a raw mailbox word
    Decode {
        /// Mailbox word, hex (0x...) or decimal
        word: String,
    },

    /// Print the config block published in a link's mailbox
    Inspect {
        /// Link instance number
        instance: u32,
    },

    /// Run links against an in-process simulated baseband
    Simulate {
        /// Number of READY cycles played after negotiation
        #[arg(short = 'n', long, default_value_t = 3)]
        cycles: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match cli.command {
        Commands::Validate { file } => commands::validate::execute(&file).await,
        Commands::Decode { word } => commands::decode::execute(&word).await,
        Commands::Inspect { instance } => commands::inspect::execute(&cli.config, instance).await,
        Commands::Simulate { cycles } => commands::simulate::execute(&cli.config, cycles).await,
    }
}
