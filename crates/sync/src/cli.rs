// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const QUICKSTART_HELP: &str = "\
Get started:
  orb-sync login --token <TOKEN>            Store the API token
  orb-sync watch -g family_123              Follow the family orb live
  orb-sync push -g family_123 --value 4200  Publish a new value";

#[derive(Parser, Debug)]
#[command(name = "orb-sync")]
#[command(about = "Keeps a family's shared orb in sync across members")]
#[command(
    long_about = "Keeps a family's shared orb in sync across members.\n\n\
    Uses a WebSocket channel when available and falls back to HTTP polling while it is down."
)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Config file (defaults to $ORB_SYNC_CONFIG or the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store the API token used for both channels
    Login {
        #[arg(long)]
        token: String,
    },

    /// Forget the stored API token
    Logout,

    /// Print shared orb events until interrupted
    Watch {
        /// Family group id
        #[arg(long, short)]
        group: String,
    },

    /// Publish a new orb value
    #[command(after_help = "Examples:\n  \
        orb-sync push -g family_123 --value 4200\n  \
        orb-sync push -g family_123 --value 4200 --view-mode grid")]
    Push {
        /// Family group id
        #[arg(long, short)]
        group: String,

        /// New numeric value
        #[arg(long, allow_negative_numbers = true)]
        value: f64,

        /// Presentation mode to share along with the value
        #[arg(long)]
        view_mode: Option<String>,
    },

    /// Send a gesture to the other members
    Gesture {
        /// Family group id
        #[arg(long, short)]
        group: String,

        /// Gesture name (e.g. "tap", "swipe")
        #[arg(long, short)]
        name: String,
    },

    /// Connect briefly and report the sync status
    Status {
        /// Family group id
        #[arg(long, short)]
        group: String,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
