use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::simulate::Step;
use crate::utils::version;

#[derive(Parser)]
#[command(author, version = version(), about, long_about = None)]
#[command(subcommand_value_name = "SUBCOMMAND")]
#[command(subcommand_help_heading = "Subcommands")]
pub struct Cli {
    /// Path to config file (default: `$XDG_CONFIG_HOME/policyangel/cards.kdl`).
    ///
    /// This can also be set with the `POLICYANGEL_CARDS_CONFIG` environment variable. If both are
    /// set, the command line argument takes precedence.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub subcommand: Sub,
}

#[derive(Subcommand)]
pub enum Sub {
    /// Validate the config file.
    Validate,
    /// Replay a scripted sequence of interactions on a deck and print every step.
    Simulate {
        /// Name of the configured deck to take the settings from.
        #[arg(short, long, default_value = policyangel_config::ACTION_CARDS)]
        stack: String,
        /// Number of cards to start with.
        #[arg(short = 'n', long, default_value_t = 4)]
        cards: usize,
        /// Format output as JSON.
        #[arg(short, long)]
        json: bool,
        /// Steps to replay: `drag:<px>[@<px/s>]`, `remove:<card id>`, `wait:<ms>`, or `timer`.
        #[arg(required = true)]
        steps: Vec<Step>,
    },
}
