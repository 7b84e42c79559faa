//! CLI module - Command-line interface for GDASH
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// GDASH - Weather dashboard backend
#[derive(Parser)]
#[command(name = "gdash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API (default when no command is given)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Grant a role to an existing account. The only way to create an admin-master.
    SetRole {
        /// Email of the account
        email: String,
        /// One of: user, admin, admin-master
        role: String,
    },
}

pub use commands::*;
