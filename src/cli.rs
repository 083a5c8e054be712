//! Command-line interface definition for Mira
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chatting, managing sessions and checking the backend.

use clap::{Parser, Subcommand};

/// Mira - knowledge assistant chat client
///
/// Ask questions against a document-indexing assistant backend and keep
/// the conversations locally.
#[derive(Parser, Debug, Clone)]
#[command(name = "mira")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the assistant backend base URL
    #[arg(long)]
    pub api_base: Option<String>,

    /// Override where sessions are stored (database file or snapshot directory)
    #[arg(long)]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Mira
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat in the active session
    Chat,

    /// Send a single question and print the answer
    Ask {
        /// Question text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Manage stored chat sessions
    Sessions {
        /// Session subcommand
        #[command(subcommand)]
        command: SessionsCommand,
    },

    /// Clear the active conversation
    Clear,

    /// Show backend readiness and knowledge base counters
    Status,
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionsCommand {
    /// List stored sessions, newest first
    List {
        /// Only show sessions whose title or preview contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Print the active conversation
    Show,

    /// Make a past session the active one
    Switch {
        /// Session id (see `mira sessions list`)
        id: String,
    },

    /// Archive the active conversation and start a new one
    New,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            api_base: None,
            storage_path: None,
            command: Commands::Status,
        }
    }
}
