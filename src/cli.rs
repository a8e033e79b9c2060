//! Command-line interface definition for Remindr
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for authentication, reminder management and analysis.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Remindr - reminders from voice, text and images
///
/// Manage reminders on a Remindr backend and let it turn free text,
/// recordings and photos into scheduled reminders.
#[derive(Parser, Debug, Clone)]
#[command(name = "remindr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the backend base URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Remindr
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in with email and password
    Login {
        #[arg(short, long)]
        email: Option<String>,

        /// Password (prompted when omitted)
        #[arg(short, long, env = "REMINDR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Email a one-time login or registration code
    RequestOtp {
        #[arg(short, long)]
        email: Option<String>,

        /// Request a registration code instead of a login code
        #[arg(long)]
        register: bool,
    },

    /// Log in with an emailed one-time code
    LoginOtp {
        #[arg(short, long)]
        email: Option<String>,

        /// The code from the email (prompted when omitted)
        #[arg(long)]
        otp: Option<String>,
    },

    /// Create an account with a password and log in
    Register {
        #[arg(short, long)]
        email: Option<String>,

        #[arg(short, long, env = "REMINDR_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Create an account with an emailed one-time code
    RegisterOtp {
        #[arg(short, long)]
        email: Option<String>,

        #[arg(long)]
        otp: Option<String>,

        #[arg(short, long)]
        name: Option<String>,

        /// Optional password for later password logins
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami {
        #[arg(long)]
        json: bool,
    },

    /// Update display name or email
    Profile {
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        email: Option<String>,
    },

    /// List reminders
    List {
        /// all, upcoming, completed or important
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// date, created or title
        #[arg(short, long, default_value = "date")]
        sort: String,

        #[arg(long)]
        json: bool,
    },

    /// List upcoming reminders as reported by the backend
    Upcoming {
        #[arg(long)]
        json: bool,
    },

    /// Show one reminder
    Show {
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Create a reminder
    Add {
        title: String,

        /// Date as YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Time as HH:MM or HH:MM:SS (defaults to now)
        #[arg(short, long)]
        time: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Flag as important
        #[arg(short, long)]
        important: bool,
    },

    /// Change a reminder
    Edit {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// New date as YYYY-MM-DD (keeps the current time unless --time is given)
        #[arg(short, long)]
        date: Option<String>,

        /// New time as HH:MM (keeps the current date unless --date is given)
        #[arg(short, long)]
        time: Option<String>,

        /// Flag as important
        #[arg(long, conflicts_with = "not_important")]
        important: bool,

        /// Clear the important flag
        #[arg(long)]
        not_important: bool,
    },

    /// Delete a reminder
    Delete { id: i64 },

    /// Mark a reminder as done
    Complete { id: i64 },

    /// Mark a reminder as not done
    Uncomplete { id: i64 },

    /// Send text, audio or an image for analysis
    Analyze {
        #[command(subcommand)]
        command: AnalyzeCommand,
    },

    /// Type a reminder and let the backend schedule it as you write
    Compose {
        /// low, medium or high
        #[arg(short, long)]
        priority: Option<String>,
    },

    /// Show live countdowns and alert when reminders are due
    Watch,
}

/// Analysis subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AnalyzeCommand {
    /// Analyze free text
    Text {
        text: String,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Transcribe and analyze an audio recording
    Voice {
        file: PathBuf,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Extract and analyze text from an image
    Image {
        file: PathBuf,

        #[command(flatten)]
        save: SaveArgs,
    },
}

/// Options for turning an analysis into a reminder
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SaveArgs {
    /// Create a reminder when the suggestion is confident enough
    #[arg(long)]
    pub save: bool,

    /// low, medium or high
    #[arg(short, long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            api_url: None,
            json_logs: false,
            command: Commands::Whoami { json: false },
        }
    }
}
