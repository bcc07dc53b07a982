//! CLI entry point for nightbot-sr.

pub mod auth;
pub mod context;
pub mod queue;

use clap::{Parser, Subcommand};

/// Nightbot song-request CLI
#[derive(Parser, Debug)]
#[command(name = "nightbot-sr", version, about = "Control a Nightbot song-request queue")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication management
    Auth(AuthArgs),
    /// Inspect and control the queue
    Queue(QueueArgs),
    /// Turn song requests on or off
    Requests(RequestsArgs),
    /// Print the queue whenever it changes
    Watch(WatchArgs),
    /// Show or change stored settings
    Settings(SettingsArgs),
}

#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Sign in with a device code
    Login,
    /// Show authentication status
    Status,
    /// Forget the stored token
    Logout,
}

#[derive(Parser, Debug)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommands,
}

#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// Print the current queue
    Show,
    Play,
    Pause,
    Skip,
    /// Remove an entry by id
    Delete { id: String },
    /// Move an entry to the front
    Promote { id: String },
    /// Request a song by search text or URL
    Add {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
}

#[derive(Parser, Debug)]
pub struct RequestsArgs {
    #[command(subcommand)]
    pub command: RequestsCommands,
}

#[derive(Subcommand, Debug)]
pub enum RequestsCommands {
    On,
    Off,
}

/// Arguments for `nightbot-sr watch`.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Refresh interval in seconds (5-300); defaults to the stored setting
    #[arg(short, long)]
    pub interval: Option<u32>,
}

#[derive(Parser, Debug)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommands,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    Show,
    /// Change auto-refresh preferences
    Set(SettingsSetArgs),
}

#[derive(Parser, Debug)]
pub struct SettingsSetArgs {
    #[arg(long)]
    pub auto_refresh: Option<bool>,

    /// Seconds between refreshes (5-300)
    #[arg(long)]
    pub interval: Option<u32>,
}
