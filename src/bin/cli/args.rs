use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "soundcase-cli",
    version,
    about = "Headless client for the soundcase lobby server",
    long_about = None
)]
pub struct Cli {
    /// Server address, e.g. "localhost:3000", "http://host:3000" or
    /// "ws://host:3000/ws"
    #[arg(long, default_value = "http://localhost:3000")]
    pub server: String,

    /// Username to identify as for WebSocket commands
    #[arg(short, long, default_value = "cli")]
    pub username: String,

    /// How long to keep listening for server events after a command (ms)
    #[arg(long, default_value_t = 1500)]
    pub wait_ms: u64,

    /// Print raw JSON instead of human-readable output
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List open lobbies (HTTP)
    Lobbies,
    /// List the users in a lobby (HTTP)
    Users { lobby_id: String },
    /// Create a lobby and listen for events until the wait timeout
    Create { name: String },
    /// Join a lobby and listen for events until the wait timeout
    Join { lobby_id: String },
    /// Play an owned sound. Joins the given lobby first, or creates a
    /// throwaway one when none is given.
    Play {
        sound_id: i64,
        #[arg(long)]
        lobby: Option<String>,
    },
    /// Open an owned case and print the minted sound
    Open { case_id: i64 },
    /// Show the inventory of the given username
    Inventory,
    /// Join a lobby (optional) and print events until interrupted
    Watch {
        #[arg(long)]
        lobby: Option<String>,
    },
}
