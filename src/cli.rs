//! Command line interface for the server binary.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "soundcase-server",
    version,
    about = "Lobby server for the soundcase game",
    long_about = None
)]
pub struct ServerCli {
    /// Path to the TOML config file (created with defaults if missing)
    #[arg(long, default_value = "soundcase.toml")]
    pub config: PathBuf,

    /// Override the bonus case chance from the config
    #[arg(long)]
    pub bonus_chance: Option<f64>,

    /// Override the number of starter cases from the config
    #[arg(long)]
    pub starter_cases: Option<usize>,

    /// Write the effective config back to the config file
    #[arg(long, default_value_t = false)]
    pub persist: bool,

    /// Verbose logging with code locations
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}
