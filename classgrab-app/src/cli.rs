use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Capture a timetable page from the student portal and turn it into a calendar.
#[derive(Debug, Parser)]
#[command(name = "classgrab", version, about)]
pub struct Cli {
    /// Configuration file (YAML/TOML/JSON). Defaults to ./classgrab.yaml or the user config dir.
    #[arg(long, short, global = true, env = "CLASSGRAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Exit immediately on failure instead of waiting for Enter.
    #[arg(long, global = true)]
    pub no_pause: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open a browser, wait for login and the capture click, then save the page (default).
    Capture,
    /// Run the external converter on the saved page.
    Convert {
        /// First Sunday of the term, YYYY-MM-DD.
        #[arg(long, short)]
        date: String,
    },
    /// Print the effective configuration as YAML.
    Config,
}
