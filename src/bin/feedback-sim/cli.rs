use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug)]
#[command(author, version, about = "Replays a page scenario through the feedback components", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// JSON scenario describing the page and the steps to replay.
    #[arg(long, value_name = "PATH")]
    pub scenario: PathBuf,

    /// Replays waits against the wall clock instead of virtual time.
    #[arg(long, action = ArgAction::SetTrue)]
    pub realtime: bool,

    /// Runs every pending timer before printing the document.
    #[arg(long, action = ArgAction::SetTrue)]
    pub settle: bool,

    /// Uses a JSON layer for logs (`--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue)]
    pub json_logs: bool,

    /// Explicit log filter (e.g. "ui_feedback=debug").
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
