use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "hackaware",
    version,
    about = "HackAware cybersecurity assistant client"
)]
pub(crate) struct Args {
    /// Optional TOML file with client settings.
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Backend base URL; overrides the config file and HACKAWARE_API_URL.
    #[arg(long)]
    pub(crate) base_url: Option<String>,
    #[arg(long, default_value = "logs")]
    pub(crate) log_dir: PathBuf,
    /// Send logs to stderr instead of the daily file under --log-dir.
    #[arg(long, default_value_t = false)]
    pub(crate) log_to_stderr: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Chat with the assistant. Reads one question per line from stdin
    /// unless --question is given.
    Chat {
        #[arg(long = "question")]
        questions: Vec<String>,
    },
    /// Analyze the privacy risks of an app or website.
    Analyze {
        name: String,
        /// Print the report as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}
